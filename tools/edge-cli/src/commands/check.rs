//! Show the cache decision for a request.

use anyhow::Result;
use serde_json::json;

use edge_cache::{FreshnessPolicy, KeyNormalizer};
use edge_worker::{Route, Router};

use super::CheckArgs;
use crate::context::Context;
use crate::output::{decision_badge, format_duration};

/// Run the check command.
pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let request = args.request.to_request()?;
    let router = Router::new(&ctx.config);
    let route = router.route(&request);

    let (decision, reason) = match &route {
        Route::Purge => ("purge", None),
        Route::Bypass(reason) => ("bypass", Some(reason.clone())),
        Route::Cache => ("cache", None),
    };
    let key = match route {
        Route::Cache => Some(KeyNormalizer::new(&ctx.config.key)?.normalize(&request)),
        _ => None,
    };
    let directives = FreshnessPolicy::new(&ctx.config.freshness).cache_control();

    if ctx.output.is_json() {
        ctx.output.json(&json!({
            "decision": decision,
            "reason": reason,
            "key": key.as_ref().map(|k| k.as_str()),
            "cache_control": key.as_ref().map(|_| directives.to_string()),
        }));
        return Ok(());
    }

    ctx.output.header(&format!("{} {}", request.method, request.url));
    ctx.output.kv("decision", &decision_badge(decision));
    if let Some(reason) = &reason {
        ctx.output.kv("reason", &reason.to_string());
    }
    if let Some(key) = &key {
        ctx.output.kv("key", key.as_str());
        ctx.output.kv("cache-control", &directives.to_string());
        ctx.output
            .kv("retained for", &format_duration(directives.retention().as_secs()));
        ctx.output.kv(
            "served stale",
            &format!(
                "{} while revalidating, {} on origin error",
                format_duration(directives.stale_while_revalidate),
                format_duration(directives.stale_if_error)
            ),
        );
    }

    Ok(())
}
