//! Show the cache key for a request.

use anyhow::Result;
use serde_json::json;

use edge_cache::{DeviceType, KeyNormalizer};

use super::KeyArgs;
use crate::context::Context;

/// Run the key command.
pub async fn run(args: KeyArgs, ctx: &Context) -> Result<()> {
    let request = args.request.to_request()?;
    let normalizer = KeyNormalizer::new(&ctx.config.key)?;

    let key = normalizer.normalize(&request);
    let url = normalizer.normalize_url(&request.url);
    let device = request
        .non_empty_header(&ctx.config.key.user_agent_header)
        .map(|ua| DeviceType::from_user_agent(&ua));

    if ctx.output.is_json() {
        ctx.output.json(&json!({
            "key": key.as_str(),
            "url": url.as_str(),
            "device": device,
            "components": key.components(),
        }));
        return Ok(());
    }

    ctx.output.header("Cache key");
    ctx.output.text(key.as_str());
    for component in key.components() {
        if let Some((name, value)) = component.split_once(':') {
            ctx.output.kv(name, value);
        }
    }
    ctx.output.kv(
        "device class",
        &device.map_or_else(|| "(no user agent)".to_string(), |d| d.to_string()),
    );

    Ok(())
}
