//! Purge a zone through the worker's purge path.

use std::time::Duration;

use anyhow::{bail, Result};
use dialoguer::Confirm;
use http::Method;
use serde_json::json;

use edge_core::EdgeRequest;
use edge_worker::EdgeWorker;

use super::PurgeArgs;
use crate::context::Context;

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "EDGE_PURGE_TOKEN";

/// Run the purge command.
pub async fn run(args: PurgeArgs, ctx: &Context) -> Result<()> {
    let token = args.token.clone().or_else(|| std::env::var(TOKEN_ENV).ok());
    if token.is_none() {
        ctx.output
            .warn(&format!("No token given (--token or {}); sending without Authorization", TOKEN_ENV));
    }

    if !args.yes && !ctx.output.is_json() {
        let confirmed = Confirm::new()
            .with_prompt(format!("Purge every cached entry of zone {}?", args.zone))
            .default(false)
            .interact()?;

        if !confirmed {
            ctx.output.info("Purge cancelled");
            return Ok(());
        }
    }

    let request = purge_request(ctx, &args.zone, token.as_deref())?;
    let worker = EdgeWorker::from_config(ctx.config.clone())?;

    let spinner = ctx.output.spinner("Purging...");
    let response = worker.handle(request).await;
    worker.shutdown(Duration::from_secs(5)).await;
    spinner.finish_and_clear();

    let body = response.body_text();
    if ctx.output.is_json() {
        let body: serde_json::Value = serde_json::from_str(&body).unwrap_or(json!(body));
        ctx.output.json(&json!({
            "zone": args.zone,
            "status": response.status.as_u16(),
            "response": body,
        }));
    } else {
        ctx.output.header("Provider response");
        ctx.output.kv("status", response.status.as_str());
        ctx.output.text(&body);
    }

    if !response.status.is_success() {
        bail!("Purge failed with status {}", response.status);
    }
    ctx.output.success(&format!("Purged zone {}", args.zone));

    Ok(())
}

/// The inbound request that triggers the purge path for a zone.
fn purge_request(ctx: &Context, zone: &str, token: Option<&str>) -> Result<EdgeRequest> {
    let base = ctx
        .config
        .origin
        .url
        .clone()
        .unwrap_or_else(|| "http://localhost/".to_string());
    let mut url = url_with_param(&base, &ctx.config.purge.query_param, zone)?;
    url.set_fragment(None);

    let mut request = EdgeRequest::new(Method::POST, url);
    if let Some(token) = token {
        request = request.with_header("Authorization", token)?;
    }
    Ok(request)
}

fn url_with_param(base: &str, name: &str, value: &str) -> Result<url::Url> {
    let mut url = url::Url::parse(base)?;
    url.query_pairs_mut().clear().append_pair(name, value);
    Ok(url)
}
