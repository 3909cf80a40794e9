//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};

use edge_core::{EdgeCacheConfig, KeyDimension};

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, CONFIG_FILE_NAMES};
use crate::context::Context;
use crate::output::format_duration;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init { force } => init_config(force, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(ctx.config.as_ref());
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("source", &path.display().to_string()),
        None => ctx.output.kv("source", "built-in defaults"),
    }

    let config: &EdgeCacheConfig = &ctx.config;

    // Freshness section
    ctx.output.info("");
    ctx.output.info("[freshness]");
    ctx.output.kv("max_age", &format_duration(config.freshness.max_age));
    ctx.output.kv(
        "stale_while_revalidate",
        &format_duration(config.freshness.stale_while_revalidate),
    );
    ctx.output
        .kv("stale_if_error", &format_duration(config.freshness.stale_if_error));
    ctx.output.kv("cacheable_statuses", &join(&config.freshness.cacheable_statuses));
    ctx.output.kv(
        "cacheable_content_types",
        &config.freshness.cacheable_content_types.join(", "),
    );

    // Bypass section
    ctx.output.info("");
    ctx.output.info("[bypass]");
    ctx.output.kv("cacheable_methods", &config.bypass.cacheable_methods.join(", "));
    ctx.output.kv("cookies", &config.bypass.cookies.join(", "));
    ctx.output.kv("headers", &config.bypass.headers.join(", "));
    ctx.output.kv("paths", &config.bypass.paths.join(", "));
    ctx.output.kv("queries", &config.bypass.queries.join(", "));

    // Key section
    ctx.output.info("");
    ctx.output.info("[key]");
    ctx.output.kv("tracking_pattern", &config.key.tracking_pattern);
    let dimensions: Vec<&str> = config
        .key
        .dimensions
        .iter()
        .filter(|d| config.key.is_enabled(**d))
        .map(KeyDimension::name)
        .collect();
    ctx.output.kv("dimensions", &dimensions.join(", "));
    ctx.output.kv("encoding", &format!("{:?}", config.key.encoding).to_lowercase());

    // Purge, origin, response
    ctx.output.info("");
    ctx.output.info("[purge]");
    ctx.output.kv("query_param", &config.purge.query_param);
    ctx.output.kv("api_base", &config.purge.api_base);

    ctx.output.info("");
    ctx.output.info("[origin]");
    ctx.output.kv(
        "url",
        config.origin.url.as_deref().unwrap_or("(request URL)"),
    );
    ctx.output.kv(
        "timeouts",
        &format!(
            "connect {}ms, total {}ms",
            config.origin.connect_timeout_ms, config.origin.total_timeout_ms
        ),
    );

    ctx.output.info("");
    ctx.output.info("[response]");
    ctx.output.kv(
        "legacy_error_status",
        &config.response.legacy_error_status.to_string(),
    );
    ctx.output.kv("status_header", &config.response.status_header);

    Ok(())
}

async fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_FILE_NAMES[0]);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, generate_default_config())?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    // Loading already validated the file; re-run for the defaults case.
    ctx.config.validate()?;

    let warnings = config_warnings(&ctx.config);
    if warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}

/// Settings that are legal but probably not intended.
fn config_warnings(config: &EdgeCacheConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.bypass.headers.iter().any(|h| h.eq_ignore_ascii_case("authorization"))
        && !config.bypass.cookies.iter().any(|c| c.eq_ignore_ascii_case("authorization"))
    {
        warnings.push("authenticated requests are not bypassed".to_string());
    }

    if config
        .bypass
        .cacheable_methods
        .iter()
        .any(|m| !matches!(m.to_ascii_uppercase().as_str(), "GET" | "HEAD"))
    {
        warnings.push("bypass.cacheable_methods includes a non-read method".to_string());
    }

    if config.freshness.stale_if_error < config.freshness.stale_while_revalidate {
        warnings.push(
            "freshness.stale_if_error is shorter than stale_while_revalidate".to_string(),
        );
    }

    if config.key.dimensions.is_empty() {
        warnings.push("key.dimensions is empty; device, locale and country are ignored".to_string());
    }

    if config.response.legacy_error_status {
        warnings.push("response.legacy_error_status maps client errors to 500".to_string());
    }

    warnings
}

fn join(values: &[u16]) -> String {
    values
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
