//! CLI command implementations.

pub mod check;
pub mod config;
pub mod key;
pub mod purge;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};
use http::Method;

use edge_core::EdgeRequest;

/// A request described on the command line.
#[derive(Args)]
pub struct RequestArgs {
    /// Request URL.
    pub url: String,

    /// Request header as `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Request method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,
}

impl RequestArgs {
    /// Build the request these arguments describe.
    pub fn to_request(&self) -> Result<EdgeRequest> {
        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .with_context(|| format!("Invalid method: {}", self.method))?;
        let mut request = EdgeRequest::parse(method, &self.url)?;
        for header in &self.headers {
            let (name, value) = parse_header(header)?;
            request = request.with_header(name, value)?;
        }
        Ok(request)
    }
}

/// Split a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("Invalid header '{}', expected 'Name: value'", raw);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid header '{}', empty name", raw);
    }
    Ok((name, value.trim()))
}

/// Arguments for the key command.
#[derive(Args)]
pub struct KeyArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

/// Arguments for the purge command.
#[derive(Args)]
pub struct PurgeArgs {
    /// Zone identifier (32 lowercase alphanumeric characters).
    #[arg(short, long)]
    pub zone: String,

    /// API token. Falls back to the EDGE_PURGE_TOKEN environment variable.
    #[arg(short, long)]
    pub token: Option<String>,

    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("User-Agent: curl/8").unwrap(),
            ("User-Agent", "curl/8")
        );
        assert_eq!(parse_header("X-Empty:").unwrap(), ("X-Empty", ""));
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_to_request() {
        let args = RequestArgs {
            url: "https://shop.test/a?b=1".to_string(),
            headers: vec!["Accept-Language: de-DE".to_string()],
            method: "head".to_string(),
        };
        let request = args.to_request().unwrap();
        assert_eq!(request.method, Method::HEAD);
        assert_eq!(request.header("accept-language").as_deref(), Some("de-DE"));
    }
}
