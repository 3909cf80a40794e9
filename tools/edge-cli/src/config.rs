//! Configuration discovery and the starter config file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use edge_core::EdgeCacheConfig;

/// File names searched for, in order, in each directory.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["edge-cache.toml", ".edge-cache.toml", "edge-cache.json"];

/// Find the nearest config file, walking up from `start`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in &CONFIG_FILE_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<EdgeCacheConfig> {
    EdgeCacheConfig::load(path)
        .with_context(|| format!("Failed to load config file: {}", path.display()))
}

/// Generate a default edge-cache.toml config file.
pub fn generate_default_config() -> String {
    r#"# Edge cache worker configuration

[freshness]
max_age = 300
stale_while_revalidate = 45
stale_if_error = 3600
cacheable_statuses = [200, 301, 302, 303, 307, 404]
cacheable_content_types = ["text/html"]

[bypass]
cacheable_methods = ["GET", "HEAD"]
cookies = ["no_worker_cache=true", "Authorization"]
headers = ["Authorization"]
paths = ["/_nuxt/"]
queries = ["no_cache=true"]

[key]
tracking_pattern = "(gclid|utm_(source|campaign|medium)|fb(cl)?id|fbclid)"
device = true
locale = true
country = true
dimensions = ["device", "locale", "country"]
encoding = "delimited"

[purge]
query_param = "__purge_cache"
# api_base = "https://api.cloudflare.com/client/v4"

[origin]
# url = "http://127.0.0.1:3000"
connect_timeout_ms = 2000
total_timeout_ms = 30000

[response]
legacy_error_status = false
status_header = "X-Edge-Cache"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses_to_defaults() {
        let parsed = EdgeCacheConfig::from_toml_str(&generate_default_config()).unwrap();
        let defaults = EdgeCacheConfig::default();
        assert_eq!(parsed.freshness.max_age, defaults.freshness.max_age);
        assert_eq!(parsed.bypass.paths, defaults.bypass.paths);
        assert_eq!(parsed.key.tracking_pattern, defaults.key.tracking_pattern);
        assert_eq!(parsed.key.dimensions, defaults.key.dimensions);
        assert_eq!(parsed.purge.query_param, defaults.purge.query_param);
        parsed.validate().unwrap();
    }

    #[test]
    fn test_find_config_walks_up() {
        let root = std::env::temp_dir().join(format!("edge-cli-find-{}", std::process::id()));
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join("edge-cache.toml"), generate_default_config()).unwrap();

        assert_eq!(find_config_file(&nested), Some(root.join("edge-cache.toml")));
        std::fs::remove_dir_all(&root).unwrap();
    }
}
