//! Terminal and JSON output for the `edge` CLI.

use std::fmt::Display;
use std::time::Duration;

use console::{style, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Clone, Copy)]
enum Mark {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Mark {
    fn symbol(self) -> StyledObject<&'static str> {
        match self {
            Mark::Info => style("ℹ").blue(),
            Mark::Success => style("✓").green(),
            Mark::Warn => style("⚠").yellow(),
            Mark::Error => style("✗").red(),
            Mark::Debug => style("→").dim(),
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Mark::Warn | Mark::Error | Mark::Debug)
    }
}

/// Writes command results either as styled text or, with `--json`, as a
/// single JSON document on stdout.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    fn emit(&self, mark: Mark, msg: &str) {
        let line = match mark {
            Mark::Error => format!("{} {}", mark.symbol(), style(msg).red()),
            Mark::Debug => format!("{} {}", mark.symbol(), style(msg).dim()),
            _ => format!("{} {}", mark.symbol(), msg),
        };
        if mark.to_stderr() {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    pub fn info(&self, msg: &str) {
        if !self.json {
            self.emit(Mark::Info, msg);
        }
    }

    pub fn success(&self, msg: &str) {
        if !self.json {
            self.emit(Mark::Success, msg);
        }
    }

    pub fn warn(&self, msg: &str) {
        if !self.json {
            self.emit(Mark::Warn, msg);
        }
    }

    /// Errors are still reported in JSON mode, as `{"error": ...}` on stderr.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        } else {
            self.emit(Mark::Error, msg);
        }
    }

    /// Only shown with `--verbose`.
    pub fn debug(&self, msg: &str) {
        if self.verbose && !self.json {
            self.emit(Mark::Debug, msg);
        }
    }

    pub fn header(&self, title: &str) {
        if !self.json {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn kv(&self, key: &str, value: impl Display) {
        if !self.json {
            println!("  {}: {}", style(key).dim(), value);
        }
    }

    /// Unstyled text such as a cache key or a provider body.
    pub fn text(&self, text: &str) {
        if !self.json {
            println!("{}", text);
        }
    }

    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    /// Spinner for a provider or origin round trip; hidden in JSON mode.
    pub fn spinner(&self, msg: &str) -> ProgressBar {
        if self.json {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// Colour a routing decision or cache status.
pub fn decision_badge(decision: &str) -> String {
    match decision.to_lowercase().as_str() {
        "cache" | "hit" => style(decision).green().to_string(),
        "bypass" | "stale" => style(decision).yellow().to_string(),
        "purge" | "error" => style(decision).red().to_string(),
        _ => decision.to_string(),
    }
}

/// Render a freshness window in seconds, e.g. `5m 0s` or `1h 0m`.
pub fn format_duration(secs: u64) -> String {
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m {}s", secs / 60, secs % 60),
        _ => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
    }
}
