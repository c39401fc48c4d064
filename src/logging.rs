//! Process-wide tracing setup for derivation runs.
//!
//! Every event the crate emits uses the `codable` target and carries a
//! `stage` field (`derive.start`, `keys.synthesized`, `eval.decode`, ...).

use std::env;
use std::fmt;

/// Environment variable holding the level for the `codable` target.
pub const LOG_LEVEL_ENV: &str = "CODABLE_LOG";
/// Environment variable selecting `text` or `json` output.
pub const LOG_FORMAT_ENV: &str = "CODABLE_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "text" | "plain" | "compact" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "off" | "none" => Some(Self::Off),
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogOptions {
    /// Derivation stages are logged at `debug`/`trace`, so the default stays quiet.
    pub const DEFAULT: Self = Self {
        format: LogFormat::Text,
        level: LogLevel::Warn,
    };

    /// Defaults overridden by `CODABLE_LOG` and `CODABLE_LOG_FORMAT`.
    /// Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var(LOG_LEVEL_ENV).ok();
        let format = env::var(LOG_FORMAT_ENV).ok();
        Self::DEFAULT.with_overrides(level.as_deref(), format.as_deref())
    }

    #[must_use]
    pub fn with_overrides(mut self, level: Option<&str>, format: Option<&str>) -> Self {
        if let Some(level) = level.and_then(LogLevel::parse) {
            self.level = level;
        }
        if let Some(format) = format.and_then(LogFormat::parse) {
            self.format = format;
        }
        self
    }

    /// Filter directive for the subscriber. Only the `codable` target is
    /// raised; everything else stays at `warn`.
    #[must_use]
    pub fn directive(&self) -> String {
        format!("warn,codable={}", self.level)
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Install the global subscriber once. `RUST_LOG` wins over `options` when
/// set. Later calls, or a subscriber installed elsewhere, leave things as they are.
pub fn init_logging(options: &LogOptions) {
    use std::io::IsTerminal;
    use std::sync::OnceLock;
    use tracing_subscriber::{EnvFilter, fmt};

    static INSTALLED: OnceLock<()> = OnceLock::new();

    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(options.directive()));
        let builder = fmt::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true);
        let installed = match options.format {
            LogFormat::Json => {
                tracing::subscriber::set_global_default(builder.with_ansi(false).json().finish())
            }
            LogFormat::Text => {
                let ansi = env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
                tracing::subscriber::set_global_default(
                    builder.with_ansi(ansi).compact().finish(),
                )
            }
        };
        if installed.is_ok() {
            tracing::debug!(target: "codable", stage = "logging.init", level = %options.level);
        }
    });
}
