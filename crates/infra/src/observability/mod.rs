//! Tracing subscriber setup
//!
//! Libraries in this workspace only emit `tracing` events; the host
//! application decides where they go. `init_tracing` installs a global fmt
//! subscriber filtered by `RUST_LOG`, falling back to the given level.

use std::str::FromStr;

use mpauth_domain::GatewayError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the output format (`pretty` or `json`)
pub const LOG_FORMAT_ENV: &str = "MPAUTH_LOG_FORMAT";

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines for local development
    #[default]
    Pretty,
    /// One JSON object per event, for log shippers
    Json,
}

impl LogFormat {
    /// Format from `MPAUTH_LOG_FORMAT`, defaulting to [`LogFormat::Pretty`]
    /// when unset or unrecognised.
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV).ok().and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for LogFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" | "plain" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(GatewayError::Config(format!("unknown log format: {other}"))),
        }
    }
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed (by an earlier call
/// or by the host application); that is not an error.
pub fn init_tracing(format: LogFormat) -> bool {
    init_tracing_with_level(format, DEFAULT_LOG_LEVEL)
}

/// Like [`init_tracing`] with a custom default level when `RUST_LOG` is unset
pub fn init_tracing_with_level(format: LogFormat, default_level: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
    };

    installed.is_ok()
}
