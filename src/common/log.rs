//! Tracing subscriber setup emitting either human readable or JSON lines.
//!
//! Library code only uses `tracing` macros; binaries and FFI callers decide
//! whether a subscriber gets installed by calling [`init`].

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::common::config::{AppCfg, LogFormat};
use crate::common::error::{ShipError, ShipResult};

/// Environment variable that overrides the configured filter directives.
pub const LOG_FILTER_ENV: &str = "SHIPCOST_LOG";

/// Build the filter: `SHIPCOST_LOG` wins, otherwise `cfg.log_level`.
pub fn filter_for(cfg: &AppCfg) -> ShipResult<EnvFilter> {
    match EnvFilter::try_from_env(LOG_FILTER_ENV) {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&cfg.log_level)
            .map_err(|e| ShipError::config(format!("bad log level `{}`: {e}", cfg.log_level))),
    }
}

/// Install the global subscriber. Returns `Ok(false)` if one was already set.
pub fn init(cfg: &AppCfg) -> ShipResult<bool> {
    let filter = filter_for(cfg)?;
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match cfg.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    match installed {
        Ok(()) => {
            tracing::debug!(level = %cfg.log_level, format = ?cfg.log_format, "logging initialised");
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}
