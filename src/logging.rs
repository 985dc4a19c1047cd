//! Terminal logging for the native build. The browser build logs to the console.

use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_JSON_ENV: &str = "REEFDAPP_LOG_JSON";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// `REEFDAPP_LOG_JSON=1` selects JSON; anything else is pretty
    pub fn from_env() -> Self {
        match std::env::var(LOG_JSON_ENV).as_deref() {
            Ok("1") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

pub fn init_logging() {
    init_logging_with(LogFormat::from_env());
}

/// Install the stderr subscriber; `RUST_LOG` filters (default `info`). Safe to call twice.
pub fn init_logging_with(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}
