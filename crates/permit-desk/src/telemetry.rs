use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::EnvFilter;

/// sqlx logs every statement at info; keep it at warn unless `RUST_LOG` says otherwise.
const SQLX_DIRECTIVE: &str = "sqlx=warn";

#[derive(Debug)]
pub enum TelemetryError {
    InvalidLevel { value: String, source: ParseError },
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidLevel { value, .. } => {
                write!(f, "DESK_LOG_LEVEL '{value}' is not a valid log filter")
            }
            TelemetryError::AlreadyInstalled(err) => {
                write!(f, "log subscriber already installed: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidLevel { source, .. } => Some(source),
            TelemetryError::AlreadyInstalled(err) => Some(&**err),
        }
    }
}

/// Filter for the desk: `RUST_LOG` when set, otherwise the configured level
/// with statement logging held back.
pub fn desk_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    configured_filter(&config.log_level)
}

fn configured_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    let invalid = |source: ParseError| TelemetryError::InvalidLevel {
        value: level.to_string(),
        source,
    };
    let directive: Directive = SQLX_DIRECTIVE.parse().map_err(invalid)?;
    Ok(EnvFilter::try_new(level.trim()).map_err(invalid)?.add_directive(directive))
}

/// Install the global subscriber. Logs go to stderr so stdout carries only
/// the rendered screens.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(desk_filter(config)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_keeps_sqlx_at_warn() {
        let filter = configured_filter("debug").expect("valid level");
        let rendered = filter.to_string();

        assert!(rendered.contains("debug"));
        assert!(rendered.contains("sqlx=warn"));
    }

    #[test]
    fn unparsable_level_names_the_variable() {
        let err = configured_filter("permit_desk=loud").expect_err("invalid level rejected");

        assert!(matches!(err, TelemetryError::InvalidLevel { .. }));
        assert_eq!(
            err.to_string(),
            "DESK_LOG_LEVEL 'permit_desk=loud' is not a valid log filter"
        );
    }
}
