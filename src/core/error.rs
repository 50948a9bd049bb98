//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Level name not part of the active severity model
    #[error("Unknown level '{name}' for the {model} severity model")]
    UnknownLevel { name: String, model: &'static str },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Transport type that no registered sink factory knows
    #[error("Unknown sink kind '{0}'")]
    UnknownSinkKind(String),

    /// A sink rejected a rendered line
    #[error("Sink '{sink}' write failed: {message}")]
    SinkWrite { sink: String, message: String },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML configuration error
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Channel send error
    #[error("Failed to send log record to async worker")]
    ChannelSendError,

    /// Logger already stopped
    #[error("Logger already stopped")]
    LoggerStopped,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an unknown level error
    pub fn unknown_level(name: impl Into<String>, model: &'static str) -> Self {
        LoggerError::UnknownLevel {
            name: name.into(),
            model,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a sink write error
    pub fn sink_write(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkWrite {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::unknown_level("loud", "syslog");
        assert!(matches!(err, LoggerError::UnknownLevel { .. }));

        let err = LoggerError::config("syslog", "expected an object");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::sink_write("console", "broken pipe");
        assert!(matches!(err, LoggerError::SinkWrite { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::unknown_level("loud", "npm");
        assert_eq!(
            err.to_string(),
            "Unknown level 'loud' for the npm severity model"
        );

        let err = LoggerError::config("syslog", "invalid config type");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for syslog: invalid config type"
        );

        let err = LoggerError::UnknownSinkKind("kafka".to_string());
        assert_eq!(err.to_string(), "Unknown sink kind 'kafka'");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: LoggerError = io_err.into();

        assert!(matches!(err, LoggerError::IoError(_)));
        assert!(err.to_string().contains("pipe closed"));
    }
}
