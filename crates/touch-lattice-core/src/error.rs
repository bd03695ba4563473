//! Error types for Touch Lattice.
//!
//! Recognition outcomes (a tap that moved too far, a flick that was too slow)
//! are gesture states, never errors. This type only covers configuration that
//! is rejected up front and handles that no longer refer to anything.

use std::path::PathBuf;

use crate::object::{GestureId, ObjectId};

/// Result type alias for Touch Lattice operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring the touch engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value was rejected at construction time.
    #[error("Invalid configuration for {what}: {message}")]
    InvalidConfig { what: &'static str, message: String },

    /// The scene object does not exist (or was removed).
    #[error("Unknown scene object {0:?}")]
    UnknownObject(ObjectId),

    /// The gesture does not exist (or was detached).
    #[error("Unknown gesture {0:?}")]
    UnknownGesture(GestureId),

    /// A gesture relation pointed back at the same gesture.
    #[error("Gesture {0:?} cannot be related to itself")]
    SelfReference(GestureId),

    /// A configuration document could not be parsed.
    #[error("Failed to parse {format} configuration: {message}")]
    ConfigParse {
        format: &'static str,
        message: String,
    },

    /// A configuration file could not be read.
    #[error("Failed to read configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn invalid_config(what: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            what,
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn config_parse(format: &'static str, message: impl ToString) -> Self {
        Self::ConfigParse {
            format,
            message: message.to_string(),
        }
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Reject `value` unless it is a finite number strictly greater than zero.
pub(crate) fn ensure_positive(what: &'static str, field: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid_config(
            what,
            format!("{field} must be a positive finite number, got {value}"),
        ))
    }
}

/// Reject `value` if it is NaN or negative. Infinity is allowed and means "no limit".
pub(crate) fn ensure_non_negative(what: &'static str, field: &str, value: f32) -> Result<()> {
    if value.is_nan() || value < 0.0 {
        Err(Error::invalid_config(
            what,
            format!("{field} must not be negative, got {value}"),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let err = Error::invalid_config("TapConfig", "number_of_taps_required must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for TapConfig: number_of_taps_required must be at least 1"
        );
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;
        let err = Error::io(
            "touch.toml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.source().is_some());
        assert!(err.to_string().contains("touch.toml"));
    }

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("X", "dpi", 1.0).is_ok());
        assert!(ensure_positive("X", "dpi", 0.0).is_err());
        assert!(ensure_positive("X", "dpi", f32::NAN).is_err());
        assert!(ensure_positive("X", "dpi", f32::INFINITY).is_err());
    }

    #[test]
    fn test_ensure_non_negative_allows_infinity() {
        assert!(ensure_non_negative("X", "limit", f32::INFINITY).is_ok());
        assert!(ensure_non_negative("X", "limit", 0.0).is_ok());
        assert!(ensure_non_negative("X", "limit", -0.5).is_err());
    }
}
