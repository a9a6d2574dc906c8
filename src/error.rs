//! Error types and handling infrastructure for plotlink.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types and `anyhow` for application-level error handling with context.
//!
//! ## Design Principles
//!
//! - **User-friendly messages**: Errors should provide actionable feedback
//! - **Context preservation**: Include relevant information for debugging
//! - **Silent degradation**: A missing renderer must never crash dispatch callers
//! - **Consistency**: Standardized Result type across all modules

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for plotlink operations.
///
/// This enum covers all possible error conditions that can occur during
/// payload assembly, asset resolution, and renderer communication.
#[derive(Error, Debug)]
pub enum PlotlinkError {
    /// The external renderer helper could not be located or reached
    #[error("External renderer unavailable: {message}")]
    RendererUnavailable { message: String },

    /// A bundled HTML template or icon is missing from the asset store
    #[error("Asset not found: {path}")]
    AssetNotFound { path: PathBuf },

    /// Figure payload is malformed (not a JSON object, bad layout, etc.)
    #[error("Invalid figure payload: {message}")]
    FigureError { message: String },

    /// Table payload is malformed (row arity mismatch, etc.)
    #[error("Invalid table payload: {message}")]
    TableError { message: String },

    /// Payload serialization failed
    #[error("Serialization failed: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    /// File system related errors (settings file unreadable, asset write failed, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Settings could not be loaded or validated
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Downloading a renderer asset from the CDN failed
    #[error("Asset download failed: {message}")]
    DownloadError { message: String },

    /// Generic error for cases not covered by specific variants
    #[error("Operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for plotlink operations.
///
/// This type alias provides a consistent error handling interface across
/// all modules in the plotlink codebase.
pub type Result<T> = std::result::Result<T, PlotlinkError>;

impl PlotlinkError {
    /// Create a RendererUnavailable error with a descriptive message
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::RendererUnavailable {
            message: message.into(),
        }
    }

    /// Create an AssetNotFound error for the given path
    pub fn asset_not_found(path: impl Into<PathBuf>) -> Self {
        Self::AssetNotFound { path: path.into() }
    }

    /// Create a FigureError with a descriptive message
    pub fn figure(message: impl Into<String>) -> Self {
        Self::FigureError {
            message: message.into(),
        }
    }

    /// Create a TableError with a descriptive message
    pub fn table(message: impl Into<String>) -> Self {
        Self::TableError {
            message: message.into(),
        }
    }

    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a DownloadError with a descriptive message
    pub fn download(message: impl Into<String>) -> Self {
        Self::DownloadError {
            message: message.into(),
        }
    }

    /// Create a generic Other error with a descriptive message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

// Automatic conversion from io::Error to PlotlinkError
impl From<std::io::Error> for PlotlinkError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_display_messages() {
        let missing = PlotlinkError::asset_not_found("/assets/plotly.html");
        assert_eq!(missing.to_string(), "Asset not found: /assets/plotly.html");

        let unavailable = PlotlinkError::unavailable("helper binary not on PATH");
        assert_eq!(
            unavailable.to_string(),
            "External renderer unavailable: helper binary not on PATH"
        );

        let figure = PlotlinkError::figure("payload is not a JSON object");
        assert_eq!(
            figure.to_string(),
            "Invalid figure payload: payload is not a JSON object"
        );
    }

    #[test]
    fn test_error_constructors() {
        let table_err = PlotlinkError::table("row has 3 cells, expected 4");
        matches!(table_err, PlotlinkError::TableError { .. });

        let config_err = PlotlinkError::config("settings file is not valid JSON");
        matches!(config_err, PlotlinkError::ConfigError { .. });

        let other_err = PlotlinkError::other("Unknown error");
        matches!(other_err, PlotlinkError::Other { .. });
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: PlotlinkError = io_err.into();

        match err {
            PlotlinkError::FileError { message, .. } => {
                assert_eq!(message, "File not found");
            }
            _ => panic!("Expected FileError variant"),
        }
    }

    #[test]
    fn test_asset_not_found_keeps_path() {
        let err = PlotlinkError::asset_not_found(PathBuf::from("/tmp/table.html"));
        match err {
            PlotlinkError::AssetNotFound { path } => {
                assert_eq!(path, PathBuf::from("/tmp/table.html"));
            }
            _ => panic!("Expected AssetNotFound variant"),
        }
    }
}
