//! Error types for autobackup
//!
//! All modules use `BackupResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for autobackup operations
pub type BackupResult<T> = Result<T, BackupError>;

/// All errors that can occur in autobackup
#[derive(Error, Debug)]
pub enum BackupError {
    // Authorization errors
    #[error("Not authorized: missing capability {capability}")]
    NotAuthorized { capability: String },

    // Subject errors
    #[error("Subject not found: {0}")]
    SubjectNotFound(u64),

    #[error("Subject directory unavailable: {reason}")]
    SubjectDirectoryUnavailable { reason: String },

    // Export errors
    #[error("Export failed for subject {subject_id}: {reason}")]
    ExportFailed { subject_id: u64, reason: String },

    #[error("No export command configured")]
    ExporterNotConfigured,

    // Link errors
    #[error("Field store query failed: {0}")]
    FieldStore(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid listen address: {0}")]
    ListenAddrInvalid(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl BackupError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an export failure for a subject
    pub fn export_failed(subject_id: u64, reason: impl Into<String>) -> Self {
        Self::ExportFailed {
            subject_id,
            reason: reason.into(),
        }
    }

    /// Create a not-authorized error for a capability
    pub fn not_authorized(capability: impl Into<String>) -> Self {
        Self::NotAuthorized {
            capability: capability.into(),
        }
    }

    /// Whether the request should fail closed with an empty response
    ///
    /// Authorization failures render nothing rather than an error page.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::NotAuthorized { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ExporterNotConfigured => {
                Some("Set command = [\"...\"] under [export] in config.toml")
            }
            Self::SubjectDirectoryUnavailable { .. } => {
                Some("Set subjects_file under [platform] in config.toml")
            }
            _ => None,
        }
    }
}
