//! # aws-roles
//!
//! Cloud credentials (access key, secret, optional session token) from
//! pluggable sources.
//!
//! The file-backed source reads three files deposited by an external rotation
//! process and keeps them current by watching their directory. Readers always
//! see one complete credential set, never a mix of old and new files.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use aws_roles::{CredentialProvider, FileCredentialSource, FileSourceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), aws_roles::Error> {
//!     let source = Arc::new(FileCredentialSource::new(
//!         FileSourceConfig::new("/etc/tags"),
//!     ));
//!
//!     // The initial read must happen before the watch starts.
//!     source.refresh().await?;
//!
//!     let mut watch = Arc::clone(&source).spawn_watch();
//!     while let Some(changed) = watch.changes.recv().await {
//!         let creds = source.get().await?;
//!         println!("rotated at {}: {}", changed.refreshed_at, creds.access_key());
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod auth;
pub mod config;
pub mod observability;
pub mod prelude;

use std::path::PathBuf;

pub use auth::{
    CredentialField, CredentialProvider, Credentials, CredentialsChanged, FileCredentialSource,
    ProviderType, RotationTracker, SessionCredentialSource, StaticCredentialSource, WatchHandle,
    WatchSink, WatchState,
};
#[cfg(feature = "aws")]
pub use auth::SdkCredentialsProvider;
pub use config::FileSourceConfig;
pub use observability::{RefreshSpan, WatchMetrics, WatchMetricsSummary};

/// Error type for credential operations.
///
/// Every refresh-time variant leaves the provider empty: a failed refresh
/// never keeps serving the previous credentials.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A credential file is missing, unreadable, empty or not UTF-8.
    #[error("Failed to read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// Credential file metadata unavailable.
    #[error("Failed to stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Credential files were written too far apart to belong to one rotation.
    #[error("Credential file mtimes span {spread_secs}s (limit: under {max_secs}s)")]
    Skew { spread_secs: i64, max_secs: i64 },

    /// A getter was called while the field is empty.
    #[error("{provider} provider has no {field}")]
    MissingField {
        provider: ProviderType,
        field: CredentialField,
    },

    /// Operation not supported by the provider.
    #[error("{operation} is not supported by the {provider} provider")]
    NotSupported {
        provider: ProviderType,
        operation: &'static str,
    },

    /// Filesystem watch failed.
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad base directory, file names or configuration file. Never retried.
    Configuration,
    /// Rotation in progress or filesystem hiccup; the next rotation may succeed.
    Transient,
    /// The provider holds no credentials (never refreshed, or reset after a failure)
    Uninitialized,
    /// Operation not available on this provider kind
    Unsupported,
    /// Unexpected IO failures
    Internal,
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub(crate) fn read(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Read {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::Json(_) => ErrorCategory::Configuration,

            Error::Read { .. } | Error::Stat { .. } | Error::Skew { .. } | Error::Watch(_) => {
                ErrorCategory::Transient
            }

            Error::MissingField { .. } => ErrorCategory::Uninitialized,

            Error::NotSupported { .. } => ErrorCategory::Unsupported,

            Error::Io(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    pub fn is_missing_field(&self) -> bool {
        self.category() == ErrorCategory::Uninitialized
    }

    pub fn is_not_supported(&self) -> bool {
        self.category() == ErrorCategory::Unsupported
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::read("/etc/tags/role_token", "file is empty");
        assert!(err.to_string().contains("/etc/tags/role_token"));
        assert!(err.to_string().contains("file is empty"));

        let err = Error::Skew {
            spread_secs: 42,
            max_secs: 10,
        };
        assert!(err.to_string().contains("42s"));
    }

    #[test]
    fn test_error_is_retryable() {
        assert!(Error::read("/tmp/x", "missing").is_retryable());
        assert!(
            Error::Skew {
                spread_secs: 11,
                max_secs: 10
            }
            .is_retryable()
        );

        let config = Error::config("base directory is not set");
        assert!(!config.is_retryable());
        assert!(config.is_configuration_error());
    }

    #[test]
    fn test_missing_field_category() {
        let err = Error::MissingField {
            provider: ProviderType::File,
            field: CredentialField::Token,
        };
        assert!(err.is_missing_field());
        assert_eq!(err.to_string(), "file provider has no token");
    }

    #[test]
    fn test_not_supported_display() {
        let err = Error::NotSupported {
            provider: ProviderType::Master,
            operation: "watch",
        };
        assert!(err.is_not_supported());
        assert_eq!(err.to_string(), "watch is not supported by the master provider");
    }
}
