//! File-backed provider configuration.
//!
//! ```rust,no_run
//! use aws_roles::FileSourceConfig;
//!
//! # async fn example() -> Result<(), aws_roles::Error> {
//! // Explicit
//! let config = FileSourceConfig::new("/etc/tags").token_file("session_token");
//!
//! // From ROLES_* environment variables
//! let config = FileSourceConfig::from_env();
//!
//! // From a JSON file
//! let config = FileSourceConfig::from_file("/etc/roles.json").await?;
//! # Ok(())
//! # }
//! ```

pub mod env;

use std::path::{MAIN_SEPARATOR_STR, Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use self::env::{env_bool, env_opt, env_u64, env_with_fallbacks_or};
use crate::auth::CredentialField;
use crate::Result;

pub const DEFAULT_ACCESS_KEY_FILE: &str = "role_access_key";
pub const DEFAULT_SECRET_FILE: &str = "role_secret_key";
pub const DEFAULT_TOKEN_FILE: &str = "role_token";
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;

/// Modification times of the three files must be closer than this.
pub const MAX_MTIME_SKEW_SECS: i64 = 10;

/// Where a [`FileCredentialSource`](crate::FileCredentialSource) finds its files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSourceConfig {
    /// Directory holding the three files. Empty means unset.
    pub base_dir: PathBuf,
    pub access_key_file: String,
    pub secret_file: String,
    pub token_file: String,
    /// Pause between seeing all three files change and reading them.
    pub settle_delay_ms: u64,
    /// Strip one trailing `\n` or `\r\n` from each value.
    pub trim_trailing_newline: bool,
}

impl Default for FileSourceConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::new(),
            access_key_file: DEFAULT_ACCESS_KEY_FILE.to_string(),
            secret_file: DEFAULT_SECRET_FILE.to_string(),
            token_file: DEFAULT_TOKEN_FILE.to_string(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            trim_trailing_newline: false,
        }
    }
}

impl FileSourceConfig {
    /// Default file names inside `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    /// Read `ROLES_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            base_dir: env_opt("ROLES_BASE_DIR").map(PathBuf::from).unwrap_or_default(),
            access_key_file: env_with_fallbacks_or(
                &["ROLES_ACCESS_KEY_FILE"],
                DEFAULT_ACCESS_KEY_FILE,
            ),
            secret_file: env_with_fallbacks_or(&["ROLES_SECRET_FILE"], DEFAULT_SECRET_FILE),
            token_file: env_with_fallbacks_or(&["ROLES_TOKEN_FILE"], DEFAULT_TOKEN_FILE),
            settle_delay_ms: env_u64("ROLES_SETTLE_DELAY_MS").unwrap_or(DEFAULT_SETTLE_DELAY_MS),
            trim_trailing_newline: env_bool("ROLES_TRIM_TRAILING_NEWLINE"),
        }
    }

    /// Load from a JSON file. Missing keys take their defaults.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn access_key_file(mut self, name: impl Into<String>) -> Self {
        self.access_key_file = name.into();
        self
    }

    pub fn secret_file(mut self, name: impl Into<String>) -> Self {
        self.secret_file = name.into();
        self
    }

    pub fn token_file(mut self, name: impl Into<String>) -> Self {
        self.token_file = name.into();
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn trim_trailing_newline(mut self, trim: bool) -> Self {
        self.trim_trailing_newline = trim;
        self
    }

    pub fn settle_delay_duration(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn file_name(&self, field: CredentialField) -> &str {
        match field {
            CredentialField::AccessKey => &self.access_key_file,
            CredentialField::Secret => &self.secret_file,
            CredentialField::Token => &self.token_file,
        }
    }

    /// `base_dir`, a separator, then the file name.
    ///
    /// The name is appended, never joined: an absolute name still resolves
    /// inside `base_dir`.
    pub fn file_path(&self, field: CredentialField) -> PathBuf {
        let mut path = self.base_dir.clone().into_os_string();
        path.push(MAIN_SEPARATOR_STR);
        path.push(self.file_name(field));
        PathBuf::from(path)
    }

    /// Check the base directory and file names without touching the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(crate::Error::config("must specify a non-empty base directory"));
        }
        for field in CredentialField::ALL {
            let name = self.file_name(field);
            if !is_valid_file_name(name) {
                return Err(crate::Error::config(format!(
                    "invalid {} file name: {:?}",
                    field, name
                )));
            }
        }
        Ok(())
    }
}

/// Rejects names that would resolve to the directory itself, its parent, or root.
pub fn is_valid_file_name(name: &str) -> bool {
    !matches!(name, "" | "." | ".." | "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = FileSourceConfig::new("/etc/tags");
        assert_eq!(config.access_key_file, "role_access_key");
        assert_eq!(config.secret_file, "role_secret_key");
        assert_eq!(config.token_file, "role_token");
        assert_eq!(config.settle_delay_duration(), Duration::from_secs(1));
        assert!(!config.trim_trailing_newline);
        assert_eq!(
            config.file_path(CredentialField::Token),
            PathBuf::from("/etc/tags/role_token")
        );
    }

    #[test]
    fn test_absolute_file_name_stays_under_base_dir() {
        let config = FileSourceConfig::new("/etc/tags").access_key_file("/tmp/other/a");
        let path = config.file_path(CredentialField::AccessKey);

        assert!(path.starts_with("/etc/tags"), "{}", path.display());
        assert_eq!(path, PathBuf::from("/etc/tags/tmp/other/a"));
    }

    #[test]
    fn test_settle_delay_saturates() {
        let config = FileSourceConfig::default().settle_delay(Duration::MAX);
        assert_eq!(config.settle_delay_ms, u64::MAX);
    }

    #[test]
    fn test_file_name_validity() {
        for bad in ["", ".", "..", "/"] {
            assert!(!is_valid_file_name(bad), "{:?} should be rejected", bad);
        }
        assert!(is_valid_file_name("role_token"));
        assert!(is_valid_file_name(".hidden"));
    }

    #[test]
    fn test_validate_rejects_unset_base_dir() {
        let err = FileSourceConfig::default().validate().unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("base directory"));
    }

    #[test]
    fn test_validate_names_the_bad_field() {
        let err = FileSourceConfig::new("/etc/tags")
            .secret_file("..")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("secret"));
    }

    #[test]
    fn test_from_env() {
        // SAFETY: Test-only environment setup, single-threaded test context
        unsafe {
            std::env::set_var("ROLES_BASE_DIR", "/var/run/roles");
            std::env::set_var("ROLES_TOKEN_FILE", "session");
            std::env::set_var("ROLES_SETTLE_DELAY_MS", "50");
            std::env::set_var("ROLES_TRIM_TRAILING_NEWLINE", "true");
        }

        let config = FileSourceConfig::from_env();
        assert_eq!(config.base_dir, PathBuf::from("/var/run/roles"));
        assert_eq!(config.access_key_file, DEFAULT_ACCESS_KEY_FILE);
        assert_eq!(config.token_file, "session");
        assert_eq!(config.settle_delay_ms, 50);
        assert!(config.trim_trailing_newline);

        unsafe {
            std::env::remove_var("ROLES_BASE_DIR");
            std::env::remove_var("ROLES_TOKEN_FILE");
            std::env::remove_var("ROLES_SETTLE_DELAY_MS");
            std::env::remove_var("ROLES_TRIM_TRAILING_NEWLINE");
        }
    }

    #[tokio::test]
    async fn test_from_file_partial() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("roles.json");
        let json = serde_json::json!({
            "base_dir": "/etc/tags",
            "token_file": "token"
        });
        tokio::fs::write(&path, json.to_string()).await.unwrap();

        let config = FileSourceConfig::from_file(&path).await.unwrap();
        assert_eq!(config.base_dir, PathBuf::from("/etc/tags"));
        assert_eq!(config.token_file, "token");
        assert_eq!(config.secret_file, DEFAULT_SECRET_FILE);
    }

    #[tokio::test]
    async fn test_from_file_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("roles.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let err = FileSourceConfig::from_file(&path).await.unwrap_err();
        assert!(err.is_configuration_error());
    }
}
