//! Master (durable key pair) credential provider.

use async_trait::async_trait;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use super::fixed::FixedCredentials;
use crate::auth::{CredentialField, CredentialProvider, Credentials, ProviderType, WatchSink};
use crate::config::env::env_with_fallbacks;
use crate::{Error, Result};

/// Long-lived access key and secret, fixed at construction.
///
/// These credentials have no session token: `token()` reports
/// [`Error::NotSupported`] and `get()` returns an empty token.
#[derive(Debug)]
pub struct StaticCredentialSource {
    inner: FixedCredentials,
}

impl StaticCredentialSource {
    pub fn new(access_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            inner: FixedCredentials::new(
                ProviderType::Master,
                false,
                Credentials::key_pair(access_key, secret),
            ),
        }
    }

    /// Alias of [`StaticCredentialSource::new`].
    pub fn with_credentials(access_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::new(access_key, secret)
    }

    /// Read `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY`.
    pub fn from_env() -> Option<Self> {
        let access_key = env_with_fallbacks(&["AWS_ACCESS_KEY_ID", "AWS_ACCESS_KEY"])?;
        let secret = env_with_fallbacks(&["AWS_SECRET_ACCESS_KEY", "AWS_SECRET_KEY"])?;
        Some(Self::new(access_key, secret))
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialSource {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Master
    }

    fn using_iam(&self) -> bool {
        false
    }

    async fn refresh(&self) -> Result<()> {
        self.inner.refresh()
    }

    async fn reset(&self) {
        self.inner.reset().await;
    }

    async fn is_empty(&self) -> bool {
        self.inner.is_empty().await
    }

    async fn get(&self) -> Result<Credentials> {
        self.inner.get().await
    }

    async fn access_key(&self) -> Result<String> {
        self.inner
            .field(CredentialField::AccessKey, |c| c.access_key().to_string())
            .await
    }

    async fn secret(&self) -> Result<SecretString> {
        self.inner
            .field(CredentialField::Secret, |c| c.secret().clone())
            .await
    }

    async fn token(&self) -> Result<SecretString> {
        Err(Error::NotSupported {
            provider: ProviderType::Master,
            operation: "token",
        })
    }

    async fn watch(&self, sink: WatchSink, _shutdown: CancellationToken) {
        self.inner.reject_watch(&sink);
    }
}
