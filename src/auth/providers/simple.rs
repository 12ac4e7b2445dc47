//! Simple (fixed session) credential provider.

use async_trait::async_trait;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use super::fixed::FixedCredentials;
use crate::Result;
use crate::auth::{CredentialField, CredentialProvider, Credentials, ProviderType, WatchSink};
use crate::config::env::{env_opt, env_with_fallbacks};

/// Access key, secret and session token, fixed at construction.
///
/// The most flexible immutable provider: use it when the values come from
/// somewhere this crate does not manage.
#[derive(Debug)]
pub struct SessionCredentialSource {
    inner: FixedCredentials,
}

impl SessionCredentialSource {
    pub fn new(
        access_key: impl Into<String>,
        secret: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            inner: FixedCredentials::new(
                ProviderType::Simple,
                true,
                Credentials::new(access_key, secret, token),
            ),
        }
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Option<Self> {
        let access_key = env_with_fallbacks(&["AWS_ACCESS_KEY_ID", "AWS_ACCESS_KEY"])?;
        let secret = env_with_fallbacks(&["AWS_SECRET_ACCESS_KEY", "AWS_SECRET_KEY"])?;
        let token = env_opt("AWS_SESSION_TOKEN")?;
        Some(Self::new(access_key, secret, token))
    }
}

#[async_trait]
impl CredentialProvider for SessionCredentialSource {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Simple
    }

    fn using_iam(&self) -> bool {
        true
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
        self.inner
            .field(CredentialField::Token, |c| c.token().clone())
            .await
    }

    async fn watch(&self, sink: WatchSink, _shutdown: CancellationToken) {
        self.inner.reject_watch(&sink);
    }
}
