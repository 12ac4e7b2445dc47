//! Shared state for providers whose credentials never rotate.

use tokio::sync::RwLock;

use crate::auth::{CredentialField, Credentials, ProviderType, WatchSink};
use crate::{Error, Result};

pub(crate) struct FixedCredentials {
    provider: ProviderType,
    require_token: bool,
    credentials: RwLock<Credentials>,
}

impl FixedCredentials {
    pub(crate) fn new(
        provider: ProviderType,
        require_token: bool,
        credentials: Credentials,
    ) -> Self {
        Self {
            provider,
            require_token,
            credentials: RwLock::new(credentials),
        }
    }

    pub(crate) async fn is_empty(&self) -> bool {
        self.credentials
            .read()
            .await
            .missing_field(self.require_token)
            .is_some()
    }

    pub(crate) async fn reset(&self) {
        self.credentials.write().await.reset();
    }

    pub(crate) async fn get(&self) -> Result<Credentials> {
        let credentials = self.credentials.read().await;
        match credentials.missing_field(self.require_token) {
            Some(field) => Err(self.missing(field)),
            None => Ok(credentials.clone()),
        }
    }

    pub(crate) async fn field<T>(
        &self,
        field: CredentialField,
        extract: impl FnOnce(&Credentials) -> T + Send,
    ) -> Result<T> {
        let credentials = self.credentials.read().await;
        if credentials.field_is_empty(field) {
            return Err(self.missing(field));
        }
        Ok(extract(&credentials))
    }

    pub(crate) fn refresh(&self) -> Result<()> {
        tracing::debug!("{} credentials are immutable, refresh is a no-op", self.provider);
        Ok(())
    }

    pub(crate) fn reject_watch(&self, sink: &WatchSink) {
        tracing::error!(
            "watch started on immutable {} credentials; nothing will ever change",
            self.provider
        );
        sink.error(Error::NotSupported {
            provider: self.provider,
            operation: "watch",
        });
    }

    fn missing(&self, field: CredentialField) -> Error {
        Error::MissingField {
            provider: self.provider,
            field,
        }
    }
}

impl std::fmt::Debug for FixedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedCredentials")
            .field("provider", &self.provider)
            .field("require_token", &self.require_token)
            .finish()
    }
}
