//! Credential provider trait.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::Credentials;
use crate::{Error, Result};

/// Diagnostic tag for a provider implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    /// Rotating credentials read from watched files.
    File,
    /// Durable access key and secret.
    Master,
    /// Fixed access key, secret and session token.
    Simple,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::File => "file",
            ProviderType::Master => "master",
            ProviderType::Simple => "simple",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted after the watch loop installs a new credential set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialsChanged {
    pub refreshed_at: DateTime<Utc>,
}

impl CredentialsChanged {
    pub fn now() -> Self {
        Self {
            refreshed_at: Utc::now(),
        }
    }
}

/// Output channels of a watch loop.
///
/// Sends never block. A dropped receiver is not an error for the loop: it
/// keeps the provider current even when nobody listens.
#[derive(Debug, Clone)]
pub struct WatchSink {
    errors: mpsc::UnboundedSender<Error>,
    changes: mpsc::UnboundedSender<CredentialsChanged>,
}

impl WatchSink {
    pub fn new(
        errors: mpsc::UnboundedSender<Error>,
        changes: mpsc::UnboundedSender<CredentialsChanged>,
    ) -> Self {
        Self { errors, changes }
    }

    /// Create a sink together with its receiving ends.
    pub fn channel() -> (
        Self,
        mpsc::UnboundedReceiver<Error>,
        mpsc::UnboundedReceiver<CredentialsChanged>,
    ) {
        let (err_tx, err_rx) = mpsc::unbounded_channel();
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        (Self::new(err_tx, change_tx), err_rx, change_rx)
    }

    pub fn error(&self, err: Error) {
        if let Err(e) = self.errors.send(err) {
            tracing::debug!("Watch error dropped, receiver closed: {}", e.0);
        }
    }

    pub fn changed(&self, event: CredentialsChanged) {
        if self.changes.send(event).is_err() {
            tracing::debug!("Change signal dropped, receiver closed");
        }
    }
}

/// Capability set shared by every credential source.
///
/// Callers hold `Arc<dyn CredentialProvider>` and never branch on
/// [`ProviderType`]; the tag exists for diagnostics only.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Provider tag for logging.
    fn provider_type(&self) -> ProviderType;

    /// Whether the credentials are temporary and carry a session token.
    fn using_iam(&self) -> bool;

    /// Blocking re-read from the backing source.
    ///
    /// On failure the provider is left empty and the error is returned.
    async fn refresh(&self) -> Result<()>;

    /// Clear all credential fields.
    async fn reset(&self);

    /// Whether the provider has no usable credentials.
    async fn is_empty(&self) -> bool;

    /// All fields, read under one lock acquisition.
    async fn get(&self) -> Result<Credentials>;

    async fn access_key(&self) -> Result<String>;

    async fn secret(&self) -> Result<SecretString>;

    async fn token(&self) -> Result<SecretString>;

    /// Keep the credentials current until `shutdown` fires.
    ///
    /// Failures are reported on the sink. Providers that cannot watch report
    /// [`Error::NotSupported`] there and return at once.
    async fn watch(&self, sink: WatchSink, shutdown: CancellationToken);
}

/// A watch loop running on its own task.
///
/// Dropping the handle does not stop the loop; call [`WatchHandle::stop`]
/// or cancel the token from [`WatchHandle::shutdown_token`].
#[derive(Debug)]
pub struct WatchHandle {
    pub errors: mpsc::UnboundedReceiver<Error>,
    pub changes: mpsc::UnboundedReceiver<CredentialsChanged>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Spawn `provider.watch` on the current tokio runtime.
    pub fn spawn<P>(provider: Arc<P>) -> Self
    where
        P: CredentialProvider + ?Sized + 'static,
    {
        let (sink, errors, changes) = WatchSink::channel();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let task = tokio::spawn(async move {
            provider.watch(sink, token).await;
        });

        Self {
            errors,
            changes,
            shutdown,
            task,
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Whether the watch loop has returned.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for it to return.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("Watch task did not shut down cleanly: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_tags() {
        assert_eq!(ProviderType::File.to_string(), "file");
        assert_eq!(ProviderType::Master.to_string(), "master");
        assert_eq!(ProviderType::Simple.to_string(), "simple");
    }

    #[tokio::test]
    async fn test_sink_delivers() {
        let (sink, mut errors, mut changes) = WatchSink::channel();

        sink.error(Error::config("bad"));
        sink.changed(CredentialsChanged::now());

        assert!(errors.recv().await.unwrap().is_configuration_error());
        assert!(changes.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_sink_survives_closed_receivers() {
        let (sink, errors, changes) = WatchSink::channel();
        drop(errors);
        drop(changes);

        sink.error(Error::config("nobody listening"));
        sink.changed(CredentialsChanged::now());
    }

    struct Idle;

    #[async_trait]
    impl CredentialProvider for Idle {
        fn provider_type(&self) -> ProviderType {
            ProviderType::Simple
        }
        fn using_iam(&self) -> bool {
            false
        }
        async fn refresh(&self) -> Result<()> {
            Ok(())
        }
        async fn reset(&self) {}
        async fn is_empty(&self) -> bool {
            true
        }
        async fn get(&self) -> Result<Credentials> {
            Ok(Credentials::empty())
        }
        async fn access_key(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn secret(&self) -> Result<SecretString> {
            Ok(SecretString::from(String::new()))
        }
        async fn token(&self) -> Result<SecretString> {
            Ok(SecretString::from(String::new()))
        }
        async fn watch(&self, _sink: WatchSink, shutdown: CancellationToken) {
            shutdown.cancelled().await;
        }
    }

    #[tokio::test]
    async fn test_watch_handle_stop() {
        let provider: Arc<dyn CredentialProvider> = Arc::new(Idle);
        let handle = WatchHandle::spawn(provider);
        assert!(!handle.shutdown_token().is_cancelled());

        tokio::time::timeout(std::time::Duration::from_secs(5), handle.stop())
            .await
            .expect("watch loop should exit on cancel");
    }
}
