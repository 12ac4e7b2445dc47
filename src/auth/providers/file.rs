//! File-backed rotating credential provider.
//!
//! An external process deposits the access key, secret and session token as
//! three files in one directory. [`FileCredentialSource`] reads them as one
//! set under a write lock and refuses sets whose files were written too far
//! apart. Its watch loop re-reads only after all three files have changed.
//!
//! The first `refresh()` must be made explicitly before starting the watch:
//! the loop only reacts to changes, so a provider whose watch setup fails and
//! that was never refreshed stays empty.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notify::{RecursiveMode, Watcher};
use secrecy::SecretString;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::auth::watch::{RotationTracker, WatchState};
use crate::auth::{
    CredentialField, CredentialProvider, Credentials, CredentialsChanged, ProviderType,
    WatchHandle, WatchSink,
};
use crate::config::{FileSourceConfig, MAX_MTIME_SKEW_SECS};
use crate::observability::{RefreshSpan, WatchMetrics};
use crate::{Error, Result};

/// Raw filesystem notification as delivered by `notify`.
pub type FsEvent = notify::Result<notify::Event>;

struct State {
    config: FileSourceConfig,
    credentials: Credentials,
}

/// Credentials read from three files and kept current by a directory watch.
pub struct FileCredentialSource {
    state: RwLock<State>,
    metrics: Arc<WatchMetrics>,
}

impl FileCredentialSource {
    pub fn new(config: FileSourceConfig) -> Self {
        Self {
            state: RwLock::new(State {
                config,
                credentials: Credentials::empty(),
            }),
            metrics: Arc::new(WatchMetrics::new()),
        }
    }

    /// Configured from `ROLES_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(FileSourceConfig::from_env())
    }

    pub fn metrics(&self) -> &Arc<WatchMetrics> {
        &self.metrics
    }

    pub async fn config(&self) -> FileSourceConfig {
        self.state.read().await.config.clone()
    }

    /// Replace the configuration. Takes effect on the next refresh; the
    /// current credentials are kept until then.
    pub async fn reconfigure(&self, config: FileSourceConfig) {
        self.state.write().await.config = config;
    }

    /// Spawn [`CredentialProvider::watch`] on the current runtime.
    pub fn spawn_watch(self: Arc<Self>) -> WatchHandle {
        WatchHandle::spawn(self)
    }

    /// Run the watch state machine over an existing event stream.
    ///
    /// [`CredentialProvider::watch`] feeds this from a `notify` watcher on the
    /// base directory. Returns when `shutdown` fires or the stream ends.
    pub async fn watch_events(
        &self,
        mut events: mpsc::UnboundedReceiver<FsEvent>,
        sink: WatchSink,
        shutdown: CancellationToken,
    ) {
        self.metrics.active_watches.inc();
        let mut tracker = RotationTracker::new();

        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => {
                        tracing::debug!("Filesystem event stream closed");
                        break;
                    }
                },
            };

            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("Filesystem watch error: {}", e);
                    self.metrics.record_watch_error();
                    sink.error(Error::Watch(e));
                    continue;
                }
            };
            self.metrics.record_event();

            let config = self.config().await;
            match tracker.observe(&event, &config) {
                WatchState::Idle => continue,
                WatchState::PartiallyTouched(touched) => {
                    tracing::debug!("{} of 3 credential files touched", touched.len());
                    continue;
                }
                WatchState::FullyTouched => {}
            }

            let settle = config.settle_delay_duration();
            tracing::info!(
                "All credential files touched, waiting {:?} for writes to complete",
                settle
            );
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(settle) => {}
            }
            self.drain_settled(&mut events, &sink);
            tracker.clear();

            match self.refresh().await {
                Ok(()) => {
                    self.metrics.record_change();
                    sink.changed(CredentialsChanged::now());
                }
                Err(e) => {
                    tracing::warn!("Zeroing credentials after failed re-read: {}", e);
                    sink.error(e);
                }
            }
        }

        self.metrics.active_watches.dec();
        tracing::info!("Terminating credential watch");
    }

    /// Swallow events queued during the settle delay; they belong to the
    /// rotation about to be read.
    fn drain_settled(&self, events: &mut mpsc::UnboundedReceiver<FsEvent>, sink: &WatchSink) {
        while let Ok(event) = events.try_recv() {
            match event {
                Ok(_) => self.metrics.record_event(),
                Err(e) => {
                    self.metrics.record_watch_error();
                    sink.error(Error::Watch(e));
                }
            }
        }
    }

    async fn read_field<T>(
        &self,
        field: CredentialField,
        extract: impl FnOnce(&Credentials) -> T + Send,
    ) -> Result<T> {
        let state = self.state.read().await;
        if state.credentials.field_is_empty(field) {
            return Err(Error::MissingField {
                provider: ProviderType::File,
                field,
            });
        }
        Ok(extract(&state.credentials))
    }
}

impl std::fmt::Debug for FileCredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCredentialSource")
            .field("metrics", &self.metrics.summary())
            .finish()
    }
}

/// Read and validate all three files. Does not touch provider state.
async fn read_credential_files(config: &FileSourceConfig) -> Result<Credentials> {
    config.validate()?;

    let paths = CredentialField::ALL.map(|field| config.file_path(field));

    let mut values: [String; 3] = Default::default();
    for (value, path) in values.iter_mut().zip(&paths) {
        *value = read_credential_file(path, config.trim_trailing_newline).await?;
    }

    let mut mtimes = [0i64; 3];
    for (mtime, path) in mtimes.iter_mut().zip(&paths) {
        *mtime = modified_secs(path).await?;
    }
    check_mtime_skew(&mtimes)?;

    let [access_key, secret, token] = values;
    Ok(Credentials::new(access_key, secret, token))
}

/// A zero-length file counts as missing: the writer may be mid-rotation.
async fn read_credential_file(path: &Path, trim_trailing_newline: bool) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::read(path, e.to_string()))?;
    if bytes.is_empty() {
        return Err(Error::read(path, "file is empty"));
    }

    let mut value =
        String::from_utf8(bytes).map_err(|_| Error::read(path, "contents are not valid UTF-8"))?;

    if trim_trailing_newline {
        if value.ends_with('\n') {
            value.pop();
            if value.ends_with('\r') {
                value.pop();
            }
        }
        if value.is_empty() {
            return Err(Error::read(path, "file holds only a newline"));
        }
    }
    Ok(value)
}

async fn modified_secs(path: &Path) -> Result<i64> {
    let stat_err = |source| Error::Stat {
        path: path.to_path_buf(),
        source,
    };
    let modified = tokio::fs::metadata(path)
        .await
        .and_then(|meta| meta.modified())
        .map_err(stat_err)?;
    Ok(DateTime::<Utc>::from(modified).timestamp())
}

fn check_mtime_skew(mtimes: &[i64]) -> Result<()> {
    let newest = mtimes.iter().copied().max().unwrap_or_default();
    let oldest = mtimes.iter().copied().min().unwrap_or_default();
    let spread = newest - oldest;
    if spread >= MAX_MTIME_SKEW_SECS {
        return Err(Error::Skew {
            spread_secs: spread,
            max_secs: MAX_MTIME_SKEW_SECS,
        });
    }
    Ok(())
}

#[async_trait]
impl CredentialProvider for FileCredentialSource {
    fn provider_type(&self) -> ProviderType {
        ProviderType::File
    }

    fn using_iam(&self) -> bool {
        true
    }

    async fn refresh(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let base_dir = state.config.base_dir.display().to_string();
        let span = RefreshSpan::new(ProviderType::File, &base_dir);

        let result = read_credential_files(&state.config)
            .instrument(span.span().clone())
            .await;

        let outcome = match result {
            Ok(credentials) => {
                state.credentials = credentials;
                span.record_success();
                tracing::info!("Credentials assigned from {}", base_dir);
                Ok(())
            }
            Err(e) => {
                state.credentials.reset();
                span.record_failure(&e);
                tracing::warn!("Credential refresh from {} failed: {}", base_dir, e);
                Err(e)
            }
        };
        drop(state);

        let latency_micros = span.finish();
        self.metrics.record_refresh(outcome.is_ok(), latency_micros);
        outcome
    }

    async fn reset(&self) {
        self.state.write().await.credentials.reset();
    }

    async fn is_empty(&self) -> bool {
        let state = self.state.read().await;
        CredentialField::ALL
            .iter()
            .any(|&field| state.config.file_name(field).is_empty())
            || state.credentials.is_empty()
    }

    async fn get(&self) -> Result<Credentials> {
        let state = self.state.read().await;
        match state.credentials.missing_field(true) {
            Some(field) => Err(Error::MissingField {
                provider: ProviderType::File,
                field,
            }),
            None => Ok(state.credentials.clone()),
        }
    }

    async fn access_key(&self) -> Result<String> {
        self.read_field(CredentialField::AccessKey, |c| c.access_key().to_string())
            .await
    }

    async fn secret(&self) -> Result<SecretString> {
        self.read_field(CredentialField::Secret, |c| c.secret().clone())
            .await
    }

    async fn token(&self) -> Result<SecretString> {
        self.read_field(CredentialField::Token, |c| c.token().clone())
            .await
    }

    async fn watch(&self, sink: WatchSink, shutdown: CancellationToken) {
        let base_dir = self.state.read().await.config.base_dir.clone();
        if base_dir.as_os_str().is_empty() {
            sink.error(Error::config("must specify a non-empty base directory"));
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = notify::recommended_watcher(move |res: FsEvent| {
            let _ = tx.send(res);
        });
        let mut watcher = match watcher {
            Ok(watcher) => watcher,
            Err(e) => {
                tracing::error!("Failed to create filesystem watcher: {}", e);
                sink.error(Error::Watch(e));
                return;
            }
        };
        if let Err(e) = watcher.watch(&base_dir, RecursiveMode::NonRecursive) {
            tracing::error!("Failed to watch {}: {}", base_dir.display(), e);
            sink.error(Error::Watch(e));
            return;
        }

        tracing::info!("Watching {} for credential rotation", base_dir.display());
        self.watch_events(rx, sink, shutdown).await;
        drop(watcher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write_fixture(dir: &Path, access: &str, secret: &str, token: &str) {
        std::fs::write(dir.join("role_access_key"), access).unwrap();
        std::fs::write(dir.join("role_secret_key"), secret).unwrap();
        std::fs::write(dir.join("role_token"), token).unwrap();
    }

    fn source(dir: &Path) -> FileCredentialSource {
        FileCredentialSource::new(FileSourceConfig::new(dir))
    }

    #[test]
    fn test_check_mtime_skew() {
        assert!(check_mtime_skew(&[100, 105, 109]).is_ok());
        assert!(matches!(
            check_mtime_skew(&[100, 105, 110]),
            Err(Error::Skew { spread_secs: 10, .. })
        ));
        assert!(check_mtime_skew(&[110, 100, 100]).is_err());
    }

    #[tokio::test]
    async fn test_refresh_reads_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        write_fixture(temp_dir.path(), "AKID\n", " SECRET", "TOKEN");

        let source = source(temp_dir.path());
        source.refresh().await.unwrap();

        let creds = source.get().await.unwrap();
        assert_eq!(creds.access_key(), "AKID\n");
        assert_eq!(creds.secret().expose_secret(), " SECRET");
        assert_eq!(creds.token().expose_secret(), "TOKEN");
    }

    #[tokio::test]
    async fn test_trim_trailing_newline() {
        let temp_dir = TempDir::new().unwrap();
        write_fixture(temp_dir.path(), "AKID\n", "SECRET\r\n", "TOKEN");

        let source = FileCredentialSource::new(
            FileSourceConfig::new(temp_dir.path()).trim_trailing_newline(true),
        );
        source.refresh().await.unwrap();

        assert_eq!(source.access_key().await.unwrap(), "AKID");
        assert_eq!(source.secret().await.unwrap().expose_secret(), "SECRET");
        assert_eq!(source.token().await.unwrap().expose_secret(), "TOKEN");
    }

    #[tokio::test]
    async fn test_newline_only_file_is_missing_when_trimming() {
        let temp_dir = TempDir::new().unwrap();
        write_fixture(temp_dir.path(), "AKID", "\n", "TOKEN");

        let source = FileCredentialSource::new(
            FileSourceConfig::new(temp_dir.path()).trim_trailing_newline(true),
        );
        assert!(matches!(source.refresh().await, Err(Error::Read { .. })));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_read_error() {
        let temp_dir = TempDir::new().unwrap();
        write_fixture(temp_dir.path(), "AKID", "SECRET", "TOKEN");
        std::fs::write(temp_dir.path().join("role_secret_key"), [0xff, 0xfe]).unwrap();

        let err = source(temp_dir.path()).refresh().await.unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[tokio::test]
    async fn test_skewed_files_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_fixture(temp_dir.path(), "AKID", "SECRET", "TOKEN");
        let stale = SystemTime::now() - Duration::from_secs(60);
        std::fs::File::options()
            .write(true)
            .open(temp_dir.path().join("role_token"))
            .unwrap()
            .set_modified(stale)
            .unwrap();

        let source = source(temp_dir.path());
        assert!(matches!(source.refresh().await, Err(Error::Skew { .. })));
        assert!(source.is_empty().await);
    }

    #[tokio::test]
    async fn test_getters_fail_before_refresh() {
        let temp_dir = TempDir::new().unwrap();
        let source = source(temp_dir.path());

        assert!(source.is_empty().await);
        assert!(matches!(
            source.get().await,
            Err(Error::MissingField {
                field: CredentialField::AccessKey,
                ..
            })
        ));
        assert!(matches!(
            source.token().await,
            Err(Error::MissingField {
                field: CredentialField::Token,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_reset_clears() {
        let temp_dir = TempDir::new().unwrap();
        write_fixture(temp_dir.path(), "AKID", "SECRET", "TOKEN");

        let source = source(temp_dir.path());
        source.refresh().await.unwrap();
        assert!(!source.is_empty().await);

        source.reset().await;
        assert!(source.is_empty().await);
        assert!(source.secret().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_file_name_makes_source_empty() {
        let temp_dir = TempDir::new().unwrap();
        write_fixture(temp_dir.path(), "AKID", "SECRET", "TOKEN");

        let source = source(temp_dir.path());
        source.refresh().await.unwrap();
        source
            .reconfigure(FileSourceConfig::new(temp_dir.path()).token_file(""))
            .await;

        assert!(source.is_empty().await);
        assert!(source.get().await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_metrics() {
        let temp_dir = TempDir::new().unwrap();
        write_fixture(temp_dir.path(), "AKID", "SECRET", "TOKEN");

        let source = source(temp_dir.path());
        source.refresh().await.unwrap();
        std::fs::remove_file(temp_dir.path().join("role_secret_key")).unwrap();
        let _ = source.refresh().await;

        let summary = source.metrics().summary();
        assert_eq!(summary.refreshes, 2);
        assert_eq!(summary.failed_refreshes, 1);
    }

    #[tokio::test]
    async fn test_watch_without_base_dir_reports_config_error() {
        let source = FileCredentialSource::new(FileSourceConfig::default());
        let (sink, mut errors, _changes) = WatchSink::channel();

        source.watch(sink, CancellationToken::new()).await;

        assert!(errors.recv().await.unwrap().is_configuration_error());
    }

    #[tokio::test]
    async fn test_watch_events_stops_on_cancel() {
        let temp_dir = TempDir::new().unwrap();
        let source = source(temp_dir.path());
        let (_tx, rx) = mpsc::unbounded_channel();
        let (sink, _errors, _changes) = WatchSink::channel();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        source.watch_events(rx, sink, shutdown).await;
        assert_eq!(source.metrics().summary().active_watches, 0);
    }
}
