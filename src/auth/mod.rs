//! Credential sources.
//!
//! Three providers share the [`CredentialProvider`] capability set:
//! - **File**: rotating access key, secret and session token read from three
//!   files in one directory, kept current by a filesystem watch loop
//! - **Master**: durable access key and secret fixed at construction
//! - **Simple**: fixed access key, secret and session token

mod credential;
mod provider;
mod providers;
#[cfg(feature = "aws")]
mod sdk;
mod watch;

pub use credential::{CredentialField, Credentials};
pub use provider::{CredentialProvider, CredentialsChanged, ProviderType, WatchHandle, WatchSink};
pub use providers::{
    FileCredentialSource, FsEvent, SessionCredentialSource, StaticCredentialSource,
};
#[cfg(feature = "aws")]
pub use sdk::SdkCredentialsProvider;
pub use watch::{RotationTracker, TouchedFiles, WatchState, is_rotation_event};
