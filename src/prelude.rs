//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust
//! use aws_roles::prelude::*;
//! ```

// Core types
pub use crate::Error;
pub use crate::Result;

// Credentials
pub use crate::auth::{CredentialField, Credentials};

// Providers
pub use crate::auth::{
    CredentialProvider, FileCredentialSource, ProviderType, SessionCredentialSource,
    StaticCredentialSource,
};

// Watching
pub use crate::auth::{CredentialsChanged, WatchHandle, WatchSink};

// Configuration
pub use crate::config::FileSourceConfig;

#[cfg(feature = "aws")]
pub use crate::auth::SdkCredentialsProvider;
