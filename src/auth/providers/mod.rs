//! Credential provider implementations.

mod file;
mod fixed;
mod master;
mod simple;

pub use file::{FileCredentialSource, FsEvent};
pub use master::StaticCredentialSource;
pub use simple::SessionCredentialSource;
