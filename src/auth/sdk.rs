//! Bridge into the AWS SDK credential chain.

use std::fmt;
use std::sync::Arc;

use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{self, ProvideCredentials};

use super::CredentialProvider;
use crate::{Error, Result};

/// Exposes any [`CredentialProvider`] as an SDK [`ProvideCredentials`].
///
/// Each call reads the current snapshot, so rotations installed by a watch
/// loop are picked up on the next signing request.
#[derive(Clone)]
pub struct SdkCredentialsProvider {
    provider: Arc<dyn CredentialProvider>,
}

impl SdkCredentialsProvider {
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self { provider }
    }

    pub async fn credentials(&self) -> Result<aws_credential_types::Credentials> {
        let creds = self.provider.get().await?;
        Ok(creds.to_sdk_credentials(self.provider_name()))
    }

    fn provider_name(&self) -> &'static str {
        match self.provider.provider_type() {
            super::ProviderType::File => "RolesFileProvider",
            super::ProviderType::Master => "RolesMasterProvider",
            super::ProviderType::Simple => "RolesSimpleProvider",
        }
    }
}

impl fmt::Debug for SdkCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkCredentialsProvider")
            .field("provider", &self.provider.provider_type())
            .finish()
    }
}

impl ProvideCredentials for SdkCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> provider::future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        provider::future::ProvideCredentials::new(async move {
            self.credentials().await.map_err(|e| match e {
                Error::MissingField { .. } => CredentialsError::not_loaded(e),
                other => CredentialsError::provider_error(other),
            })
        })
    }
}
