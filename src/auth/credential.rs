//! Credential types.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// One field of a credential set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialField {
    AccessKey,
    Secret,
    Token,
}

impl CredentialField {
    pub const ALL: [CredentialField; 3] = [
        CredentialField::AccessKey,
        CredentialField::Secret,
        CredentialField::Token,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialField::AccessKey => "access key",
            CredentialField::Secret => "secret",
            CredentialField::Token => "token",
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access key, secret and session token.
///
/// An empty string in any field marks the set as unpopulated. Providers only
/// ever replace all three fields together.
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    secret: SecretString,
    token: SecretString,
}

impl Credentials {
    pub fn new(
        access_key: impl Into<String>,
        secret: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret: SecretString::from(secret.into()),
            token: SecretString::from(token.into()),
        }
    }

    /// Access key and secret only, for durable non-IAM credentials.
    pub fn key_pair(access_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::new(access_key, secret, String::new())
    }

    pub fn empty() -> Self {
        Self::new(String::new(), String::new(), String::new())
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// True if any of the three fields is empty.
    ///
    /// This is the unpopulated sentinel. It does not treat a missing token as
    /// acceptable; key-pair sources check [`Credentials::missing_field`] with
    /// `require_token = false` instead.
    pub fn is_empty(&self) -> bool {
        self.missing_field(true).is_some()
    }

    /// First empty field in access key, secret, token order.
    pub fn missing_field(&self, require_token: bool) -> Option<CredentialField> {
        if self.access_key.is_empty() {
            Some(CredentialField::AccessKey)
        } else if self.secret.expose_secret().is_empty() {
            Some(CredentialField::Secret)
        } else if require_token && self.token.expose_secret().is_empty() {
            Some(CredentialField::Token)
        } else {
            None
        }
    }

    pub fn field_is_empty(&self, field: CredentialField) -> bool {
        match field {
            CredentialField::AccessKey => self.access_key.is_empty(),
            CredentialField::Secret => self.secret.expose_secret().is_empty(),
            CredentialField::Token => self.token.expose_secret().is_empty(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::empty();
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret", &"[redacted]")
            .field(
                "token",
                &(!self.token.expose_secret().is_empty()).then_some("[redacted]"),
            )
            .finish()
    }
}

#[cfg(feature = "aws")]
impl Credentials {
    /// Copy the fields into the AWS SDK credential type.
    ///
    /// An empty token maps to `None`.
    pub fn to_sdk_credentials(
        &self,
        provider_name: &'static str,
    ) -> aws_credential_types::Credentials {
        let token = self.token.expose_secret();
        aws_credential_types::Credentials::new(
            self.access_key.clone(),
            self.secret.expose_secret().to_string(),
            (!token.is_empty()).then(|| token.to_string()),
            None,
            provider_name,
        )
    }
}
