//! Credential storage in the OS keyring.
//!
//! The daemon password and the recommendation API key can be kept out of
//! `config.toml`. Entries live under the service name "playtally" with keys of
//! the form `<service>/<kind>`.

use thiserror::Error;

const SERVICE_NAME: &str = "playtally";

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("credential not found: {key}")]
    NotFound { key: String },

    #[error("keyring access denied: {0}")]
    AccessDenied(String),

    #[error("keyring unavailable: {0}")]
    Unavailable(String),

    #[error("keyring error: {0}")]
    Other(String),
}

impl From<keyring::Error> for SecretsError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoEntry => SecretsError::NotFound {
                key: "unknown".into(),
            },
            keyring::Error::NoStorageAccess(e) => SecretsError::AccessDenied(e.to_string()),
            keyring::Error::PlatformFailure(e) => SecretsError::Unavailable(e.to_string()),
            other => SecretsError::Other(other.to_string()),
        }
    }
}

pub type SecretsResult<T> = Result<T, SecretsError>;

/// External services a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretService {
    Mpd,
    LastFm,
}

impl SecretService {
    fn as_str(&self) -> &'static str {
        match self {
            SecretService::Mpd => "mpd",
            SecretService::LastFm => "lastfm",
        }
    }

    /// The one kind of secret each service needs.
    pub fn kind(&self) -> SecretKind {
        match self {
            SecretService::Mpd => SecretKind::Password,
            SecretService::LastFm => SecretKind::ApiKey,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Password,
    ApiKey,
}

impl SecretKind {
    fn as_str(&self) -> &'static str {
        match self {
            SecretKind::Password => "password",
            SecretKind::ApiKey => "api_key",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    service: String,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.into(),
        }
    }

    fn build_key(service: SecretService) -> String {
        format!("{}/{}", service.as_str(), service.kind().as_str())
    }

    pub fn store(&self, service: SecretService, secret: &str) -> SecretsResult<()> {
        let key = Self::build_key(service);
        let entry = keyring::Entry::new(&self.service, &key)?;
        entry.set_password(secret)?;
        tracing::debug!(service = service.as_str(), "stored credential in keyring");
        Ok(())
    }

    /// Returns `SecretsError::NotFound` if nothing is stored.
    pub fn get(&self, service: SecretService) -> SecretsResult<String> {
        let key = Self::build_key(service);
        let entry = keyring::Entry::new(&self.service, &key)?;
        match entry.get_password() {
            Ok(secret) => Ok(secret),
            Err(keyring::Error::NoEntry) => Err(SecretsError::NotFound { key }),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`get`](Self::get) but treats a missing entry or an unusable
    /// keyring as "no secret".
    pub fn lookup(&self, service: SecretService) -> Option<String> {
        match self.get(service) {
            Ok(secret) => Some(secret),
            Err(SecretsError::NotFound { .. }) => None,
            Err(e) => {
                tracing::debug!(service = service.as_str(), error = %e, "keyring lookup failed");
                None
            }
        }
    }

    /// Deleting a missing entry is not an error.
    pub fn delete(&self, service: SecretService) -> SecretsResult<()> {
        let key = Self::build_key(service);
        let entry = keyring::Entry::new(&self.service, &key)?;
        match entry.delete_credential() {
            Ok(()) => {
                tracing::debug!(service = service.as_str(), "deleted credential from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
