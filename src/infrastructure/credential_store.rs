use crate::infrastructure::error::InfraError;
use std::sync::Mutex;

pub const API_KEY_SERVICE: &str = "takwim.suggestion.gemini";
pub const ADMIN_SECRET_SERVICE: &str = "takwim.admin";

pub trait CredentialStore: Send + Sync {
    fn save_secret(&self, secret: &str) -> Result<(), InfraError>;
    fn load_secret(&self) -> Result<Option<String>, InfraError>;
    fn delete_secret(&self) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service_name: String,
    account_name: String,
}

impl KeyringCredentialStore {
    pub fn new(service_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_name: account_name.into(),
        }
    }

    pub fn api_key() -> Self {
        Self::new(API_KEY_SERVICE, "default")
    }

    pub fn admin_secret() -> Self {
        Self::new(ADMIN_SECRET_SERVICE, "default")
    }

    fn entry(&self) -> Result<keyring::Entry, InfraError> {
        keyring::Entry::new(&self.service_name, &self.account_name)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn save_secret(&self, secret: &str) -> Result<(), InfraError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(InfraError::Credential("secret must not be empty".to_string()));
        }
        self.entry()?
            .set_password(secret)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }

    fn load_secret(&self) -> Result<Option<String>, InfraError> {
        match self.entry()?.get_password() {
            Ok(value) => Ok(Some(value).filter(|value| !value.trim().is_empty())),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }

    fn delete_secret(&self) -> Result<(), InfraError> {
        match self.entry()?.delete_credential() {
            Ok(_) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    secret: Mutex<Option<String>>,
}

impl InMemoryCredentialStore {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: Mutex::new(Some(secret.into())),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn save_secret(&self, secret: &str) -> Result<(), InfraError> {
        let mut guard = self
            .secret
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = Some(secret.to_string());
        Ok(())
    }

    fn load_secret(&self) -> Result<Option<String>, InfraError> {
        let guard = self
            .secret
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        Ok(guard.clone())
    }

    fn delete_secret(&self) -> Result<(), InfraError> {
        let mut guard = self
            .secret
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = None;
        Ok(())
    }
}

/// First non-empty value among the env keys, then the credential store.
pub fn resolve_secret<F>(
    lookup: &F,
    keys: &[&str],
    store: &dyn CredentialStore,
) -> Result<Option<String>, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = crate::infrastructure::config::optional_lookup_value(lookup, keys) {
        return Ok(Some(value));
    }
    store.load_secret()
}
