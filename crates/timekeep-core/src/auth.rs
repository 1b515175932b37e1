//! Bearer credential providers.
//!
//! Token acquisition (login flows, OAuth, identity pools) is out of scope;
//! a provider only surfaces an already-provisioned bearer token and reacts
//! to expiry. A 401 from the service invalidates the provider, which is how
//! the forced sign-out propagates to every component sharing it.

use parking_lot::Mutex;

use crate::error::AuthError;

/// Source of the bearer credential attached to every remote call.
pub trait CredentialProvider: Send + Sync {
    /// Current bearer token, if signed in.
    fn token(&self) -> Result<String, AuthError>;

    /// Discard the credential. Called when the server rejects it.
    fn invalidate(&self);

    fn is_signed_in(&self) -> bool {
        self.token().is_ok()
    }
}

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    const SERVICE: &str = "timekeep";

    pub fn get(key: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    pub fn delete(key: &str) -> Result<(), Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

const TOKEN_KEY: &str = "api_token";

/// Credentials persisted in the OS keyring.
///
/// Invalidation deletes the stored token, so a forced sign-out survives
/// process restarts.
#[derive(Default)]
pub struct KeyringCredentials;

impl KeyringCredentials {
    pub fn new() -> Self {
        Self
    }

    /// Persist a user-provided token to the OS keyring.
    pub fn store_token(token: &str) -> Result<(), AuthError> {
        keyring_store::set(TOKEN_KEY, token).map_err(|e| AuthError::Store(e.to_string()))
    }
}

impl CredentialProvider for KeyringCredentials {
    fn token(&self) -> Result<String, AuthError> {
        keyring_store::get(TOKEN_KEY)
            .map_err(|e| AuthError::Store(e.to_string()))?
            .ok_or(AuthError::NotSignedIn)
    }

    fn invalidate(&self) {
        if let Err(e) = keyring_store::delete(TOKEN_KEY) {
            tracing::warn!(error = %e, "failed to clear stored credential");
        }
    }
}

/// In-memory credentials for tests and scripting.
pub struct StaticCredentials {
    token: Mutex<Option<String>>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn token(&self) -> Result<String, AuthError> {
        self.token.lock().clone().ok_or(AuthError::NotSignedIn)
    }

    fn invalidate(&self) {
        *self.token.lock() = None;
    }
}
