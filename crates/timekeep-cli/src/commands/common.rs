//! Shared construction helpers for CLI commands.

use std::sync::Arc;

use timekeep_core::{ApiClient, Config, CredentialProvider, KeyringCredentials, Tracker};

pub fn credentials() -> Arc<dyn CredentialProvider> {
    Arc::new(KeyringCredentials::new())
}

pub fn build_api() -> Result<ApiClient, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    Ok(ApiClient::from_config(&config, credentials())?)
}

pub fn build_tracker() -> Result<Tracker, Box<dyn std::error::Error>> {
    Ok(Tracker::new(build_api()?))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
