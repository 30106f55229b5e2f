//! Private API key storage in the system keyring.
//!
//! Keeps the account's private key out of configuration files by storing it
//! in the platform's native credential store:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use keyring::Entry;
use tracing::{debug, warn};

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "emma";

/// Credential type identifier for the API private key.
const PRIVATE_KEY_CREDENTIAL: &str = "private_key";

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Account ID is required for credential operations.
    #[error("Account ID is required for credential storage")]
    MissingAccountId,
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

fn entry(account_id: &str) -> CredentialResult<Entry> {
    let account_id = account_id.trim();
    if account_id.is_empty() {
        return Err(CredentialError::MissingAccountId);
    }
    let key = format!("{SERVICE_NAME}_{PRIVATE_KEY_CREDENTIAL}_{account_id}");
    Ok(Entry::new(SERVICE_NAME, &key)?)
}

/// Stores the private API key for `account_id`.
///
/// # Errors
///
/// Returns an error if the account id is blank or the keyring operation fails.
pub fn store_private_key(account_id: &str, private_key: &str) -> CredentialResult<()> {
    entry(account_id)?.set_password(private_key)?;
    debug!("Stored private key for account {account_id}");
    Ok(())
}

/// Retrieves the private API key for `account_id`, if one is stored.
///
/// # Errors
///
/// Returns an error if the account id is blank or the keyring operation fails.
pub fn get_private_key(account_id: &str) -> CredentialResult<Option<String>> {
    match entry(account_id)?.get_password() {
        Ok(key) => Ok(Some(key)),
        Err(keyring::Error::NoEntry) => {
            debug!("No private key found for account {account_id}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes the stored private API key. A missing entry is not an error.
///
/// # Errors
///
/// Returns an error if the account id is blank or the keyring operation fails.
pub fn delete_private_key(account_id: &str) -> CredentialResult<()> {
    match entry(account_id)?.delete_credential() {
        Ok(()) => debug!("Deleted private key for account {account_id}"),
        Err(keyring::Error::NoEntry) => {
            debug!("No private key to delete for account {account_id}");
        }
        Err(e) => {
            warn!("Failed to delete private key: {e}");
            return Err(e.into());
        }
    }
    Ok(())
}
