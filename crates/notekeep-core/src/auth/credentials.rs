use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "notekeep";

/// Optional "remember me" storage for the login password, backed by the OS
/// keychain. Used for a single silent re-login when a restored session has
/// expired; nothing here is required for normal operation.
pub struct CredentialStore;

impl CredentialStore {
    /// Store the password for an account email in the OS keychain
    pub fn store(email: &str, password: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Retrieve the remembered password for an account email
    pub fn get_password(email: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    /// Delete the remembered password for an account email
    pub fn delete(email: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }

    /// Check whether a password is remembered for an account email
    pub fn has_credentials(email: &str) -> bool {
        Entry::new(SERVICE_NAME, email)
            .map(|entry| entry.get_password().is_ok())
            .unwrap_or(false)
    }
}
