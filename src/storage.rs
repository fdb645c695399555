use keyring::{Entry, Error as KeyringError};

use crate::error::{AppError, AppResult};

const SERVICE_NAME: &str = "pr-feedback";
const ACCOUNT_NAME: &str = "github-token";

/// Reads the GitHub token saved in the OS keychain, if any.
pub fn read_token() -> AppResult<Option<String>> {
    let entry = Entry::new(SERVICE_NAME, ACCOUNT_NAME)?;
    match entry.get_password() {
        Ok(password) if !password.trim().is_empty() => Ok(Some(password)),
        Ok(_) => Ok(None),
        Err(err) => match err {
            KeyringError::NoEntry => Ok(None),
            other => Err(AppError::from(other)),
        },
    }
}
