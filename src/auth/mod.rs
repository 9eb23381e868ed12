pub mod storage;

pub use storage::AuthStorage;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use storage::Credential;

/// Save an API key for `provider`.
///
/// Shared by the `answerbook login` subcommand and `--save-key`.
pub fn login(db_path: &str, provider: &str, key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        bail!("API key must not be empty");
    }
    let storage = AuthStorage::open(db_path).context("failed to open auth storage")?;
    storage
        .set(
            provider,
            Credential::ApiKey {
                key: key.to_string(),
            },
        )
        .context("failed to save credentials")?;
    Ok(())
}

/// Remove stored credentials for a provider.
pub fn logout(db_path: &str, provider: &str) -> Result<()> {
    let storage = AuthStorage::open(db_path).context("failed to open auth storage")?;
    storage
        .remove(provider)
        .context("failed to remove credentials")?;
    Ok(())
}

/// Read one non-empty key from `reader`.
pub fn read_api_key(reader: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("failed to read API key")?;
    let key = line.trim();
    if key.is_empty() {
        bail!("no API key provided");
    }
    Ok(key.to_string())
}

/// Ask for the key on the terminal.
pub fn prompt_api_key(provider: &str) -> Result<String> {
    print!("Enter your {provider} API key: ");
    io::stdout().flush()?;
    read_api_key(&mut io::stdin().lock())
}
