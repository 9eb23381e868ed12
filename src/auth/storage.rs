use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Credential types stored per provider.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum Credential {
    #[serde(rename = "api_key")]
    ApiKey { key: String },
}

/// Where a resolved API key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Stored,
    Env(String),
}

/// An API key plus its origin, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub key: String,
    pub source: KeySource,
}

/// Manages credential storage in SQLite.
///
/// Shares a database with [`Config`](crate::config::Config); pass the same
/// path to both.
pub struct AuthStorage {
    conn: Mutex<Connection>,
}

impl AuthStorage {
    /// Open or create a credentials table in the given database path.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open credentials database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS credentials (
                provider TEXT PRIMARY KEY,
                data     TEXT NOT NULL
            )",
        )
        .context("failed to create credentials table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get credential for a provider.
    pub fn get(&self, provider: &str) -> Result<Option<Credential>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT data FROM credentials WHERE provider = ?1")?;
        let mut rows = stmt.query([provider])?;
        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                let cred: Credential = serde_json::from_str(&json)
                    .with_context(|| format!("corrupt credential for {provider}"))?;
                Ok(Some(cred))
            }
            None => Ok(None),
        }
    }

    /// Store credential for a provider (upsert).
    pub fn set(&self, provider: &str, credential: Credential) -> Result<()> {
        let json = serde_json::to_string(&credential)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO credentials (provider, data) VALUES (?1, ?2)
             ON CONFLICT(provider) DO UPDATE SET data = excluded.data",
            [provider, &json],
        )?;
        Ok(())
    }

    /// Remove credential for a provider.
    pub fn remove(&self, provider: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM credentials WHERE provider = ?1", [provider])?;
        Ok(())
    }

    /// Get the API key for a provider.
    /// Priority: stored key → each of `env_vars` in order. Empty values are skipped.
    pub fn get_api_key(&self, provider: &str, env_vars: &[&str]) -> Result<Option<ResolvedKey>> {
        if let Some(Credential::ApiKey { key }) = self.get(provider)?
            && !key.is_empty()
        {
            return Ok(Some(ResolvedKey {
                key,
                source: KeySource::Stored,
            }));
        }

        for var in env_vars {
            if let Ok(key) = std::env::var(var)
                && !key.is_empty()
            {
                return Ok(Some(ResolvedKey {
                    key,
                    source: KeySource::Env(var.to_string()),
                }));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_json_shape() {
        let json = serde_json::to_string(&Credential::ApiKey {
            key: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"api_key","key":"abc"}"#);
    }

    #[test]
    fn in_memory_roundtrip() {
        let storage = AuthStorage::open(":memory:").unwrap();
        storage
            .set(
                "gemini",
                Credential::ApiKey {
                    key: "k".to_string(),
                },
            )
            .unwrap();
        assert_eq!(
            storage.get("gemini").unwrap(),
            Some(Credential::ApiKey {
                key: "k".to_string()
            })
        );
    }
}
