//! Key-value configuration storage backed by SQLite.
//!
//! Shares a database with [`AuthStorage`](crate::auth::AuthStorage); pass
//! the same path to both. Command-line flags override stored values, which
//! override built-in defaults.

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use crate::consts::DEFAULT_MODEL;
use crate::throttle::{MAX_BUFFER, MAX_REQUESTS_CAP, MAX_WINDOW, ThrottleConfig};

pub const KEY_MODEL: &str = "model";
pub const KEY_RPM: &str = "rpm";
pub const KEY_WINDOW: &str = "window_secs";
pub const KEY_BUFFER: &str = "buffer_secs";

/// Keys `answerbook config` accepts.
pub const KNOWN_KEYS: &[&str] = &[KEY_MODEL, KEY_RPM, KEY_WINDOW, KEY_BUFFER];

/// Persistent key-value configuration store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get a config value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Set a config value (upsert). Known numeric keys are validated first.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        validate(key, value)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Remove a config key.
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Get and parse a value. A stored value that does not parse is an error.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key)? {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| anyhow::anyhow!("invalid value for {key} ({raw:?}): {e}")),
            None => Ok(None),
        }
    }

    /// Model to use: flag, then stored, then default.
    pub fn resolve_model(&self, flag: Option<String>) -> Result<String> {
        if let Some(model) = flag {
            return Ok(model);
        }
        Ok(self
            .get(KEY_MODEL)?
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()))
    }

    /// Throttle limits: each field from its flag, then stored, then default.
    pub fn resolve_throttle(
        &self,
        rpm: Option<u32>,
        window_secs: Option<u64>,
        buffer_secs: Option<u64>,
    ) -> Result<ThrottleConfig> {
        let defaults = ThrottleConfig::default();
        let max_requests = match rpm {
            Some(v) => v,
            None => self.get_parsed(KEY_RPM)?.unwrap_or(defaults.max_requests),
        };
        let window = match window_secs {
            Some(v) => Some(v),
            None => self.get_parsed(KEY_WINDOW)?,
        }
        .map_or(defaults.window, Duration::from_secs);
        let buffer = match buffer_secs {
            Some(v) => Some(v),
            None => self.get_parsed(KEY_BUFFER)?,
        }
        .map_or(defaults.buffer, Duration::from_secs);
        Ok(ThrottleConfig {
            max_requests,
            window,
            buffer,
        })
    }
}

/// Reject unknown keys, malformed numbers and limits the throttler refuses.
fn validate(key: &str, value: &str) -> Result<()> {
    match key {
        KEY_MODEL => {
            if value.trim().is_empty() {
                bail!("model must not be empty");
            }
        }
        KEY_RPM => {
            let rpm: u32 = value
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a whole number"))?;
            if rpm == 0 {
                bail!("{key} must be at least 1");
            }
            if rpm > MAX_REQUESTS_CAP {
                bail!("{key} must be at most {MAX_REQUESTS_CAP}");
            }
        }
        KEY_WINDOW | KEY_BUFFER => {
            let secs = value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{key} must be a whole number of seconds"))?;
            if key == KEY_WINDOW && secs == 0 {
                bail!("{key} must be at least 1");
            }
            let max = if key == KEY_WINDOW { MAX_WINDOW } else { MAX_BUFFER };
            if secs > max.as_secs() {
                bail!("{key} must be at most {}", max.as_secs());
            }
        }
        _ => bail!(
            "unknown config key: {key} (known: {})",
            KNOWN_KEYS.join(", ")
        ),
    }
    Ok(())
}
