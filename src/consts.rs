//! Project-wide constants.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Default Gemini model when none is specified.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Provider name used as the credential key.
pub const PROVIDER: &str = "gemini";

/// Environment variables checked for an API key, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Free-tier quota: requests allowed per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 15;

/// Length of the rolling rate-limit window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Extra wait added on top of the computed throttle delay.
pub const DEFAULT_BUFFER: Duration = Duration::from_secs(5);

/// Text recorded in place of an answer the upstream failed to produce.
pub const ERROR_PLACEHOLDER: &str = "*Error fetching answer.*";

/// Default output file.
pub const DEFAULT_OUTPUT: &str = "answers.pdf";

/// Default database path: `~/.answerbook/answerbook.db`.
/// Single DB for credentials and config.
pub fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".answerbook").join("answerbook.db"))
}

/// Format a number with comma separators (e.g. 1,234,567).
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}
