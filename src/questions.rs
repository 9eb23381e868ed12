//! Reading the questions file: one question per non-empty line.

use std::path::Path;

use anyhow::{Context, Result, bail};

/// Split `text` into trimmed, non-empty lines, preserving order.
pub fn parse_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read and parse a UTF-8 questions file.
pub fn read_questions(path: &Path) -> Result<Vec<String>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = String::from_utf8(bytes)
        .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
    let questions = parse_questions(&text);
    if questions.is_empty() {
        bail!("no questions found in {}", path.display());
    }
    Ok(questions)
}
