//! External conversion: markdown → DOCX with `pandoc`, DOCX → PDF with
//! LibreOffice in headless mode.

use anyhow::{Context, Result, bail};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use super::OutputFormat;

/// Maximum stderr kept in an error message.
const MAX_STDERR_BYTES: usize = 4_000;

const PANDOC: &[&str] = &["pandoc"];
const LIBREOFFICE: &[&str] = &["libreoffice", "soffice"];

/// Find the first of `candidates` on `PATH`. Absolute paths are taken as-is
/// if they point at an executable.
pub fn locate<S: AsRef<str>>(candidates: &[S]) -> Result<PathBuf> {
    for name in candidates {
        if let Ok(path) = which::which(name.as_ref()) {
            return Ok(path);
        }
    }
    bail!(
        "{} is not installed or not in PATH",
        candidates.first().map_or("tool", |c| c.as_ref())
    )
}

/// Runs the conversion pipeline inside a throwaway directory.
pub struct Converter {
    timeout: Duration,
    pandoc: Vec<String>,
    office: Vec<String>,
}

impl Converter {
    /// `timeout` bounds each external step separately.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pandoc: PANDOC.iter().map(|s| s.to_string()).collect(),
            office: LIBREOFFICE.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Override the names (or paths) tried for pandoc and LibreOffice.
    pub fn with_tools(mut self, pandoc: &[&str], office: &[&str]) -> Self {
        self.pandoc = pandoc.iter().map(|s| s.to_string()).collect();
        self.office = office.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Produce the document bytes for `markdown` in the requested format.
    pub async fn convert(&self, markdown: &str, format: OutputFormat) -> Result<Vec<u8>> {
        if format == OutputFormat::Markdown {
            return Ok(markdown.as_bytes().to_vec());
        }

        let work = tempfile::tempdir().context("failed to create work directory")?;
        let md_path = work.path().join("answers.md");
        tokio::fs::write(&md_path, markdown)
            .await
            .context("failed to write markdown")?;

        let docx_path = self.to_docx(&md_path).await?;
        let out_path = if format == OutputFormat::Pdf {
            self.to_pdf(&docx_path, work.path()).await?
        } else {
            docx_path
        };

        tokio::fs::read(&out_path)
            .await
            .with_context(|| format!("converter produced no {}", format.extension()))
    }

    async fn to_docx(&self, md_path: &Path) -> Result<PathBuf> {
        let pandoc = locate(self.pandoc.as_slice())?;
        let docx_path = md_path.with_extension("docx");
        self.run_tool(
            &pandoc,
            [md_path.as_os_str(), OsStr::new("-o"), docx_path.as_os_str()],
        )
        .await
        .context("pandoc conversion failed")?;
        Ok(docx_path)
    }

    async fn to_pdf(&self, docx_path: &Path, out_dir: &Path) -> Result<PathBuf> {
        let office = locate(self.office.as_slice())?;
        self.run_tool(
            &office,
            [
                OsStr::new("--headless"),
                OsStr::new("--convert-to"),
                OsStr::new("pdf"),
                docx_path.as_os_str(),
                OsStr::new("--outdir"),
                out_dir.as_os_str(),
            ],
        )
        .await
        .context("LibreOffice conversion failed")?;
        // --convert-to keeps the stem and swaps the extension inside --outdir.
        let stem = docx_path.file_stem().unwrap_or(OsStr::new("answers"));
        Ok(out_dir.join(stem).with_extension("pdf"))
    }

    /// Run `program` to completion, failing on timeout or non-zero exit.
    pub async fn run_tool<I, S>(&self, program: &Path, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let name = program
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("tool")
            .to_string();
        debug!(tool = %name, "running converter");

        let mut cmd = Command::new(program);
        cmd.args(args).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.with_context(|| format!("failed to start {name}"))?,
            Err(_) => bail!("{name} timed out after {:.1}s", self.timeout.as_secs_f64()),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{name} exited with code {}\nstderr: {}",
                output.status.code().unwrap_or(-1),
                truncate(stderr.trim(), MAX_STDERR_BYTES)
            );
        }

        info!(tool = %name, "conversion step finished");
        Ok(())
    }
}

fn truncate(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
