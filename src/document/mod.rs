//! Turning answered questions into a document.
//!
//! [`render_markdown`] builds the markdown source; [`convert::Converter`]
//! hands it to external tools for DOCX and PDF output; [`write_document`]
//! does both and only touches the output path once conversion succeeded.

pub mod convert;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use tracing::info;

use crate::batch::QaPair;
use crate::consts::DEFAULT_OUTPUT;
use convert::Converter;

/// Table styling prepended to every document.
const STYLE: &str = "<style>\n\
table { width: 100%; border-collapse: collapse; }\n\
th, td { padding: 8px 12px; border: 1px solid #ccc; }\n\
</style>\n\n";

/// Kind of file to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Docx,
    Pdf,
}

impl OutputFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("md" | "markdown") => Ok(Self::Markdown),
            Some("docx") => Ok(Self::Docx),
            Some("pdf") => Ok(Self::Pdf),
            _ => bail!(
                "cannot infer output format from {}; use --format",
                path.display()
            ),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Docx => "docx",
            Self::Pdf => "pdf",
        }
    }
}

/// Settle the output path and format from whichever of the two was given.
/// An explicit format with no path names the file `answers.<ext>`.
pub fn resolve_output(
    output: Option<PathBuf>,
    format: Option<OutputFormat>,
) -> Result<(PathBuf, OutputFormat)> {
    match (output, format) {
        (Some(path), Some(format)) => Ok((path, format)),
        (Some(path), None) => {
            let format = OutputFormat::from_path(&path)?;
            Ok((path, format))
        }
        (None, Some(format)) => Ok((
            PathBuf::from(DEFAULT_OUTPUT).with_extension(format.extension()),
            format,
        )),
        (None, None) => {
            let path = PathBuf::from(DEFAULT_OUTPUT);
            let format = OutputFormat::from_path(&path)?;
            Ok((path, format))
        }
    }
}

/// Markdown for the whole document: one `## Qn:` section per pair,
/// separated by horizontal rules. Pure; the same pairs always give the
/// same text.
pub fn render_markdown(pairs: &[QaPair]) -> String {
    let mut md = String::from(STYLE);
    for (i, pair) in pairs.iter().enumerate() {
        md.push_str(&format!(
            "## Q{}: {}\n\n{}\n\n---\n\n",
            i + 1,
            pair.question,
            pair.answer.rendered().trim()
        ));
    }
    md
}

/// Render `pairs`, convert to `format` and write the result to `output`.
/// A failed conversion leaves `output` untouched.
pub async fn write_document(
    pairs: &[QaPair],
    format: OutputFormat,
    output: &Path,
    converter: &Converter,
) -> Result<()> {
    let markdown = render_markdown(pairs);
    let bytes = converter
        .convert(&markdown, format)
        .await
        .context("failed to generate document")?;
    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(path = %output.display(), bytes = bytes.len(), "document written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Answer;
    use crate::consts::ERROR_PLACEHOLDER;
    use std::time::Duration;

    fn converter() -> Converter {
        Converter::new(Duration::from_secs(5))
    }

    fn answered() -> Vec<QaPair> {
        vec![pair("What is Rust?", Answer::Text("A language.".into()))]
    }

    /// Write an executable shell script into `dir`.
    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn pair(question: &str, answer: Answer) -> QaPair {
        QaPair {
            question: question.to_string(),
            answer,
        }
    }

    #[test]
    fn empty_pairs_is_just_style() {
        assert_eq!(render_markdown(&[]), STYLE);
    }

    #[test]
    fn sections_are_numbered_and_divided() {
        let md = render_markdown(&[
            pair("What is Rust?", Answer::Text("A language.".into())),
            pair("Why?", Answer::Text("\n  Speed.  \n".into())),
        ]);

        let body = md.strip_prefix(STYLE).unwrap();
        assert_eq!(
            body,
            "## Q1: What is Rust?\n\nA language.\n\n---\n\n\
             ## Q2: Why?\n\nSpeed.\n\n---\n\n"
        );
    }

    #[test]
    fn failures_render_placeholder() {
        let md = render_markdown(&[pair("Broken?", Answer::Failed("timeout".into()))]);
        assert!(md.contains(ERROR_PLACEHOLDER));
        assert!(!md.contains("timeout"));
    }

    #[test]
    fn format_from_extension() {
        let cases = [
            ("out.pdf", OutputFormat::Pdf),
            ("out.PDF", OutputFormat::Pdf),
            ("out.docx", OutputFormat::Docx),
            ("notes.md", OutputFormat::Markdown),
            ("notes.markdown", OutputFormat::Markdown),
        ];
        for (path, expected) in cases {
            assert_eq!(OutputFormat::from_path(&PathBuf::from(path)).unwrap(), expected);
        }
    }

    #[test]
    fn resolve_output_defaults_to_pdf() {
        let (path, format) = resolve_output(None, None).unwrap();
        assert_eq!(path, PathBuf::from("answers.pdf"));
        assert_eq!(format, OutputFormat::Pdf);
    }

    #[test]
    fn resolve_output_names_file_after_format() {
        let (path, format) = resolve_output(None, Some(OutputFormat::Docx)).unwrap();
        assert_eq!(path, PathBuf::from("answers.docx"));
        assert_eq!(format, OutputFormat::Docx);
    }

    #[test]
    fn resolve_output_explicit_format_wins() {
        let (path, format) =
            resolve_output(Some(PathBuf::from("out.txt")), Some(OutputFormat::Markdown)).unwrap();
        assert_eq!(path, PathBuf::from("out.txt"));
        assert_eq!(format, OutputFormat::Markdown);
    }

    #[test]
    fn resolve_output_infers_from_path() {
        let (_, format) = resolve_output(Some(PathBuf::from("a/b/notes.md")), None).unwrap();
        assert_eq!(format, OutputFormat::Markdown);
        assert!(resolve_output(Some(PathBuf::from("notes.txt")), None).is_err());
    }

    #[test]
    fn unknown_extension_fails() {
        assert!(OutputFormat::from_path(&PathBuf::from("out.html")).is_err());
        assert!(OutputFormat::from_path(&PathBuf::from("answers")).is_err());
    }

    #[tokio::test]
    async fn write_markdown_document() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("answers.md");

        write_document(&answered(), OutputFormat::Markdown, &output, &converter())
            .await
            .unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, render_markdown(&answered()));
    }

    #[tokio::test]
    async fn missing_converter_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let converter = converter().with_tools(
            &["answerbook-no-such-pandoc"],
            &["answerbook-no-such-office"],
        );

        for format in [OutputFormat::Docx, OutputFormat::Pdf] {
            let output = dir.path().join(format!("answers.{}", format.extension()));
            let err = write_document(&answered(), format, &output, &converter)
                .await
                .unwrap_err();
            assert!(err.to_string().contains("failed to generate document"));
            assert!(!output.exists());
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_conversion_step_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let pandoc = script(dir.path(), "pandoc", "echo broken >&2; exit 1");
        let output = dir.path().join("answers.docx");

        let converter = converter().with_tools(&[pandoc.as_str()], &["answerbook-no-such-office"]);
        let err = write_document(&answered(), OutputFormat::Docx, &output, &converter)
            .await
            .unwrap_err();

        let msg = format!("{err:#}");
        assert!(msg.contains("exited with code 1"));
        assert!(msg.contains("broken"));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_pdf_step_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let pandoc = script(dir.path(), "pandoc", r#"cp "$1" "$3""#);
        let office = script(dir.path(), "soffice", "exit 2");
        let output = dir.path().join("answers.pdf");

        let converter = converter().with_tools(&[pandoc.as_str()], &[office.as_str()]);
        let err = write_document(&answered(), OutputFormat::Pdf, &output, &converter)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("LibreOffice conversion failed"));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn docx_goes_through_pandoc_only() {
        let dir = tempfile::tempdir().unwrap();
        // Fails loudly if pandoc is not called as `<md> -o <docx>`.
        let pandoc = script(
            dir.path(),
            "pandoc",
            r#"[ "$2" = "-o" ] && [ "${3##*.}" = "docx" ] || exit 9
cp "$1" "$3""#,
        );
        let output = dir.path().join("answers.docx");

        let converter = converter().with_tools(&[pandoc.as_str()], &["answerbook-no-such-office"]);
        write_document(&answered(), OutputFormat::Docx, &output, &converter)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, render_markdown(&answered()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pdf_is_read_from_office_outdir() {
        let dir = tempfile::tempdir().unwrap();
        let pandoc = script(dir.path(), "pandoc", r#"cp "$1" "$3""#);
        // Mimics `soffice --headless --convert-to pdf <docx> --outdir <dir>`.
        let office = script(
            dir.path(),
            "soffice",
            r#"[ "$1" = "--headless" ] && [ "$3" = "pdf" ] && [ "$5" = "--outdir" ] || exit 9
cp "$4" "$6/$(basename "$4" .docx).pdf""#,
        );
        let output = dir.path().join("answers.pdf");

        let converter = converter().with_tools(&[pandoc.as_str()], &[office.as_str()]);
        write_document(&answered(), OutputFormat::Pdf, &output, &converter)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, render_markdown(&answered()));
    }
}
