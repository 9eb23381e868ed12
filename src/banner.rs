//! Startup banner and run summary display.

use std::path::Path;

use crate::answerer::TokenUsage;
use crate::consts::{AUTHOR, HOMEPAGE, REPO, format_number};
use crate::throttle::ThrottleConfig;

/// Run configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub model: &'a str,
    pub auth_status: &'a str,
    pub throttle: &'a ThrottleConfig,
    pub questions: usize,
    pub input: &'a Path,
    pub output: &'a Path,
}

/// `"15 req / 60s (+5s buffer)"`.
pub fn describe_throttle(throttle: &ThrottleConfig) -> String {
    format!(
        "{} req / {}s (+{}s buffer)",
        throttle.max_requests,
        throttle.window.as_secs(),
        throttle.buffer.as_secs()
    )
}

/// Print the startup banner with run info.
pub fn print_banner(info: &BannerInfo) {
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║         A N S W E R B O O K           ║
   ║    questions in, a document out       ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   home      {}
   repo      {}
   model     {}
   auth      {}
   limit     {}
   input     {} ({} questions)
   output    {}
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        HOMEPAGE,
        REPO,
        info.model,
        info.auth_status,
        describe_throttle(info.throttle),
        info.input.display(),
        info.questions,
        info.output.display(),
    );
}

/// One-line summary of a finished batch.
pub fn summary_line(answered: usize, failed: usize, usage: TokenUsage) -> String {
    let mut line = format!("answered {answered}, failed {failed}");
    if usage.total() > 0 {
        line.push_str(&format!(
            "; {} input + {} output = {} tokens",
            format_number(usage.input_tokens),
            format_number(usage.output_tokens),
            format_number(usage.total()),
        ));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn print_banner_does_not_panic() {
        let throttle = ThrottleConfig::default();
        let info = BannerInfo {
            model: "gemini-2.0-flash",
            auth_status: "API key ✓",
            throttle: &throttle,
            questions: 3,
            input: &PathBuf::from("questions.txt"),
            output: &PathBuf::from("answers.pdf"),
        };
        print_banner(&info);
    }

    #[test]
    fn describe_default_throttle() {
        assert_eq!(
            describe_throttle(&ThrottleConfig::default()),
            "15 req / 60s (+5s buffer)"
        );
    }

    #[test]
    fn summary_without_tokens() {
        assert_eq!(
            summary_line(2, 1, TokenUsage::default()),
            "answered 2, failed 1"
        );
    }

    #[test]
    fn summary_with_tokens() {
        let usage = TokenUsage {
            input_tokens: 1234,
            output_tokens: 567,
        };
        assert_eq!(
            summary_line(3, 0, usage),
            "answered 3, failed 0; 1,234 input + 567 output = 1,801 tokens"
        );
    }
}
