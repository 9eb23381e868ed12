//! `tracing` subscriber setup. Logs go to stderr so they never mix with
//! answers printed on stdout.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is unset: `-v` → info, `-vv` → debug.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "answerbook=warn",
        1 => "answerbook=info",
        _ => "answerbook=debug",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(default_directive(0), "answerbook=warn");
        assert_eq!(default_directive(1), "answerbook=info");
        assert_eq!(default_directive(2), "answerbook=debug");
        assert_eq!(default_directive(9), "answerbook=debug");
    }
}
