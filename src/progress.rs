//! Terminal rendering of batch [`Event`]s.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::events::Event;
use crate::spinner::Spinner;

const ANSWERING: &str = "answering...";
const DIVIDER: &str = "────────────────────────────────────────";

/// Text for the spinner while the throttler counts down.
pub fn throttle_message(remaining_secs: u64) -> String {
    format!("rate limit reached, waiting {remaining_secs}s...")
}

/// Lines to print once a question is finished, or `None` for events that
/// only drive the spinner.
pub fn finished_lines(event: &Event) -> Option<String> {
    match event {
        Event::Answered { answer, .. } => Some(format!("{answer}\n{DIVIDER}")),
        Event::AnswerFailed { index, error } => {
            Some(format!("✗ failed to get answer for Q{index}: {error}\n{DIVIDER}"))
        }
        _ => None,
    }
}

/// Print progress until the bus closes. Answers go to stdout, spinner to stderr.
pub fn spawn(mut rx: broadcast::Receiver<Event>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut spinner: Option<Spinner> = None;
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };

            match &event {
                Event::QuestionStarted { index, question } => {
                    println!("\nQ{index}: {question}");
                    spinner = Some(Spinner::start(ANSWERING));
                }
                Event::Throttled { remaining_secs } => {
                    if let Some(s) = &spinner {
                        s.set_message(&throttle_message(*remaining_secs));
                    }
                }
                Event::ThrottleCleared => {
                    if let Some(s) = &spinner {
                        s.set_message(ANSWERING);
                    }
                }
                Event::Answered { .. } | Event::AnswerFailed { .. } => {
                    if let Some(s) = spinner.take() {
                        s.stop().await;
                    }
                    if let Some(lines) = finished_lines(&event) {
                        println!("{lines}");
                    }
                }
            }
        }
        if let Some(s) = spinner.take() {
            s.stop().await;
        }
    })
}
