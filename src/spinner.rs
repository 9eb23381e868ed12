//! A minimal terminal spinner whose message can change while it spins.

use std::io::Write;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Braille spinner frames.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Frame interval.
const INTERVAL: Duration = Duration::from_millis(80);

/// A terminal spinner that runs in a background task.
///
/// Call [`Spinner::start`] to begin, [`Spinner::set_message`] to relabel it
/// (e.g. for a throttle countdown), then [`Spinner::stop`] when done.
/// The spinner writes to stderr so it doesn't interfere with stdout output.
pub struct Spinner {
    handle: JoinHandle<()>,
    /// `None` tells the task to clear the line and exit.
    message: watch::Sender<Option<String>>,
}

impl Spinner {
    /// Start a spinner with the given message (e.g. `"answering"`).
    pub fn start(message: &str) -> Self {
        let (tx, mut rx) = watch::channel(Some(message.to_string()));

        let handle = tokio::spawn(async move {
            let mut i = 0;
            loop {
                let current = rx.borrow_and_update().clone();
                let Some(message) = current else {
                    break;
                };
                let frame = FRAMES[i % FRAMES.len()];
                // \r moves to start of line, \x1b[2K clears the line
                eprint!("\x1b[2K\r{frame} {message}");
                let _ = std::io::stderr().flush();

                tokio::select! {
                    _ = tokio::time::sleep(INTERVAL) => {}
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                i += 1;
            }
            eprint!("\x1b[2K\r");
            let _ = std::io::stderr().flush();
        });

        Self {
            handle,
            message: tx,
        }
    }

    /// Replace the text shown next to the spinner.
    pub fn set_message(&self, message: &str) {
        let _ = self.message.send(Some(message.to_string()));
    }

    /// Stop the spinner and clear its line.
    pub async fn stop(self) {
        let _ = self.message.send(None);
        let _ = self.handle.await;
    }
}
