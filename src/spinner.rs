//! Terminal stand-in for the "Processing..." overlay.

use std::io::Write;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Braille spinner frames.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const INTERVAL: Duration = Duration::from_millis(80);

/// Spins on stderr with an elapsed-time counter until stopped.
pub struct Spinner {
    handle: JoinHandle<()>,
    cancel: watch::Sender<bool>,
    started: Instant,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let (cancel, mut cancel_rx) = watch::channel(false);
        let message = message.to_string();
        let started = Instant::now();

        let handle = tokio::spawn(async move {
            for frame in FRAMES.iter().cycle() {
                let secs = started.elapsed().as_secs_f32();
                // \x1b[2K clears the line, \r returns to its start
                eprint!("\x1b[2K\r{frame} {message} {secs:.1}s");
                let _ = std::io::stderr().flush();

                tokio::select! {
                    _ = tokio::time::sleep(INTERVAL) => {}
                    _ = cancel_rx.changed() => break,
                }
            }
            eprint!("\x1b[2K\r");
            let _ = std::io::stderr().flush();
        });

        Self {
            handle,
            cancel,
            started,
        }
    }

    /// Stop, clear the line, and report how long it ran.
    pub async fn stop(self) -> Duration {
        let _ = self.cancel.send(true);
        let _ = self.handle.await;
        self.started.elapsed()
    }
}
