//! Terminal progress indicator for the scan phase.
//!
//! Cosmetic only: a background task redraws a single terminal line while the
//! scan runs. The terminal is owned by the indicator between `start` and the
//! completion of `stop`; callers must not write to it in that window.

use std::io::{self, Write};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const TICK: Duration = Duration::from_millis(100);
const DONE_MESSAGE: &str = "Done!";

/// Spinner rendered by a background tokio task.
pub struct ProgressIndicator;

impl ProgressIndicator {
    /// Spawns the rendering loop with the given waiting message.
    ///
    /// The loop overwrites one line every ~100 ms until the handle is
    /// stopped, then performs exactly one final overwrite wide enough to
    /// erase the longest prior line.
    pub fn start(message: &str) -> IndicatorHandle {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let message = message.to_string();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            let mut frame = 0usize;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let mut out = io::stdout();
                        let _ = write!(out, "\r{} {}", FRAMES[frame % FRAMES.len()], message);
                        let _ = out.flush();
                        frame += 1;
                    }
                    _ = cancel_rx.changed() => break,
                }
            }
            // One final overwrite, padded past "<frame> <message>".
            let width = message.len() + 2;
            let mut out = io::stdout();
            let _ = writeln!(out, "\r{DONE_MESSAGE:<width$}");
            let _ = out.flush();
        });

        IndicatorHandle {
            cancel: cancel_tx,
            task,
        }
    }
}

/// Handle owning the indicator task.
pub struct IndicatorHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl IndicatorHandle {
    /// Signals the rendering loop and waits until it has fully exited,
    /// relinquishing the terminal.
    pub async fn stop(self) {
        let _ = self.cancel.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_joins_rendering_loop() {
        let handle = ProgressIndicator::start("waiting for the scan to finish...");
        tokio::time::sleep(Duration::from_millis(250)).await;
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_immediate_stop_terminates() {
        let handle = ProgressIndicator::start("waiting...");
        // Stopping before the first tick must still join cleanly.
        tokio::time::timeout(Duration::from_secs(2), handle.stop())
            .await
            .expect("indicator failed to stop in time");
    }
}
