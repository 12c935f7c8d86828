//! Spinner shown while a question is in flight.

use std::{sync::Mutex, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

/// Minimal progress interface used by the chat loop.
pub trait Progress: Send + Sync {
    fn start(&self, _msg: &str) {}
    fn finish(&self) {}
}

/// Silent reporter for non-interactive output.
#[derive(Default, Clone, Copy)]
pub struct NoopProgress;
impl Progress for NoopProgress {}

/// Indicatif spinner on stderr; one bar per request.
#[derive(Default)]
pub struct Spinner {
    current: Mutex<Option<ProgressBar>>,
}

impl Progress for Spinner {
    fn start(&self, msg: &str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("-\\|/ "),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut slot) = self.current.lock() {
            if let Some(old) = slot.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn finish(&self) {
        if let Some(pb) = self.current.lock().ok().and_then(|mut s| s.take()) {
            pb.finish_and_clear();
        }
    }
}
