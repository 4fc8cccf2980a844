//! Verbose progress output using indicatif.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::Mutex;
use tapdrive::model::{GestureEvent, Phase};
use tapdrive::runner::RunObserver;

/// Observer that shows a spinner through the timed waits and echoes every
/// event line as it is written, on stderr so stdout stays machine-readable.
pub struct VerboseProgress {
    spinner: Mutex<Option<ProgressBar>>,
    total_events: usize,
}

impl VerboseProgress {
    /// Create a progress observer for a script of `total_events` lines.
    pub fn new(total_events: usize) -> Self {
        Self {
            spinner: Mutex::new(None),
            total_events,
        }
    }

    fn finish_spinner(&self) {
        if let Ok(mut spinner) = self.spinner.lock() {
            if let Some(pb) = spinner.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn start_spinner(&self, message: String) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        if let Ok(mut spinner) = self.spinner.lock() {
            *spinner = Some(pb);
        }
    }
}

impl RunObserver for VerboseProgress {
    fn on_phase(&self, phase: Phase) {
        self.finish_spinner();
        match phase {
            Phase::Warming => self.start_spinner("warming up".to_string()),
            Phase::Scripting => {
                let _ = writeln!(
                    std::io::stderr(),
                    "--- sequence ({} events) ---",
                    self.total_events
                );
            }
            Phase::Settling => self.start_spinner("settling".to_string()),
            Phase::Terminating => self.start_spinner("terminating".to_string()),
            Phase::Joined => {
                let _ = writeln!(std::io::stderr(), "joined");
            }
            Phase::Idle | Phase::Launching => {}
        }
    }

    fn on_event_sent(&self, _event: &GestureEvent, line: &str) {
        let _ = writeln!(std::io::stderr(), "sending: {line}");
    }
}
