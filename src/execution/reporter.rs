//! Progress reporting while a step runs

use crate::core::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// How step progress is shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgressMode {
    #[default]
    Hidden,
    Spinner,
}

impl ProgressMode {
    /// Spinner when stderr is a terminal
    pub fn detect() -> Self {
        if console::Term::stderr().is_term() {
            ProgressMode::Spinner
        } else {
            ProgressMode::Hidden
        }
    }
}

/// Spinner scoped to one step
///
/// Dropping it clears the line, so progress output ends whether the step
/// succeeded, failed or panicked.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start(mode: ProgressMode, message: &str) -> Self {
        let bar = match mode {
            ProgressMode::Hidden => ProgressBar::hidden(),
            ProgressMode::Spinner => {
                let bar = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                    bar.set_style(style);
                }
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
        };
        bar.set_message(message.to_string());
        Self { bar }
    }

    pub fn message(&self) -> String {
        self.bar.message()
    }
}

impl ProgressSink for Spinner {
    fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn suspend(&self, f: &mut dyn FnMut()) {
        self.bar.suspend(|| f());
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}
