//! Terminal spinners for import steps

use colored::Colorize;
use cpstate_import::{ProgressReporter, ProgressStep};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TEMPLATE_SPINNER: &str = "{spinner:.cyan} {msg}";
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Renders every import step as a spinner line that settles into a
/// colored result. Updates replace the spinner text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinnerProgress;

struct SpinnerStep {
    bar: ProgressBar,
}

impl ProgressReporter for SpinnerProgress {
    fn start(&self, message: &str) -> Box<dyn ProgressStep> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template(TEMPLATE_SPINNER)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(TICK_INTERVAL);

        Box::new(SpinnerStep { bar })
    }
}

impl ProgressStep for SpinnerStep {
    fn update(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn success(&self, message: &str) {
        self.bar
            .finish_with_message(format!("{} {}", "✓".bright_green(), message));
    }

    fn fail(&self, message: &str) {
        self.bar
            .abandon_with_message(format!("{} {}", "✗".bright_red(), message.bright_red()));
    }
}

impl Drop for SpinnerStep {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
