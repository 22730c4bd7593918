//! Progress indicators with CI fallback

use super::context::UiContext;
use super::output;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    ctx: UiContext,
    bar: Option<ProgressBar>,
}

impl TaskSpinner {
    /// Create a new spinner (nothing is shown until `start`)
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            ctx: ctx.clone(),
            bar: None,
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.ctx.use_fancy_output() {
            let bar = ProgressBar::new_spinner();
            if let Ok(spinner_style) = ProgressStyle::default_spinner()
                .template("       {spinner:.cyan} {msg}  {elapsed:.dim}")
            {
                bar.set_style(spinner_style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            bar.set_message(message.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            self.bar = Some(bar);
        } else {
            output::detail(&self.ctx, message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
            output::detail(&self.ctx, message);
        }
        // Plain mode already printed the start message
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        output::warning(&self.ctx, message);
    }
}

impl Drop for TaskSpinner {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
