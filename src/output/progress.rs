use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright_green, bright_red, bright_yellow};

/// Spinner shown on stderr while Jenkins is polled
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
            pb.set_style(style);
        }
        pb.set_message(bright_yellow(message).to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self { pb }
    }

    pub fn finish(self, message: &str) {
        self.pb
            .finish_with_message(bright_green(format!("{message} ✓")).to_string());
    }

    pub fn fail(self, message: &str) {
        self.pb
            .abandon_with_message(bright_red(format!("{message} ✗")).to_string());
    }
}
