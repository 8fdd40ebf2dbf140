//! Progress feedback for long-running stages.
//!
//! Fitting can take hours and summarizing a large grid several seconds, so
//! both show an `indicatif` indicator on stderr.
//!
//! - **Quiet Mode**: no output when `BETAVIZ_QUIET` is set
//! - **Non-TTY**: indicators are hidden in CI and piped output

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const TEMPLATE_SPINNER: &str = "{spinner} {msg} [{elapsed_precise}]";
pub const TEMPLATE_SUMMARY: &str = "📊 {msg} {pos}/{len} rows ({percent}%) - {eta}";

/// Environment variable that silences progress output and stage lines.
pub const QUIET_ENV: &str = "BETAVIZ_QUIET";

/// Whether quiet mode was requested through the environment.
pub fn quiet_from_env() -> bool {
    std::env::var(QUIET_ENV)
        .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
        .unwrap_or(false)
}

/// Configuration for progress display behavior
#[derive(Debug, Clone, Default)]
pub struct ProgressConfig {
    pub quiet_mode: bool,
}

impl ProgressConfig {
    /// Combine the CLI flag with the environment.
    pub fn from_env(quiet: bool) -> Self {
        Self {
            quiet_mode: quiet || quiet_from_env(),
        }
    }

    /// Determine if progress indicators should be displayed
    pub fn should_show_progress(&self) -> bool {
        if self.quiet_mode {
            return false;
        }
        use std::io::IsTerminal;
        std::io::stderr().is_terminal()
    }

    /// Spinner for work of unknown length.
    pub fn spinner(&self, msg: &str) -> ProgressBar {
        if !self.should_show_progress() {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template(TEMPLATE_SPINNER)
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Bar counting grid rows.
    pub fn bar(&self, len: u64, msg: &str) -> ProgressBar {
        if !self.should_show_progress() {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(TEMPLATE_SUMMARY)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░  "),
        );
        pb.set_message(msg.to_string());
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_mode_hides_progress() {
        let config = ProgressConfig { quiet_mode: true };
        assert!(!config.should_show_progress());
        assert!(config.spinner("fitting").is_hidden());
        assert!(config.bar(10, "summarizing").is_hidden());
    }
}
