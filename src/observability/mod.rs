//! Observability infrastructure for crash reports, logging and debugging.
//!
//! - **Panic Hook**: structured crash reports naming the running stage
//! - **Context Tracking**: thread-local stage and input-file tracking
//! - **Logging**: `tracing-subscriber` setup that also captures `log` records
//!
//! ```ignore
//! use betaviz::observability::{install_panic_hook, set_phase, AnalysisPhase};
//!
//! install_panic_hook();
//! let _phase = set_phase(AnalysisPhase::Derive);
//! ```

pub mod context;
pub mod panic_hook;

pub use context::{
    get_current_context, reset_context, set_current_file, set_phase, AnalysisContext,
    AnalysisPhase, ContextGuard,
};
pub use panic_hook::install_panic_hook;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "BETAVIZ_LOG";

/// Map a `-v` count to a default filter directive.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialise logging once at startup.
///
/// `BETAVIZ_LOG` takes precedence over the verbosity flag. Calling this more
/// than once is harmless.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_levels() {
        assert_eq!(default_directive(0), "info");
        assert_eq!(default_directive(1), "debug");
        assert_eq!(default_directive(5), "trace");
    }
}
