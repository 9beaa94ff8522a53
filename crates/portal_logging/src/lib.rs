#![deny(missing_docs)]
//! Shared logging utilities for the portal workspace.
//!
//! This crate provides the `portal_*` logging macros used across the codebase,
//! a helper for logging credentials without leaking them, and a minimal test
//! initializer for the global logger.

/// Number of characters of a credential that may appear in a log line.
pub const TOKEN_PREVIEW_CHARS: usize = 8;

/// Returns a short, log-safe preview of a token or secret.
///
/// Only the first [`TOKEN_PREVIEW_CHARS`] characters are kept; anything longer
/// is elided. An empty token renders as `<empty>`.
pub fn token_preview(token: &str) -> String {
    if token.is_empty() {
        return "<empty>".to_string();
    }
    let mut preview: String = token.chars().take(TOKEN_PREVIEW_CHARS).collect();
    if token.chars().count() > TOKEN_PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! portal_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! portal_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! portal_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! portal_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! portal_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::token_preview;

    #[test]
    fn preview_truncates_long_tokens() {
        assert_eq!(token_preview("0123456789abcdef"), "01234567...");
    }

    #[test]
    fn preview_keeps_short_tokens_and_marks_empty() {
        assert_eq!(token_preview("abc"), "abc");
        assert_eq!(token_preview(""), "<empty>");
    }
}
