//! Error types for screen construction

use thiserror::Error;

/// Errors raised when configuring a screen. After construction, writes
/// never fail; malformed input is handled inside the emulator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScreenError {
    /// The window must be at least one line tall.
    #[error("window height must be at least 1 line")]
    ZeroWindowHeight,

    /// The initial window height exceeds the scrollback cap.
    #[error("window height {lines} exceeds maximum of {max_lines} lines")]
    WindowTooTall { lines: usize, max_lines: usize },

    /// The window width exceeds (or is unbounded despite) the column cap.
    #[error("window width {cols} exceeds maximum of {max_cols} columns")]
    WindowTooWide { cols: usize, max_cols: usize },
}
