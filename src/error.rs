//! # Status Codes and Error Types
//!
//! Every failure in the driver is reported two ways: as a typed error returned
//! through `Result`, and as a small integer [`StatusCode`] recorded on the object
//! that failed (the accelerator context or the command being executed). Callers
//! that follow the status-gate pattern inspect the code; everything else uses `?`.
//!
//! ## Categories
//!
//! - **Initialization** (`HwError::TxOpen`, `RxOpen`, `Alloc`): fatal to the session
//! - **Geometry/bounds** (`WidthTooLarge`, `HeightTooLarge`, `BufferTooSmall`):
//!   per-request, the request is abandoned
//! - **Transfer** (`TxStart`, `RxStart`, `Timeout`): per-request, the channels are
//!   stopped and the session continues
//!
//! Verification mismatches are data and never appear here.
//!
//! ## Usage
//!
//! ```rust
//! use hybrid_scaler::error::{HasSeverity, HwError, Recoverable, StatusCode};
//!
//! let error = HwError::WidthTooLarge { width: 1025, limit: 1024 };
//! assert_eq!(error.status(), StatusCode::WIDTH_TOO_LARGE);
//! assert_eq!(error.status().message(), "Width too large");
//! assert!(error.is_recoverable());
//! ```

use std::{error::Error as StdError, fmt, path::PathBuf};

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Errors that abandon the current request but leave the session usable
    Error,
    /// Fatal errors that end the session
    Fatal,
}

/// Numeric status as stored on the accelerator context.
///
/// The numbering is part of the diagnostic interface: scripts driving the
/// firmware console match on these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusCode(pub u8);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(0);
    pub const TX_OPEN_FAILED: StatusCode = StatusCode(1);
    pub const RX_OPEN_FAILED: StatusCode = StatusCode(2);
    pub const ALLOC_FAILED: StatusCode = StatusCode(3);
    pub const TX_START_FAILED: StatusCode = StatusCode(4);
    pub const RX_START_FAILED: StatusCode = StatusCode(5);
    pub const WIDTH_TOO_LARGE: StatusCode = StatusCode(6);
    pub const HEIGHT_TOO_LARGE: StatusCode = StatusCode(7);
    pub const TRANSFER_TIMEOUT: StatusCode = StatusCode(8);
    pub const NOT_INITIALIZED: StatusCode = StatusCode(9);
    pub const BUFFER_TOO_SMALL: StatusCode = StatusCode(10);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    /// Fixed diagnostic message for this code.
    pub fn message(self) -> &'static str {
        match self.0 {
            0 => "No error",
            1 => "Failed to open tx SGDMA",
            2 => "Failed to open rx SGDMA",
            3 => "Failed to allocate descriptors",
            4 => "Failed to start tx transfer",
            5 => "Failed to start rx transfer",
            6 => "Width too large",
            7 => "Height too large",
            8 => "Transfer timed out",
            9 => "Accelerator not initialized",
            10 => "Buffer too small",
            _ => "Unknown error",
        }
    }

    /// Statuses after which the session cannot continue.
    pub fn is_fatal(self) -> bool {
        matches!(self.0, 1..=3 | 9)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status {})", self.message(), self.0)
    }
}

/// Accelerator driver errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HwError {
    /// The transmit (memory → stream) channel could not be opened
    TxOpen { channel: String },
    /// The receive (stream → memory) channel could not be opened
    RxOpen { channel: String },
    /// The descriptor pool could not be allocated
    Alloc { descriptors: usize },
    /// The transmit transfer refused to start
    TxStart { reason: String },
    /// The receive transfer refused to start
    RxStart { reason: String },
    /// Rectangle wider than the accelerator line buffer
    WidthTooLarge { width: u32, limit: u32 },
    /// Rectangle taller than the accelerator line buffer
    HeightTooLarge { height: u32, limit: u32 },
    /// Both completions did not arrive within the configured bound
    Timeout { waited_ms: u64 },
    /// The context was never initialized or has been cleaned up
    NotInitialized,
    /// A source, destination or descriptor region is smaller than the request needs
    BufferTooSmall {
        buffer: &'static str,
        needed: usize,
        actual: usize,
    },
}

impl HwError {
    /// Status code recorded on the context for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::TxOpen { .. } => StatusCode::TX_OPEN_FAILED,
            Self::RxOpen { .. } => StatusCode::RX_OPEN_FAILED,
            Self::Alloc { .. } => StatusCode::ALLOC_FAILED,
            Self::TxStart { .. } => StatusCode::TX_START_FAILED,
            Self::RxStart { .. } => StatusCode::RX_START_FAILED,
            Self::WidthTooLarge { .. } => StatusCode::WIDTH_TOO_LARGE,
            Self::HeightTooLarge { .. } => StatusCode::HEIGHT_TOO_LARGE,
            Self::Timeout { .. } => StatusCode::TRANSFER_TIMEOUT,
            Self::NotInitialized => StatusCode::NOT_INITIALIZED,
            Self::BufferTooSmall { .. } => StatusCode::BUFFER_TOO_SMALL,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::TxOpen { .. } | Self::RxOpen { .. } | Self::Alloc { .. } | Self::NotInitialized => {
                "init"
            }
            Self::WidthTooLarge { .. } | Self::HeightTooLarge { .. } | Self::BufferTooSmall { .. } => {
                "geometry"
            }
            Self::TxStart { .. } | Self::RxStart { .. } | Self::Timeout { .. } => "transfer",
        }
    }
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HwError::TxOpen { channel } => write!(f, "Failed to open tx SGDMA '{}'", channel),
            HwError::RxOpen { channel } => write!(f, "Failed to open rx SGDMA '{}'", channel),
            HwError::Alloc { descriptors } => {
                write!(f, "Failed to allocate {} descriptors", descriptors)
            }
            HwError::TxStart { reason } => write!(f, "Failed to start tx transfer: {}", reason),
            HwError::RxStart { reason } => write!(f, "Failed to start rx transfer: {}", reason),
            HwError::WidthTooLarge { width, limit } => {
                write!(f, "Width too large ({} > {})", width, limit)
            }
            HwError::HeightTooLarge { height, limit } => {
                write!(f, "Height too large ({} > {})", height, limit)
            }
            HwError::Timeout { waited_ms } => {
                write!(f, "Transfer timed out after {}ms", waited_ms)
            }
            HwError::NotInitialized => write!(f, "Accelerator not initialized"),
            HwError::BufferTooSmall {
                buffer,
                needed,
                actual,
            } => write!(
                f,
                "Buffer too small: {} holds {} but {} are needed",
                buffer, actual, needed
            ),
        }
    }
}

impl StdError for HwError {}

/// Errors of the line-oriented command protocol (load, validate, save).
#[derive(Debug)]
pub enum CommandError {
    /// The input file could not be opened or mapped
    Open { path: PathBuf, source: std::io::Error },
    /// The file ended before the width field
    MissingWidth { path: PathBuf },
    /// The file ended before the height field
    MissingHeight { path: PathBuf },
    /// The header describes an image too large to address
    ImageTooLarge { width: u32, height: u32 },
    /// The file holds fewer samples than the header announces
    Truncated { path: PathBuf, expected: usize, actual: usize },
    InvalidXScale { value: i32 },
    InvalidYScale { value: i32 },
    InvalidStart { x: i64, y: i64 },
    InvalidEnd { x_end: i64, y_end: i64 },
    /// The output file could not be created
    Create { path: PathBuf, source: std::io::Error },
    /// Writing the width field failed
    WriteWidth { path: PathBuf, source: std::io::Error },
    /// Writing the height field failed
    WriteHeight { path: PathBuf, source: std::io::Error },
    /// Writing the sample data failed
    WriteData { path: PathBuf, source: std::io::Error },
    /// The command line could not be parsed
    Syntax { line: String, reason: String },
}

impl CommandError {
    /// Status code in the command protocol's numbering.
    pub fn status(&self) -> u8 {
        match self {
            Self::Open { .. } => 1,
            Self::MissingWidth { .. } => 2,
            Self::MissingHeight { .. } => 3,
            Self::ImageTooLarge { .. } => 4,
            Self::Truncated { .. } => 5,
            Self::InvalidXScale { .. } => 6,
            Self::InvalidYScale { .. } => 7,
            Self::InvalidStart { .. } => 8,
            Self::InvalidEnd { .. } => 9,
            Self::Create { .. } => 12,
            Self::WriteWidth { .. } => 13,
            Self::WriteHeight { .. } => 14,
            Self::WriteData { .. } => 15,
            Self::Syntax { .. } => 16,
        }
    }

    /// Fixed diagnostic message for a command status code.
    pub fn message_for(status: u8) -> &'static str {
        match status {
            0 => "No error",
            1..=5 => "Failed to load image",
            6 => "Invalid X scale factor",
            7 => "Invalid Y scale factor",
            8 => "Invalid picture start point",
            9 => "Invalid picture end point",
            10 | 11 => "Failed to allocate output buffers",
            12..=15 => "Failed to save image",
            _ => "Unknown error",
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = Self::message_for(self.status());
        match self {
            CommandError::Open { path, source } | CommandError::Create { path, source } => {
                write!(f, "{}: '{}': {}", summary, path.display(), source)
            }
            CommandError::MissingWidth { path } | CommandError::MissingHeight { path } => {
                write!(f, "{}: '{}' has a truncated header", summary, path.display())
            }
            CommandError::ImageTooLarge { width, height } => {
                write!(f, "{}: {}x{} is too large", summary, width, height)
            }
            CommandError::Truncated {
                path,
                expected,
                actual,
            } => write!(
                f,
                "{}: '{}' holds {} of {} samples",
                summary,
                path.display(),
                actual,
                expected
            ),
            CommandError::InvalidXScale { value } | CommandError::InvalidYScale { value } => {
                write!(f, "{}: {}", summary, value)
            }
            CommandError::InvalidStart { x, y } => write!(f, "{}: ({}, {})", summary, x, y),
            CommandError::InvalidEnd { x_end, y_end } => {
                write!(f, "{}: ({}, {})", summary, x_end, y_end)
            }
            CommandError::WriteWidth { path, source }
            | CommandError::WriteHeight { path, source }
            | CommandError::WriteData { path, source } => {
                write!(f, "{}: '{}': {}", summary, path.display(), source)
            }
            CommandError::Syntax { line, reason } => {
                write!(f, "Invalid command '{}': {}", line, reason)
            }
        }
    }
}

impl StdError for CommandError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Open { source, .. }
            | Self::Create { source, .. }
            | Self::WriteWidth { source, .. }
            | Self::WriteHeight { source, .. }
            | Self::WriteData { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for HwError {
    fn severity(&self) -> ErrorSeverity {
        if self.status().is_fatal() {
            ErrorSeverity::Fatal
        } else {
            ErrorSeverity::Error
        }
    }
}

impl HasSeverity for CommandError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }
}

/// Trait for errors after which the owning session can keep going
pub trait Recoverable {
    /// Check if this error can be recovered from
    fn is_recoverable(&self) -> bool;
}

impl<T: HasSeverity> Recoverable for T {
    fn is_recoverable(&self) -> bool {
        self.severity() < ErrorSeverity::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        assert_eq!(StatusCode::OK.message(), "No error");
        assert_eq!(StatusCode::TX_OPEN_FAILED.message(), "Failed to open tx SGDMA");
        assert_eq!(StatusCode::RX_OPEN_FAILED.message(), "Failed to open rx SGDMA");
        assert_eq!(StatusCode::ALLOC_FAILED.message(), "Failed to allocate descriptors");
        assert_eq!(StatusCode(200).message(), "Unknown error");
        assert!(StatusCode::OK.is_ok());
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            HwError::TxOpen { channel: "a".into() },
            HwError::RxOpen { channel: "b".into() },
            HwError::Alloc { descriptors: 1 },
            HwError::TxStart { reason: String::new() },
            HwError::RxStart { reason: String::new() },
            HwError::WidthTooLarge { width: 2, limit: 1 },
            HwError::HeightTooLarge { height: 2, limit: 1 },
            HwError::Timeout { waited_ms: 1 },
            HwError::NotInitialized,
            HwError::BufferTooSmall { buffer: "destination", needed: 2, actual: 1 },
        ];
        let mut codes: Vec<u8> = errors.iter().map(|e| e.status().0).collect();
        codes.dedup();
        assert_eq!(codes, (1..=10).collect::<Vec<u8>>());
    }

    #[test]
    fn test_error_classification() {
        let fatal = HwError::Alloc { descriptors: 10 };
        assert_eq!(fatal.severity(), ErrorSeverity::Fatal);
        assert!(!fatal.is_recoverable());
        assert_eq!(fatal.category(), "init");

        let start = HwError::RxStart { reason: "busy".into() };
        assert_eq!(start.severity(), ErrorSeverity::Error);
        assert!(start.is_recoverable());
        assert_eq!(start.category(), "transfer");

        let command = CommandError::InvalidXScale { value: 5 };
        assert_eq!(command.severity(), ErrorSeverity::Error);
        assert!(command.is_recoverable());
        assert!(ErrorSeverity::Error < ErrorSeverity::Fatal);
    }

    #[test]
    fn test_severity_follows_status() {
        for error in [
            HwError::TxOpen { channel: "a".into() },
            HwError::Alloc { descriptors: 1 },
            HwError::NotInitialized,
            HwError::WidthTooLarge { width: 2, limit: 1 },
            HwError::Timeout { waited_ms: 1 },
            HwError::BufferTooSmall { buffer: "destination", needed: 2, actual: 1 },
        ] {
            let expected = if error.status().is_fatal() {
                ErrorSeverity::Fatal
            } else {
                ErrorSeverity::Error
            };
            assert_eq!(error.severity(), expected, "{}", error);
            assert_eq!(error.is_recoverable(), !error.status().is_fatal(), "{}", error);
        }
    }

    #[test]
    fn test_command_status_table() {
        let err = CommandError::InvalidXScale { value: 5 };
        assert_eq!(err.status(), 6);
        assert_eq!(err.to_string(), "Invalid X scale factor: 5");
        assert_eq!(CommandError::message_for(3), "Failed to load image");
        assert_eq!(CommandError::message_for(11), "Failed to allocate output buffers");
        assert_eq!(CommandError::message_for(14), "Failed to save image");
        assert_eq!(CommandError::message_for(99), "Unknown error");
    }
}
