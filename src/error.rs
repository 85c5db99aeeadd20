//! Errors raised while reading a BMT capture.

use thiserror::Error;

/// Coarse classification of a [`BmtError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Io,
}

/// A fatal error for a single capture file.
///
/// No partial record is ever produced alongside one of these:
/// the parser bails before constructing the output.
#[derive(Debug, Error)]
pub enum BmtError {
    /// The bytes do not have the expected container shape.
    #[error("format error: {0}")]
    Format(String),

    /// Reading the capture or writing an extracted image failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BmtError {
    pub fn format<S: Into<String>>(msg: S) -> Self {
        BmtError::Format(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BmtError::Format(_) => ErrorKind::Format,
            BmtError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T, E = BmtError> = std::result::Result<T, E>;

/// Bail out of the current function with a [`BmtError::Format`].
macro_rules! format_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::BmtError::Format(format!($($arg)*)))
    };
}

/// Like [`format_bail`], unless the condition holds.
macro_rules! format_ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            format_bail!($($arg)*);
        }
    };
}
