//! Unified error types for smsthread.
//!
//! Only fatal conditions are represented here. Per-record problems such as an
//! unsupported attachment type or a malformed base64 payload are logged and
//! skipped by the builder and never surface as a [`SmsError`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized [`Result`] type for smsthread operations.
///
/// # Example
///
/// ```rust
/// use smsthread::error::Result;
///
/// fn count_threads() -> Result<usize> {
///     Ok(0)
/// }
/// ```
pub type Result<T> = std::result::Result<T, SmsError>;

/// The error type for all smsthread operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SmsError {
    /// An I/O error occurred.
    ///
    /// This typically happens when:
    /// - An input file doesn't exist or can't be read
    /// - The output directory can't be created
    /// - A media file, document or stylesheet can't be written
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The backup could not be parsed as XML, even after repairing the
    /// character references that phone exports commonly get wrong.
    #[error("Failed to parse backup XML{}: {source}", path.as_ref().map(|p| format!(" (file: {})", p.display())).unwrap_or_default())]
    Xml {
        /// The underlying parser error
        #[source]
        source: roxmltree::Error,
        /// The file path, if available
        path: Option<PathBuf>,
    },

    /// The document is well-formed XML but not a backup we understand.
    #[error("Invalid backup format: {message}")]
    InvalidFormat {
        /// Description of what's wrong
        message: String,
    },

    /// The requested locale is not known to the date formatter.
    #[error("Unknown locale '{input}'. Expected a POSIX name such as en_US or de_DE")]
    InvalidLocale {
        /// The locale string that was provided
        input: String,
    },
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl SmsError {
    /// Creates an XML parse error.
    pub fn xml(source: roxmltree::Error, path: Option<PathBuf>) -> Self {
        SmsError::Xml { source, path }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        SmsError::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid locale error.
    pub fn invalid_locale(input: impl Into<String>) -> Self {
        SmsError::InvalidLocale {
            input: input.into(),
        }
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, SmsError::Io(_))
    }

    /// Returns `true` if this is an XML parse error.
    pub fn is_xml(&self) -> bool {
        matches!(self, SmsError::Xml { .. })
    }

    /// Returns `true` if this is an invalid format error.
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, SmsError::InvalidFormat { .. })
    }

    /// Returns `true` if this is an invalid locale error.
    pub fn is_invalid_locale(&self) -> bool {
        matches!(self, SmsError::InvalidLocale { .. })
    }
}
