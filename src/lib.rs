//! # smsthread
//!
//! Turns SMS Backup & Restore XML exports into static HTML conversation
//! threads, one document per contact, with MMS images extracted next to them
//! and a month-by-month table of contents.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use smsthread::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let numbers = CarrierNumbers::new("555-123-4567");
//!     let parser = BackupParser::new(BuildConfig::new("html").with_carrier_number(numbers.dummy()));
//!
//!     // Several backups accumulate into one archive
//!     let mut archive = Archive::new();
//!     parser.parse(Path::new("sms-2023.xml"), &mut archive)?;
//!     parser.parse(Path::new("sms-2024.xml"), &mut archive)?;
//!
//!     let config = RenderConfig::new(numbers.real());
//!     write_conversations(
//!         Path::new("html"),
//!         &archive.conversations,
//!         &archive.known_users,
//!         &config,
//!     )?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`address`] - phone number normalization ([`normalize_address`](address::normalize_address))
//! - [`message`] - [`Message`], [`MessageKind`](message::MessageKind), [`Direction`](message::Direction)
//! - [`conversation`] - [`ConversationSet`](conversation::ConversationSet), [`KnownUsers`](conversation::KnownUsers), [`Archive`](conversation::Archive)
//! - [`media`] - MMS image extraction
//! - [`xml`] - tolerant loading of backup XML
//! - [`parser`] - [`BackupParser`](parser::BackupParser), the conversation builder
//! - [`output`] - HTML documents and stylesheet
//! - [`config`] - [`BuildConfig`](config::BuildConfig), [`RenderConfig`](config::RenderConfig), [`CarrierNumbers`](config::CarrierNumbers)
//! - [`cli`] - command-line arguments (`cli` feature)
//! - [`error`] - [`SmsError`], [`Result`]

pub mod address;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod media;
pub mod message;
pub mod output;
pub mod parser;
pub mod xml;

// Re-export the main types at the crate root for convenience
pub use error::{Result, SmsError};
pub use message::Message;

/// Convenient re-exports for common usage.
///
/// ```rust
/// use smsthread::prelude::*;
/// ```
pub mod prelude {
    pub use crate::Message;
    pub use crate::address::normalize_address;
    pub use crate::config::{BuildConfig, CarrierNumbers, RenderConfig, parse_locale};
    pub use crate::conversation::{Archive, ConversationSet, KnownUsers};
    pub use crate::error::{Result, SmsError};
    pub use crate::message::{Direction, MessageKind};
    pub use crate::output::{render_conversation, write_conversations};
    pub use crate::parser::BackupParser;
}
