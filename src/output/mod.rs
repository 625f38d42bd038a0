//! Document rendering.
//!
//! - [`render_conversation`] - one conversation as an HTML string
//! - [`write_conversations`] - every conversation plus the shared stylesheet
//! - [`month_buckets`] - month grouping used for the table of contents
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use smsthread::config::RenderConfig;
//! use smsthread::conversation::Archive;
//! use smsthread::output::write_conversations;
//!
//! let archive = Archive::new();
//! let config = RenderConfig::new("15550000000");
//! let files = write_conversations(
//!     Path::new("out"),
//!     &archive.conversations,
//!     &archive.known_users,
//!     &config,
//! )?;
//! # Ok::<(), smsthread::SmsError>(())
//! ```

mod html_writer;
mod stylesheet;

pub use html_writer::{MonthBucket, month_buckets, render_conversation, write_conversations};
pub use stylesheet::{STYLESHEET, STYLESHEET_FILE, write_stylesheet};
