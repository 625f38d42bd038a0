//! Message model for SMS and MMS records.
//!
//! A [`Message`] is one entry in one conversation. Plain SMS records become
//! [`MessageKind::Text`]; MMS records become [`MessageKind::Multimedia`] and
//! carry the filenames of the images extracted from their parts.
//!
//! # Examples
//!
//! ```
//! use smsthread::message::{Direction, Message};
//!
//! let msg = Message::text(1_700_000_000_000, "See you soon", "1", "Alice");
//! assert_eq!(msg.direction(), Direction::Incoming);
//! assert!(!msg.has_images());
//!
//! let mut mms = Message::multimedia("Alice");
//! mms.push_text("Look");
//! mms.push_image("1700000000000photo.jpg");
//! assert!(mms.has_images());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contact name SMS Backup & Restore writes when it has no name for a number.
pub const UNKNOWN_CONTACT: &str = "(Unknown)";

/// Whether a message was received by or sent from the backed-up phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received from the counterparty.
    Incoming,
    /// Sent by the phone's owner.
    Outgoing,
}

impl Direction {
    /// Classifies a raw `type` code from the backup.
    ///
    /// `"1"` (SMS inbox) and `"137"` (MMS `from` address) are incoming; every
    /// other code, including empty and unknown ones, is outgoing.
    pub fn from_code(code: &str) -> Self {
        match code {
            "1" | "137" => Direction::Incoming,
            _ => Direction::Outgoing,
        }
    }

    /// Returns `true` for [`Direction::Incoming`].
    pub fn is_incoming(self) -> bool {
        self == Direction::Incoming
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Incoming => write!(f, "Incoming"),
            Direction::Outgoing => write!(f, "Outgoing"),
        }
    }
}

/// The shape of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessageKind {
    /// A plain SMS.
    Text,
    /// An MMS, with images in the order their parts appeared.
    Multimedia {
        /// Filenames relative to the output directory.
        images: Vec<String>,
    },
}

/// One entry of one conversation.
///
/// Messages are plain values. When an MMS addressed to several people is
/// filed into several conversations, each conversation gets its own clone,
/// so stamping one copy never affects its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Epoch milliseconds, as stored in the backup.
    pub timestamp: i64,

    /// Body text. For MMS this is the concatenation of all text parts.
    pub text: String,

    /// Raw direction code from the backup (`type` attribute).
    pub direction_code: String,

    /// Contact name attached to the record; may be empty or `(Unknown)`.
    pub contact_name: String,

    /// Normalized address of the conversation this entry is filed under.
    ///
    /// Empty until the builder stamps it.
    #[serde(default)]
    pub address: String,

    /// Text or multimedia payload.
    pub kind: MessageKind,
}

impl Message {
    /// Creates a plain SMS message.
    pub fn text(
        timestamp: i64,
        text: impl Into<String>,
        direction_code: impl Into<String>,
        contact_name: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            text: text.into(),
            direction_code: direction_code.into(),
            contact_name: contact_name.into(),
            address: String::new(),
            kind: MessageKind::Text,
        }
    }

    /// Creates an empty MMS shell.
    ///
    /// Text and images are filled in while walking the record's parts;
    /// address, direction and timestamp are stamped per recipient.
    pub fn multimedia(contact_name: impl Into<String>) -> Self {
        Self {
            timestamp: 0,
            text: String::new(),
            direction_code: String::new(),
            contact_name: contact_name.into(),
            address: String::new(),
            kind: MessageKind::Multimedia { images: Vec::new() },
        }
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    /// Builder method to set the conversation address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Stamps a copy of an MMS shell for one recipient.
    #[must_use]
    pub fn stamped(
        mut self,
        address: impl Into<String>,
        direction_code: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        self.address = address.into();
        self.direction_code = direction_code.into();
        self.timestamp = timestamp;
        self
    }

    // =========================================================================
    // Mutation during MMS assembly
    // =========================================================================

    /// Appends a text part to the body.
    pub fn push_text(&mut self, part: &str) {
        self.text.push_str(part);
    }

    /// Appends an extracted image filename.
    ///
    /// Ignored for plain SMS messages, which cannot carry attachments.
    pub fn push_image(&mut self, filename: impl Into<String>) {
        if let MessageKind::Multimedia { images } = &mut self.kind {
            images.push(filename.into());
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the derived direction.
    pub fn direction(&self) -> Direction {
        Direction::from_code(&self.direction_code)
    }

    /// Returns the timestamp as a UTC datetime.
    ///
    /// Returns `None` when the value is outside chrono's representable range.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Returns the extracted image filenames (empty for SMS).
    pub fn images(&self) -> &[String] {
        match &self.kind {
            MessageKind::Text => &[],
            MessageKind::Multimedia { images } => images,
        }
    }

    /// Returns `true` if this is an MMS.
    pub fn is_multimedia(&self) -> bool {
        matches!(self.kind, MessageKind::Multimedia { .. })
    }

    /// Returns `true` if at least one image was extracted.
    pub fn has_images(&self) -> bool {
        !self.images().is_empty()
    }

    /// Returns the contact name when it is meaningful for display.
    pub fn display_name(&self) -> Option<&str> {
        match self.contact_name.as_str() {
            "" | UNKNOWN_CONTACT => None,
            name => Some(name),
        }
    }
}
