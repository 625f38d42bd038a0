//! Conversation builder for SMS Backup & Restore XML.
//!
//! The backup is a flat list of records under an `<smses>` root:
//!
//! ```xml
//! <smses count="2">
//!   <sms address="+15551234567" date="1710000000000" type="1"
//!        body="Hi!" contact_name="Alice" />
//!   <mms date="1710000060000" contact_name="Alice, Bob">
//!     <parts>
//!       <part ct="text/plain" name="text_0.txt" text="Look at this" />
//!       <part ct="image/jpeg" name="IMG_0001.jpg" data="/9j/4AAQ..." />
//!     </parts>
//!     <addrs>
//!       <addr address="+15551234567" type="137" />
//!       <addr address="+15559876543" type="151" />
//!       <addr address="+15550000000" type="151" />
//!     </addrs>
//!   </mms>
//! </smses>
//! ```
//!
//! An `sms` becomes one entry in the sender's or recipient's conversation. An
//! `mms` is assembled once from its parts and then filed, as an independent
//! copy, into the conversation of every address it involves except the
//! phone's own.
//!
//! # Example
//!
//! ```rust
//! use smsthread::config::BuildConfig;
//! use smsthread::conversation::Archive;
//! use smsthread::parser::BackupParser;
//!
//! let parser = BackupParser::new(BuildConfig::new("out").with_carrier_number("5550000000"));
//! let mut archive = Archive::new();
//!
//! let xml = r#"<smses><sms address="555-123-4567" date="1710000000000" type="1"
//!     body="Hi!" contact_name="Alice" /></smses>"#;
//! let produced = parser.parse_str(xml, &mut archive)?;
//!
//! assert_eq!(produced, 1);
//! assert_eq!(archive.known_users.name("15551234567"), Some("Alice"));
//! # Ok::<(), smsthread::SmsError>(())
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use roxmltree::{Document, Node};
use tracing::{debug, warn};

use crate::address::normalize_address;
use crate::config::BuildConfig;
use crate::conversation::Archive;
use crate::error::{Result, SmsError};
use crate::media::extract_image;
use crate::message::Message;
use crate::xml::{parse_document, read_backup, repair_logged, truncate_to_complete_records};

/// Recipients of one MMS: normalized address to direction code.
pub type Recipients = BTreeMap<String, String>;

/// Outcome of [`repair_missing_address`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRepair {
    /// No recipient had a blank address.
    NotNeeded,
    /// The blank address was the only recipient and now stands for the
    /// carrier number.
    Rekeyed,
    /// The blank address was removed; the remaining recipients are kept.
    Dropped,
    /// Both a blank address and the carrier number were present. Nothing was
    /// changed, so the blank address keeps its own conversation.
    Ambiguous,
}

/// Repairs an MMS recipient list containing a blank address.
///
/// Exporters sometimes lose the phone's own number and write an empty
/// `address` instead. When the carrier number is not otherwise among the
/// recipients, the blank entry is taken to be the phone itself: a lone blank
/// recipient (a message to self) is re-keyed under `carrier_number` with its
/// direction code, otherwise the blank entry is dropped. When the carrier
/// number *is* present there is no telling whose number went missing, and the
/// list is left as it is.
pub fn repair_missing_address(recipients: &mut Recipients, carrier_number: &str) -> AddressRepair {
    let Some(code) = recipients.get("").cloned() else {
        return AddressRepair::NotNeeded;
    };
    if recipients.contains_key(carrier_number) {
        return AddressRepair::Ambiguous;
    }

    recipients.remove("");
    if recipients.is_empty() {
        recipients.insert(carrier_number.to_string(), code);
        AddressRepair::Rekeyed
    } else {
        AddressRepair::Dropped
    }
}

/// Builds conversations from SMS Backup & Restore XML.
///
/// One parser can be fed several backups in turn; everything accumulates in
/// the [`Archive`] passed to each call. Records from later files replace
/// records from earlier ones that share address and timestamp.
#[derive(Debug, Clone)]
pub struct BackupParser {
    config: BuildConfig,
}

impl BackupParser {
    /// Creates a parser with the given configuration.
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Returns the name of the format this parser reads.
    pub fn name(&self) -> &'static str {
        "SMS Backup & Restore"
    }

    /// Returns the parser configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Parses a backup file into `archive`.
    ///
    /// Returns the number of conversation entries produced.
    pub fn parse(&self, path: &Path, archive: &mut Archive) -> Result<usize> {
        let text = read_backup(path)?;
        self.parse_text(&text, Some(path), archive)
    }

    /// Parses backup XML held in memory into `archive`.
    pub fn parse_str(&self, content: &str, archive: &mut Archive) -> Result<usize> {
        self.parse_text(content, None, archive)
    }

    /// Repairs and parses `text`.
    ///
    /// A document that is still malformed after repair is cut back to its
    /// last complete record and parsed again. Only when that also fails, or
    /// no record precedes the error, is the original error returned.
    fn parse_text(&self, text: &str, path: Option<&Path>, archive: &mut Archive) -> Result<usize> {
        let repaired = repair_logged(text, path);
        let err = match parse_document(&repaired) {
            Ok(doc) => return self.parse_document(&doc, archive),
            Err(err) => err,
        };

        let Some(kept) = truncate_to_complete_records(&repaired, &err) else {
            return Err(SmsError::xml(err, path.map(Path::to_path_buf)));
        };
        let Ok(doc) = parse_document(&kept) else {
            return Err(SmsError::xml(err, path.map(Path::to_path_buf)));
        };

        warn!(
            file = %path.map(|p| p.display().to_string()).unwrap_or_default(),
            error = %err,
            kept_bytes = kept.len(),
            total_bytes = repaired.len(),
            "Backup XML is malformed; keeping the records before the error"
        );
        self.parse_document(&doc, archive)
    }

    /// Walks an already parsed document.
    pub fn parse_document(&self, doc: &Document<'_>, archive: &mut Archive) -> Result<usize> {
        let root = doc.root_element();
        let records = || root.children().filter(Node::is_element);

        if root.tag_name().name() != "smses"
            && !records().any(|node| matches!(node.tag_name().name(), "sms" | "mms"))
        {
            return Err(SmsError::invalid_format(format!(
                "expected an <smses> root element, found <{}>",
                root.tag_name().name()
            )));
        }

        let mut produced = 0;
        for node in records() {
            produced += match node.tag_name().name() {
                "sms" => self.build_sms(node, archive),
                "mms" => self.build_mms(node, archive)?,
                other => {
                    debug!(tag = other, "Ignoring unknown backup record");
                    0
                }
            };
        }

        archive.entries += produced;
        Ok(produced)
    }

    fn build_sms(&self, node: Node<'_, '_>, archive: &mut Archive) -> usize {
        let Some(date) = record_date(node) else {
            return 0;
        };
        let Some(raw_address) = node.attribute("address") else {
            warn!(date, line = line_of(node), "Skipping SMS without an address");
            return 0;
        };

        let address = normalize_address(raw_address);
        let name = node.attribute("contact_name").unwrap_or_default();
        let message = Message::text(
            date,
            node.attribute("body").unwrap_or_default(),
            node.attribute("type").unwrap_or_default(),
            name,
        )
        .with_address(&address);

        archive.conversations.insert(&address, message);
        archive.known_users.learn(&address, name);
        1
    }

    fn build_mms(&self, node: Node<'_, '_>, archive: &mut Archive) -> Result<usize> {
        let Some(date) = record_date(node) else {
            return Ok(0);
        };

        let mut shell = Message::multimedia(node.attribute("contact_name").unwrap_or_default());
        let mut recipients = Recipients::new();

        for child in node.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "parts" => {
                    for part in child_elements(child, "part") {
                        self.add_part(&mut shell, date, part)?;
                    }
                }
                "addrs" => {
                    for addr in child_elements(child, "addr") {
                        let address = normalize_address(addr.attribute("address").unwrap_or_default());
                        if address != self.config.carrier_number {
                            let code = addr.attribute("type").unwrap_or_default();
                            recipients.insert(address, code.to_string());
                        }
                    }
                }
                _ => {}
            }
        }

        if repair_missing_address(&mut recipients, &self.config.carrier_number)
            == AddressRepair::Ambiguous
        {
            warn!(date, line = line_of(node), "Failed to fix missing phone number in message");
        }

        let produced = recipients.len();
        for (address, code) in recipients {
            let entry = shell.clone().stamped(address.as_str(), code, date);
            archive.conversations.insert(&address, entry);
        }
        Ok(produced)
    }

    fn add_part(&self, shell: &mut Message, date: i64, part: Node<'_, '_>) -> Result<()> {
        let mime = part.attribute("ct").unwrap_or_default();
        if mime.contains("image") {
            let name = part.attribute("name").unwrap_or_default();
            let data = part.attribute("data").unwrap_or_default();
            if let Some(filename) = extract_image(&self.config.media_dir, date, name, mime, data)? {
                shell.push_image(filename);
            }
        } else if mime.contains("text") {
            shell.push_text(part.attribute("text").unwrap_or_default());
        }
        Ok(())
    }
}

fn child_elements<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && child.tag_name().name() == tag)
}

/// Reads a record's `date` attribute, warning when it is unusable.
fn record_date(node: Node<'_, '_>) -> Option<i64> {
    let raw = node.attribute("date");
    let date = raw.and_then(|value| value.trim().parse().ok());
    if date.is_none() {
        warn!(
            tag = node.tag_name().name(),
            date = raw.unwrap_or_default(),
            line = line_of(node),
            "Skipping record without a valid date"
        );
    }
    date
}

fn line_of(node: Node<'_, '_>) -> u32 {
    node.document().text_pos_at(node.range().start).row
}
