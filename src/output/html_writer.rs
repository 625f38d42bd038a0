//! HTML conversation writer.
//!
//! One document per conversation, laid out as:
//!
//! ```text
//! nav   "Jump to a specific month"   one link per month
//! main  "Conversations by month"
//!   section#2403  ~~ March 2024 ~~
//!     article  date, sender line, body, images
//!     ...
//!   section#2404  ~~ April 2024 ~~
//! ```
//!
//! Months are computed in UTC. Rendering depends only on its inputs, so the
//! same conversations always produce byte-identical documents.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Locale, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::debug;

use super::stylesheet::{STYLESHEET_FILE, write_stylesheet};
use crate::config::RenderConfig;
use crate::conversation::{Conversation, ConversationSet, KnownUsers};
use crate::error::Result;
use crate::message::{Message, MessageKind, UNKNOWN_CONTACT};

const MESSAGE_DATE_FORMAT: &str = "%m/%d/%y %I:%M:%S%p";
const THEIR_NUMBER_CLASS: &str = "msg_sender_incoming";
const OWN_NUMBER_CLASS: &str = "msg_sender_outgoing";

/// A run of consecutive messages from the same calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBucket<'m> {
    /// Long label, e.g. `March 2024`.
    pub label: String,
    /// Anchor id, `yymm`, e.g. `2403`.
    pub anchor: String,
    /// Messages in timestamp order.
    pub messages: Vec<&'m Message>,
}

fn message_datetime(message: &Message) -> DateTime<Utc> {
    message.datetime().unwrap_or_default()
}

/// Groups time-ordered messages into month buckets.
///
/// A new bucket starts whenever the month label changes from the previous
/// message. The input must already be sorted by timestamp (a
/// [`Conversation`] iterates that way); unsorted input would split one month
/// into several buckets.
pub fn month_buckets<'m, I>(messages: I, locale: Locale) -> Vec<MonthBucket<'m>>
where
    I: IntoIterator<Item = &'m Message>,
{
    let mut buckets: Vec<MonthBucket<'m>> = Vec::new();

    for message in messages {
        let dt = message_datetime(message);
        let label = dt.format_localized("%B %Y", locale).to_string();

        match buckets.last_mut() {
            Some(last) if last.label == label => last.messages.push(message),
            _ => buckets.push(MonthBucket {
                label,
                anchor: dt.format("%y%m").to_string(),
                messages: vec![message],
            }),
        }
    }

    buckets
}

/// Renders the document for the conversation with `address`.
pub fn render_conversation(
    address: &str,
    conversation: &Conversation,
    known_users: &KnownUsers,
    config: &RenderConfig<'_>,
) -> String {
    let buckets = month_buckets(conversation.values(), config.locale);
    let mut out = String::new();

    let title = match known_users.name(address).filter(|name| *name != UNKNOWN_CONTACT) {
        Some(name) => format!("Conversation with {} ({})", name, address),
        None => format!("Conversation with {}", address),
    };
    out.push_str("<!DOCTYPE html><html><head><meta charset=\"UTF-8\">");
    out.push_str(&format!("<title>{}</title>", encode_text(&title)));
    out.push_str(&format!(
        "<link rel=\"stylesheet\" href=\"{}\">",
        STYLESHEET_FILE
    ));
    out.push_str("</head><body>\n");

    // Table of contents
    out.push_str("<nav><h1 id=\"toc\">Jump to a specific month</h1><ul class=\"toc\">");
    for bucket in &buckets {
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a></li>",
            bucket.anchor,
            encode_text(&bucket.label)
        ));
    }
    out.push_str("</ul></nav><hr/><hr/>\n");

    out.push_str("<main><h1 id=\"main\">Conversations by month</h1>\n");
    for bucket in &buckets {
        out.push_str("<hr/>");
        out.push_str(&format!(
            "<section class=\"month_convos\" id=\"{}\">",
            bucket.anchor
        ));
        out.push_str(&format!("<h2>~~ {} ~~</h2>\n", encode_text(&bucket.label)));
        for message in &bucket.messages {
            render_message(&mut out, address, message, config);
        }
        out.push_str("</section>\n");
    }
    out.push_str("</main></body></html>\n");

    out
}

fn render_message(out: &mut String, address: &str, message: &Message, config: &RenderConfig<'_>) {
    let direction = message.direction();
    let incoming = direction.is_incoming();
    let own_number = config.carrier_number;

    let (from_number, to_number) = if incoming {
        (address, own_number)
    } else {
        (own_number, address)
    };

    let own_label = " <i>(this phone)</i>".to_string();
    let their_label = if from_number == to_number {
        " <i>(???)</i>".to_string()
    } else {
        message
            .display_name()
            .map(|name| format!(" <i>({})</i>", encode_text(name)))
            .unwrap_or_default()
    };

    // The counterparty's number is styled as incoming, the phone's as outgoing
    let (from_class, from_label, to_class, to_label) = if incoming {
        (THEIR_NUMBER_CLASS, &their_label, OWN_NUMBER_CLASS, &own_label)
    } else {
        (OWN_NUMBER_CLASS, &own_label, THEIR_NUMBER_CLASS, &their_label)
    };

    out.push_str("<article class=\"one_message\">");
    out.push_str(&format!(
        "<h3 class=\"msg_date\">{}</h3>",
        message_datetime(message).format_localized(MESSAGE_DATE_FORMAT, config.locale)
    ));
    out.push_str(&format!(
        "<h4 class=\"msg_sender\">{label}: from <span class=\"{from_class}\">{from}</span>{from_label} to <span class=\"{to_class}\">{to}</span>{to_label}</h4>",
        label = direction,
        from = encode_text(from_number),
        to = encode_text(to_number),
    ));

    out.push_str(&format!("<p class=\"msg_body\">{}", encode_text(&message.text)));
    match &message.kind {
        MessageKind::Text => {}
        MessageKind::Multimedia { images } => {
            out.push_str("<br />");
            for image in images {
                let href = encode_double_quoted_attribute(image);
                out.push_str(&format!(
                    "<a href=\"{href}\"><img class=\"mms_img\" src=\"{href}\" /></a> "
                ));
            }
        }
    }
    out.push_str("</p></article><hr/>\n");
}

/// Writes the stylesheet and one `<address>.html` per conversation into
/// `output_dir`.
///
/// Returns the number of documents written.
pub fn write_conversations(
    output_dir: &Path,
    conversations: &ConversationSet,
    known_users: &KnownUsers,
    config: &RenderConfig<'_>,
) -> Result<usize> {
    write_stylesheet(output_dir)?;

    let mut files = 0;
    for (address, conversation) in conversations {
        let html = render_conversation(address, conversation, known_users, config);
        let path = output_dir.join(format!("{address}.html"));
        fs::write(&path, html)?;
        debug!(file = %path.display(), messages = conversation.len(), "Wrote conversation");
        files += 1;
    }
    Ok(files)
}
