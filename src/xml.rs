//! Tolerant loading of backup XML.
//!
//! Phone backup tools write XML that strict parsers reject. The usual
//! offenders are emoji serialized as two numeric references to UTF-16
//! surrogate halves (`&#55357;&#56832;`), bare `&` in message bodies and
//! control characters copied verbatim out of them. [`repair_xml`] rewrites
//! those before the text reaches [`roxmltree`], which otherwise aborts on the
//! first one.
//!
//! Backups cut short by a crash or a full disk are handled by
//! [`truncate_to_complete_records`], which keeps every record that closed
//! before the point the parser gave up.

use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use roxmltree::{Document, ParsingOptions, TextPos};
use tracing::{debug, warn};

use crate::error::Result;

static CHAR_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9A-Fa-f]+)|([0-9]+));").unwrap());

static RECORD_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"</(?:sms|mms)\s*>|<sms\b(?:[^<>"']|"[^"]*"|'[^']*')*/>"#).unwrap()
});

static FIRST_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z_][A-Za-z0-9_.:\-]*)").unwrap());

const HIGH_SURROGATES: std::ops::RangeInclusive<u32> = 0xD800..=0xDBFF;
const LOW_SURROGATES: std::ops::RangeInclusive<u32> = 0xDC00..=0xDFFF;

/// What [`repair_xml`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairStats {
    /// Surrogate reference pairs merged into one character.
    pub merged_pairs: usize,
    /// References to characters XML cannot contain, removed.
    pub dropped_refs: usize,
    /// Raw control characters removed.
    pub stripped_chars: usize,
    /// `&` not starting a reference, rewritten as `&amp;`.
    pub escaped_ampersands: usize,
}

impl RepairStats {
    /// Total number of edits.
    pub fn total(&self) -> usize {
        self.merged_pairs + self.dropped_refs + self.stripped_chars + self.escaped_ampersands
    }
}

/// Returns `true` if `code` is allowed in an XML 1.0 document.
fn is_xml_char(code: u32) -> bool {
    matches!(code, 0x9 | 0xA | 0xD | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF)
}

fn ref_value(caps: &regex::Captures<'_>) -> Option<u32> {
    if let Some(hex) = caps.get(1) {
        u32::from_str_radix(hex.as_str(), 16).ok()
    } else {
        caps.get(2).and_then(|dec| dec.as_str().parse().ok())
    }
}

/// Rewrites the defects phone exporters put into their XML.
///
/// - Adjacent references to a high and a low surrogate become the character
///   they encode.
/// - References to lone surrogates and other non-XML characters are removed.
/// - Raw control characters other than tab, newline and carriage return are
///   removed.
/// - An `&` that does not open a predefined entity or a numeric reference is
///   escaped.
///
/// Returns the input unchanged (borrowed) when there is nothing to fix.
///
/// # Example
///
/// ```rust
/// use smsthread::xml::repair_xml;
///
/// let (fixed, stats) = repair_xml(r#"<sms body="hi &#55357;&#56832;&#1; & bye" />"#);
/// assert_eq!(fixed, "<sms body=\"hi \u{1F600} &amp; bye\" />");
/// assert_eq!(stats.merged_pairs, 1);
/// assert_eq!(stats.dropped_refs, 1);
/// assert_eq!(stats.escaped_ampersands, 1);
/// ```
pub fn repair_xml(input: &str) -> (Cow<'_, str>, RepairStats) {
    let mut stats = RepairStats::default();
    let refs = match escape_bare_ampersands(input, &mut stats) {
        Cow::Borrowed(text) => fix_char_refs(text, &mut stats),
        Cow::Owned(text) => Cow::Owned(fix_char_refs(&text, &mut stats).into_owned()),
    };

    let has_raw_controls = refs
        .chars()
        .any(|c| !is_xml_char(u32::from(c)));
    if !has_raw_controls {
        return (refs, stats);
    }

    let cleaned: String = refs
        .chars()
        .filter(|&c| {
            let keep = is_xml_char(u32::from(c));
            if !keep {
                stats.stripped_chars += 1;
            }
            keep
        })
        .collect();
    (Cow::Owned(cleaned), stats)
}

/// Returns `true` if `tail`, the text after an `&`, opens a reference.
///
/// Only the five predefined entities are recognized.
fn opens_reference(tail: &str) -> bool {
    let end = tail
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '#'))
        .unwrap_or(tail.len());
    if !tail[end..].starts_with(';') {
        return false;
    }

    let name = &tail[..end];
    match name.strip_prefix('#') {
        Some(number) => match number.strip_prefix(['x', 'X']) {
            Some(hex) => !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()),
            None => !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()),
        },
        None => matches!(name, "amp" | "lt" | "gt" | "quot" | "apos"),
    }
}

fn escape_bare_ampersands<'a>(input: &'a str, stats: &mut RepairStats) -> Cow<'a, str> {
    let bare: Vec<usize> = input
        .match_indices('&')
        .map(|(i, _)| i)
        .filter(|&i| !opens_reference(&input[i + 1..]))
        .collect();
    if bare.is_empty() {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + bare.len() * 4);
    let mut copied_to = 0;
    for i in &bare {
        out.push_str(&input[copied_to..*i]);
        out.push_str("&amp;");
        copied_to = i + 1;
    }
    out.push_str(&input[copied_to..]);
    stats.escaped_ampersands += bare.len();
    Cow::Owned(out)
}

fn fix_char_refs<'a>(input: &'a str, stats: &mut RepairStats) -> Cow<'a, str> {
    let refs: Vec<_> = CHAR_REF
        .captures_iter(input)
        .map(|caps| {
            let range = caps.get(0).map(|m| m.range()).unwrap_or_default();
            (range, ref_value(&caps))
        })
        .collect();

    if refs
        .iter()
        .all(|(_, value)| value.is_some_and(is_xml_char))
    {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut copied_to = 0;
    let mut i = 0;
    while i < refs.len() {
        let (range, value) = &refs[i];
        match value {
            Some(code) if is_xml_char(*code) => {}
            Some(high) if HIGH_SURROGATES.contains(high) => {
                out.push_str(&input[copied_to..range.start]);
                copied_to = range.end;

                let pair = refs.get(i + 1).and_then(|(next, low)| {
                    let low = (*low)?;
                    (next.start == range.end && LOW_SURROGATES.contains(&low))
                        .then(|| (next.end, 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)))
                });
                match pair.and_then(|(end, code)| char::from_u32(code).map(|c| (end, c))) {
                    Some((end, c)) => {
                        out.push(c);
                        copied_to = end;
                        stats.merged_pairs += 1;
                        i += 1;
                    }
                    None => stats.dropped_refs += 1,
                }
            }
            _ => {
                out.push_str(&input[copied_to..range.start]);
                copied_to = range.end;
                stats.dropped_refs += 1;
            }
        }
        i += 1;
    }
    out.push_str(&input[copied_to..]);
    Cow::Owned(out)
}

/// Parses repaired backup text.
///
/// DTDs are accepted and the node limit is lifted so multi-gigabyte backups
/// load.
pub fn parse_document(text: &str) -> std::result::Result<Document<'_>, roxmltree::Error> {
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    options.nodes_limit = u32::MAX;
    Document::parse_with_options(text, options)
}

/// Byte offset of a parser position, clamped to the end of `text`.
fn byte_offset(text: &str, pos: TextPos) -> usize {
    let line_start = match pos.row {
        0 | 1 => 0,
        row => match text.match_indices('\n').nth(row as usize - 2) {
            Some((i, _)) => i + 1,
            None => return text.len(),
        },
    };
    text[line_start..]
        .char_indices()
        .nth(pos.col.saturating_sub(1) as usize)
        .map_or(text.len(), |(i, _)| line_start + i)
}

/// Cuts a document that failed to parse back to its last complete record.
///
/// Returns the text up to the end of the last `sms` or `mms` record that
/// closed before the position of `err`, followed by the closing tag of the
/// root element. Returns `None` when no record closed before the error.
///
/// # Example
///
/// ```rust
/// use smsthread::xml::{parse_document, truncate_to_complete_records};
///
/// let text = r#"<smses><sms date="1" /><sms date="2" /><sms da"#;
/// let err = parse_document(text).unwrap_err();
/// let kept = truncate_to_complete_records(text, &err).unwrap();
/// assert_eq!(kept, r#"<smses><sms date="1" /><sms date="2" /></smses>"#);
/// ```
pub fn truncate_to_complete_records(text: &str, err: &roxmltree::Error) -> Option<String> {
    let limit = match err {
        roxmltree::Error::UnexpectedEndOfStream | roxmltree::Error::UnclosedRootNode => text.len(),
        _ => byte_offset(text, err.pos()),
    };

    let root = FIRST_TAG.captures(text)?.get(1)?;
    let cut = RECORD_END
        .find_iter(&text[..limit])
        .last()
        .map(|record| record.end())
        .filter(|&end| end > root.end())?;

    let mut kept = String::with_capacity(cut + root.as_str().len() + 3);
    kept.push_str(&text[..cut]);
    kept.push_str("</");
    kept.push_str(root.as_str());
    kept.push('>');
    Some(kept)
}

/// Reads a backup file into memory.
///
/// Invalid UTF-8 sequences are replaced rather than rejected and a leading
/// byte order mark is removed.
pub fn read_backup(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!(file = %path.display(), "Backup is not valid UTF-8; replacing invalid bytes");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    };
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// Repairs `text` and logs what had to be fixed.
pub fn repair_logged<'a>(text: &'a str, path: Option<&Path>) -> Cow<'a, str> {
    let (repaired, stats) = repair_xml(text);
    if stats.total() > 0 {
        debug!(
            file = %path.map(|p| p.display().to_string()).unwrap_or_default(),
            merged_pairs = stats.merged_pairs,
            dropped_refs = stats.dropped_refs,
            stripped_chars = stats.stripped_chars,
            escaped_ampersands = stats.escaped_ampersands,
            "Repaired backup XML"
        );
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_input_is_borrowed() {
        let input = r#"<smses><sms body="caf&#233; &amp; &#x1F600;" /></smses>"#;
        let (out, stats) = repair_xml(input);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_surrogate_pair_merged() {
        let (out, stats) = repair_xml("&#55357;&#56832;");
        assert_eq!(out, "\u{1F600}");
        assert_eq!(stats.merged_pairs, 1);
    }

    #[test]
    fn test_hex_surrogate_pair_merged() {
        let (out, _) = repair_xml("a&#xD83D;&#xDE00;b");
        assert_eq!(out, "a\u{1F600}b");
    }

    #[test]
    fn test_lone_surrogates_dropped() {
        let (out, stats) = repair_xml("x&#55357;y&#56832;z");
        assert_eq!(out, "xyz");
        assert_eq!(stats.dropped_refs, 2);
    }

    #[test]
    fn test_separated_pair_not_merged() {
        let (out, stats) = repair_xml("&#55357; &#56832;");
        assert_eq!(out, " ");
        assert_eq!(stats.merged_pairs, 0);
        assert_eq!(stats.dropped_refs, 2);
    }

    #[test]
    fn test_control_refs_dropped() {
        let (out, stats) = repair_xml("a&#0;b&#x1B;c&#9;d");
        assert_eq!(out, "abc&#9;d");
        assert_eq!(stats.dropped_refs, 2);
    }

    #[test]
    fn test_overflowing_ref_dropped() {
        let (out, _) = repair_xml("a&#99999999999;b");
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_raw_control_chars_stripped() {
        let (out, stats) = repair_xml("a\u{1}b\tc\u{b}d\n");
        assert_eq!(out, "ab\tcd\n");
        assert_eq!(stats.stripped_chars, 2);
    }

    #[test]
    fn test_bare_ampersands_escaped() {
        let (out, stats) = repair_xml(r#"<sms body="Tom & Jerry &amp;&lt; R&D &#;&unknown; &#x41;" />"#);
        assert_eq!(
            out,
            r#"<sms body="Tom &amp; Jerry &amp;&lt; R&amp;D &amp;#;&amp;unknown; &#x41;" />"#
        );
        assert_eq!(stats.escaped_ampersands, 4);
        assert!(parse_document(&out).is_ok());
    }

    #[test]
    fn test_ampersand_at_end_of_input() {
        let (out, stats) = repair_xml("a &");
        assert_eq!(out, "a &amp;");
        assert_eq!(stats.escaped_ampersands, 1);
    }

    #[test]
    fn test_ampersand_and_surrogates_together() {
        let (out, stats) = repair_xml("x & &#55357;&#56832;");
        assert_eq!(out, "x &amp; \u{1F600}");
        assert_eq!(stats.escaped_ampersands, 1);
        assert_eq!(stats.merged_pairs, 1);
    }

    #[test]
    fn test_truncated_document_cut_to_last_record() {
        let text = "<?xml version='1.0'?>\n<smses count=\"3\">\n  <sms date=\"1\" />\n  <mms date=\"2\"><parts><part ct=\"text/plain\" text=\"a > b\" /></parts></mms>\n  <mms date=\"3\"><parts>";
        let err = parse_document(text).unwrap_err();

        let kept = truncate_to_complete_records(text, &err).unwrap();
        assert!(kept.ends_with("</parts></mms></smses>"));
        let doc = parse_document(&kept).unwrap();
        assert_eq!(doc.root_element().children().filter(|n| n.is_element()).count(), 2);
    }

    #[test]
    fn test_error_mid_document_cut_before_it() {
        let text = "<smses>\n<sms date=\"1\" body=\"a/>b\" />\n<sms date=\"2\" <oops/>\n<sms date=\"3\" />\n</smses>";
        let err = parse_document(text).unwrap_err();

        let kept = truncate_to_complete_records(text, &err).unwrap();
        assert_eq!(kept, "<smses>\n<sms date=\"1\" body=\"a/>b\" /></smses>");
    }

    #[test]
    fn test_nothing_to_keep() {
        let text = "<smses><sms date=\"1\"";
        let err = parse_document(text).unwrap_err();
        assert!(truncate_to_complete_records(text, &err).is_none());
    }

    #[test]
    fn test_byte_offset_counts_chars() {
        let text = "ab\n\u{e9}\u{e9}x";
        assert_eq!(byte_offset(text, TextPos::new(1, 1)), 0);
        assert_eq!(byte_offset(text, TextPos::new(2, 3)), 7);
        assert_eq!(byte_offset(text, TextPos::new(9, 1)), text.len());
    }

    #[test]
    fn test_repaired_text_parses() {
        let input = r#"<smses><sms body="&#55357;&#56832;&#1;" /></smses>"#;
        assert!(parse_document(input).is_err());

        let fixed = repair_logged(input, None);
        let doc = parse_document(&fixed).unwrap();
        let sms = doc.root_element().first_element_child().unwrap();
        assert_eq!(sms.attribute("body"), Some("\u{1F600}"));
    }

    #[test]
    fn test_unrecoverable_xml_still_fails() {
        let fixed = repair_logged("<smses><sms></smses>", None);
        assert!(parse_document(&fixed).is_err());
    }

    #[test]
    fn test_read_backup_strips_bom_and_bad_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.xml");
        let mut bytes = "\u{feff}<smses body=\"".as_bytes().to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(b"\"/>");
        fs::write(&path, bytes).unwrap();

        let text = read_backup(&path).unwrap();
        assert!(text.starts_with("<smses"));
        assert!(text.contains('\u{fffd}'));
    }
}
