//! Property-based tests for smsthread.
//!
//! These tests generate random inputs to find edge cases.

use proptest::prelude::*;

use smsthread::address::normalize_address;
use smsthread::conversation::ConversationSet;
use smsthread::message::Message;
use smsthread::output::month_buckets;
use smsthread::xml::{parse_document, repair_xml};

use chrono::Locale;

/// Phone numbers the way exporters write them
fn arb_address() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["", "+", "+1 ", "1-", "("]),
        prop::collection::vec(0u8..10, 0..14),
        prop::sample::select(vec!["", "-", " ", ")", "."]),
    )
        .prop_map(|(prefix, digits, sep)| {
            let mut out = prefix.to_string();
            for (i, d) in digits.iter().enumerate() {
                if i > 0 && i % 3 == 0 {
                    out.push_str(sep);
                }
                out.push(char::from(b'0' + d));
            }
            out
        })
}

/// Millisecond timestamps between 2000 and 2040
fn arb_timestamp() -> impl Strategy<Value = i64> {
    946_684_800_000i64..2_208_988_800_000i64
}

fn arb_char_ref() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..0x11_0000).prop_map(|code| format!("&#{code};")),
        (0xD800u32..0xE000).prop_map(|code| format!("&#x{code:X};")),
        Just("&amp;".to_string()),
        Just("text".to_string()),
        Just(" & ".to_string()),
        Just("R&D".to_string()),
        Just("&#;".to_string()),
        Just("&nbsp;".to_string()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ============================================
    // ADDRESS PROPERTIES
    // ============================================

    /// Normalizing twice changes nothing
    #[test]
    fn normalize_is_idempotent(raw in arb_address()) {
        let once = normalize_address(&raw);
        prop_assert_eq!(normalize_address(&once), once);
    }

    /// Only ASCII digits survive, and never exactly ten of them
    #[test]
    fn normalize_output_is_digits(raw in arb_address()) {
        let normalized = normalize_address(&raw);
        prop_assert!(normalized.chars().all(|c| c.is_ascii_digit()));
        prop_assert_ne!(normalized.len(), 10);
    }

    /// Ten digit numbers gain the country code
    #[test]
    fn ten_digits_gain_prefix(digits in "[0-9]{10}") {
        prop_assert_eq!(normalize_address(&digits), format!("1{digits}"));
    }

    // ============================================
    // XML REPAIR PROPERTIES
    // ============================================

    /// Whatever references a body holds, the repaired document parses
    #[test]
    fn repaired_document_parses(pieces in prop::collection::vec(arb_char_ref(), 0..12)) {
        let xml = format!(r#"<smses><sms body="{}" /></smses>"#, pieces.concat());
        let (fixed, _) = repair_xml(&xml);
        prop_assert!(parse_document(&fixed).is_ok(), "failed on {}", fixed);
    }

    /// Clean input is passed through untouched
    #[test]
    fn clean_input_is_borrowed(body in "[a-zA-Z0-9 .,!?]{0,40}") {
        let xml = format!(r#"<sms body="{body}" />"#);
        let (fixed, stats) = repair_xml(&xml);
        prop_assert!(matches!(fixed, std::borrow::Cow::Borrowed(_)));
        prop_assert_eq!(stats.total(), 0);
    }

    // ============================================
    // CONVERSATION PROPERTIES
    // ============================================

    /// A conversation iterates in timestamp order with one entry per timestamp
    #[test]
    fn conversation_is_ordered(stamps in prop::collection::vec(arb_timestamp(), 0..30)) {
        let mut set = ConversationSet::new();
        for ts in &stamps {
            set.insert("15551234567", Message::text(*ts, "x", "1", ""));
        }

        let mut unique = stamps.clone();
        unique.sort_unstable();
        unique.dedup();

        let keys: Vec<i64> = set
            .get("15551234567")
            .map(|c| c.keys().copied().collect())
            .unwrap_or_default();
        prop_assert_eq!(keys, unique);
    }

    // ============================================
    // MONTH BUCKET PROPERTIES
    // ============================================

    /// Sorted input yields distinct months and keeps every message
    #[test]
    fn buckets_partition_sorted_input(mut stamps in prop::collection::vec(arb_timestamp(), 0..40)) {
        stamps.sort_unstable();
        let messages: Vec<Message> = stamps
            .iter()
            .map(|ts| Message::text(*ts, "x", "2", ""))
            .collect();

        let buckets = month_buckets(&messages, Locale::en_US);

        let total: usize = buckets.iter().map(|b| b.messages.len()).sum();
        prop_assert_eq!(total, messages.len());

        let mut anchors: Vec<&str> = buckets.iter().map(|b| b.anchor.as_str()).collect();
        let count = anchors.len();
        prop_assert!(anchors.windows(2).all(|w| w[0] < w[1]));
        anchors.dedup();
        prop_assert_eq!(anchors.len(), count);
    }
}
