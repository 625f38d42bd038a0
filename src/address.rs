//! Phone number normalization.
//!
//! Every conversation is keyed by a normalized address, so the same contact
//! written as `(555) 123-4567`, `+1 555 123 4567` or `15551234567` ends up in
//! one thread.

/// Normalizes a raw phone number into a conversation key.
///
/// Strips everything that isn't an ASCII digit. If exactly ten digits remain,
/// the number is assumed to be North American and `1` is prepended. Nothing
/// else is validated: short codes, international numbers and garbage pass
/// through as their digits.
///
/// The function is idempotent.
///
/// # Example
///
/// ```rust
/// use smsthread::address::normalize_address;
///
/// assert_eq!(normalize_address("(555) 123-4567"), "15551234567");
/// assert_eq!(normalize_address("+1 555 123 4567"), "15551234567");
/// assert_eq!(normalize_address("72345"), "72345");
/// assert_eq!(normalize_address(""), "");
/// ```
pub fn normalize_address(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 {
        format!("1{digits}")
    } else {
        digits
    }
}
