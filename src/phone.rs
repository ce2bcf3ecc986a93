// src/phone.rs
//! Phone number and call-log URI helpers.

use crate::models::{CallLogUri, NumberPresentation};

/// Numbers older call logs wrote for private/unknown/payphone callers.
const LEGACY_UNKNOWN_NUMBERS: [&str; 3] = ["-1", "-2", "-3"];

/// Returns true if the number is one of the legacy placeholder values.
pub fn is_legacy_unknown_number(number: &str) -> bool {
    LEGACY_UNKNOWN_NUMBERS.contains(&number)
}

/// Returns true if calls can be placed to this number.
pub fn can_place_calls_to(number: Option<&str>, presentation: NumberPresentation) -> bool {
    match number {
        Some(n) if !n.is_empty() => {
            presentation == NumberPresentation::Allowed && !is_legacy_unknown_number(n)
        }
        _ => false,
    }
}

/// Returns true if the number is a SIP address rather than a dialable number.
pub fn is_sip_number(number: Option<&str>) -> bool {
    let Some(n) = number else {
        return false;
    };
    n.contains('@') || n.contains("%40") || n.to_ascii_lowercase().starts_with("sip:")
}

/// Standard label for a phone number type code. Code 0 is a custom type and
/// uses the stored label.
pub fn type_label(number_type: Option<i32>, custom_label: Option<&str>) -> Option<String> {
    let custom = custom_label.filter(|l| !l.is_empty());
    let Some(kind) = number_type else {
        return custom.map(str::to_string);
    };

    let label = match kind {
        0 => return Some(custom.unwrap_or("Custom").to_string()),
        1 => "Home",
        2 => "Mobile",
        3 => "Work",
        4 => "Work Fax",
        5 => "Home Fax",
        6 => "Pager",
        7 => "Other",
        8 => "Callback",
        9 => "Car",
        10 => "Company Main",
        11 => "ISDN",
        12 => "Main",
        13 => "Other Fax",
        14 => "Radio",
        15 => "Telex",
        16 => "TTY TDD",
        17 => "Work Mobile",
        18 => "Work Pager",
        19 => "Assistant",
        20 => "MMS",
        _ => return custom.map(str::to_string),
    };
    Some(label.to_string())
}

/// Lookup key from a contact uri of the form `.../contacts/lookup/<key>[/<id>]`.
pub fn lookup_key_from_uri(uri: &str) -> Option<String> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    segments.find(|s| *s == "lookup")?;
    segments.next().map(str::to_string)
}

/// Builds the reference for one call-log row.
pub fn call_log_uri(base: &str, id: i64) -> CallLogUri {
    CallLogUri(format!("{}/{}", base.trim_end_matches('/'), id))
}

/// Parses the row id from the last path segment of a call-log uri.
pub fn parse_call_log_id(uri: &str) -> Option<i64> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    path.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callable_needs_number_and_allowed_presentation() {
        assert!(can_place_calls_to(Some("4085551212"), NumberPresentation::Allowed));
        assert!(!can_place_calls_to(Some(""), NumberPresentation::Allowed));
        assert!(!can_place_calls_to(None, NumberPresentation::Allowed));
        assert!(!can_place_calls_to(Some("4085551212"), NumberPresentation::Restricted));
        assert!(!can_place_calls_to(Some("4085551212"), NumberPresentation::Payphone));
        assert!(!can_place_calls_to(Some("-2"), NumberPresentation::Allowed));
    }

    #[test]
    fn sip_detection() {
        assert!(is_sip_number(Some("alice@example.com")));
        assert!(is_sip_number(Some("alice%40example.com")));
        assert!(is_sip_number(Some("SIP:alice")));
        assert!(!is_sip_number(Some("+14085551212")));
        assert!(!is_sip_number(None));
    }

    #[test]
    fn type_labels() {
        assert_eq!(type_label(Some(2), None).as_deref(), Some("Mobile"));
        assert_eq!(type_label(Some(0), Some("Boat")).as_deref(), Some("Boat"));
        assert_eq!(type_label(Some(0), None).as_deref(), Some("Custom"));
        assert_eq!(type_label(None, Some("Cabin")).as_deref(), Some("Cabin"));
        assert_eq!(type_label(None, None), None);
        assert_eq!(type_label(Some(99), None), None);
    }

    #[test]
    fn lookup_key_extraction() {
        assert_eq!(
            lookup_key_from_uri("content://com.android.contacts/contacts/lookup/0r1-2B/7").as_deref(),
            Some("0r1-2B")
        );
        assert_eq!(lookup_key_from_uri("content://com.android.contacts/contacts/7"), None);
    }

    #[test]
    fn call_log_uri_ids() {
        let uri = call_log_uri("content://call_log/calls/", 42);
        assert_eq!(uri.as_str(), "content://call_log/calls/42");
        assert_eq!(uri.id(), Some(42));
        assert_eq!(parse_call_log_id("content://call_log/calls"), None);
        assert_eq!(parse_call_log_id("content://call_log/calls/7?limit=1"), Some(7));
    }
}
