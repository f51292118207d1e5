//! Utilities for our logging (tracing) infrastructure.

use std::fmt::Debug;
use tracing::{warn, Span};

use crate::constants::MAX_LOG_STRING_LENGTH;

/// For the current active span, record `field_value` for the field
/// `field_name`. The field must already be declared on the current span, for
/// example through `#[instrument(fields(url))]`.
///
/// All events emitted inside the span carry the recorded value:
/// ```text
///   2023-03-14T10:12:40.217Z  INFO fabric_ca_client::api::enroll: Starting enroll protocol.
///     in fabric_ca_client::api::enroll with user: "admin", url: "https://ca.org1:7054/api/v1/enroll"
/// ```
///
/// In debug builds this function warns when the field has NOT been declared.
pub fn record_field(field_name: &str, field_value: &dyn Debug) {
    if cfg!(debug_assertions) && !Span::current().has_field(field_name) {
        warn!("Field {} not defined in current span!", field_name);
    }

    // Ignore the resulting span.
    let _ = Span::current().record(field_name, &format!("{field_value:?}"));
}

/// Render a string that may contain arbitrary bytes so it is safe to log.
///
/// Non-printable characters become `?` and the output is capped at
/// [`MAX_LOG_STRING_LENGTH`] characters followed by `...`.
pub fn log_string(value: &str) -> String {
    let mut rendered: String = value
        .chars()
        .take(MAX_LOG_STRING_LENGTH)
        .map(|c| if c.is_control() { '?' } else { c })
        .collect();

    if value.chars().count() > MAX_LOG_STRING_LENGTH {
        rendered.push_str("...");
    }
    rendered
}

/// Hex rendering of optional bytes, `"null"` when absent or empty.
pub fn hex_or_null(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        "null".to_string()
    } else {
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_string_replaces_control_characters() {
        assert_eq!(log_string("tx\n\u{0}id"), "tx??id");
    }

    #[test]
    fn log_string_truncates_long_input() {
        let long = "a".repeat(MAX_LOG_STRING_LENGTH + 10);
        let rendered = log_string(&long);
        assert!(rendered.ends_with("..."));
        assert_eq!(rendered.len(), MAX_LOG_STRING_LENGTH + 3);
    }

    #[test]
    fn hex_or_null_handles_empty() {
        assert_eq!(hex_or_null(&[]), "null");
        assert_eq!(hex_or_null(&[0xab, 0x01]), "ab01");
    }
}
