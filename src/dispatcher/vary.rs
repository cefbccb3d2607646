//! `Vary` header field-list merging.
//!
//! A response may vary on several request headers contributed by different
//! layers. Merging is append-only: existing fields are kept in order, new
//! fields are added once (compared case-insensitively), and `*` absorbs
//! everything.

/// Split a `Vary` value into its trimmed, non-empty field names
pub fn parse(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|f| !f.is_empty())
}

/// Append `fields` to an existing `Vary` value and return the merged value
///
/// ```rust
/// use brrtrouter_cors::dispatcher::vary;
///
/// assert_eq!(vary::append("Accept-Encoding", "Origin"), "Accept-Encoding, Origin");
/// assert_eq!(vary::append("Accept-Encoding, origin", "Origin"), "Accept-Encoding, origin");
/// assert_eq!(vary::append("", "*"), "*");
/// assert_eq!(vary::append("Accept, *", "Origin"), "*");
/// ```
#[must_use]
pub fn append(existing: &str, fields: &str) -> String {
    if parse(existing).any(|f| f == "*") || parse(fields).any(|f| f == "*") {
        return "*".to_string();
    }

    let mut merged = existing.trim().to_string();
    let mut seen: Vec<String> = parse(existing).map(str::to_ascii_lowercase).collect();

    for field in parse(fields) {
        let lower = field.to_ascii_lowercase();
        if seen.contains(&lower) {
            continue;
        }
        if !merged.is_empty() {
            merged.push_str(", ");
        }
        merged.push_str(field);
        seen.push(lower);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_to_empty() {
        assert_eq!(append("", "Origin"), "Origin");
    }

    #[test]
    fn test_append_multiple_fields_deduplicated() {
        assert_eq!(
            append("Origin", "Access-Control-Request-Headers, origin"),
            "Origin, Access-Control-Request-Headers"
        );
    }

    #[test]
    fn test_wildcard_wins() {
        assert_eq!(append("*", "Origin"), "*");
        assert_eq!(append("Origin", "Accept, *"), "*");
        assert_eq!(append("Accept, *", "Origin"), "*");
    }

    #[test]
    fn test_empty_fields_leave_existing_value() {
        assert_eq!(append("Accept-Encoding", " , "), "Accept-Encoding");
        assert_eq!(append("", ""), "");
    }
}
