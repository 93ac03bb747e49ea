// ── Field-bag accessors ──
//
// Every scalar in a field bag is a string. These helpers turn them into typed
// values at the decode boundary: missing or empty fields become `None`,
// present-but-malformed fields become a `DecodeError` naming the field path.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use fritzly_api::FieldBag;
use fritzly_api::xml::TEXT_KEY;
use serde_json::Value;

use crate::error::DecodeError;

/// Text content of `key`, or `None` when absent or empty.
pub(crate) fn text<'a>(bag: &'a FieldBag, key: &str) -> Option<&'a str> {
    let raw = match bag.get(key)? {
        Value::String(s) => s.as_str(),
        Value::Object(o) => o.get(TEXT_KEY).and_then(Value::as_str)?,
        _ => return None,
    };
    let raw = raw.trim();
    (!raw.is_empty()).then_some(raw)
}

/// Text content of `key`, or `""`.
pub(crate) fn text_or_empty(bag: &FieldBag, key: &str) -> String {
    text(bag, key).unwrap_or_default().to_owned()
}

/// Parse `key` as a number.
pub(crate) fn number<T: FromStr>(
    bag: &FieldBag,
    key: &str,
    path: &str,
) -> Result<Option<T>, DecodeError> {
    text(bag, key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| DecodeError::new(join(path, key), format!("not a number: {raw:?}")))
        })
        .transpose()
}

/// Parse a `"0"`/`"1"` flag.
pub(crate) fn flag(bag: &FieldBag, key: &str, path: &str) -> Result<Option<bool>, DecodeError> {
    match text(bag, key) {
        None => Ok(None),
        Some("1") => Ok(Some(true)),
        Some("0") => Ok(Some(false)),
        Some(other) => Err(DecodeError::new(
            join(path, key),
            format!("expected 0 or 1, got {other:?}"),
        )),
    }
}

/// Parse a unix timestamp in seconds. `0` means "not set".
pub(crate) fn timestamp(
    bag: &FieldBag,
    key: &str,
    path: &str,
) -> Result<Option<DateTime<Utc>>, DecodeError> {
    Ok(number::<i64>(bag, key, path)?.and_then(epoch_to_datetime))
}

pub(crate) fn epoch_to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        None
    } else {
        DateTime::from_timestamp(secs, 0)
    }
}

/// The child element `key` as a bag.
pub(crate) fn object<'a>(bag: &'a FieldBag, key: &str) -> Option<&'a FieldBag> {
    bag.get(key).and_then(Value::as_object)
}

/// Like [`object`], but a missing child is a decode error.
pub(crate) fn require_object<'a>(
    bag: &'a FieldBag,
    key: &str,
) -> Result<&'a FieldBag, DecodeError> {
    object(bag, key).ok_or_else(|| DecodeError::missing(key))
}

pub(crate) fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bag(v: Value) -> FieldBag {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn empty_and_missing_are_none() {
        let b = bag(json!({"a": "", "b": "  "}));
        assert_eq!(text(&b, "a"), None);
        assert_eq!(text(&b, "b"), None);
        assert_eq!(text(&b, "c"), None);
        assert_eq!(number::<u8>(&b, "a", "x"), Ok(None));
    }

    #[test]
    fn malformed_numbers_name_the_field() {
        let b = bag(json!({"tsoll": "warm"}));
        let err = number::<u16>(&b, "tsoll", "hkr").expect_err("not numeric");
        assert_eq!(err.field, "hkr.tsoll");
    }

    #[test]
    fn flags_only_accept_zero_and_one() {
        let b = bag(json!({"on": "1", "off": "0", "bad": "yes"}));
        assert_eq!(flag(&b, "on", ""), Ok(Some(true)));
        assert_eq!(flag(&b, "off", ""), Ok(Some(false)));
        assert!(flag(&b, "bad", "").is_err());
    }

    #[test]
    fn zero_timestamp_is_unset() {
        let b = bag(json!({"zero": "0", "t": "1700000000"}));
        assert_eq!(timestamp(&b, "zero", ""), Ok(None));
        assert_eq!(
            timestamp(&b, "t", "").expect("valid").map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn mixed_content_text_is_read() {
        let b = bag(json!({"stats": {"-count": "3", "#text": "1,2,3"}}));
        assert_eq!(text(&b, "stats"), Some("1,2,3"));
    }
}
