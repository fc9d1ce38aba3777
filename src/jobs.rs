//! Job boundary — the canonical job record plus the tolerant queue decoder.
//!
//! Queue payloads arrive in three historical shapes: a JSON object, a bare
//! identifier string, or a bare number. All of them are normalised here into
//! one [`Job`] so the rest of the pipeline never sees that leniency.

use serde_json::Value;

use crate::core::error::AppError;

/// One unit of work popped from the queue. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Normalised 10–12 digit identifier.
    pub inn: String,
    /// Caller to relay the result to, when present.
    pub chat_id: Option<i64>,
    /// Bypass the cache and query the responder directly.
    pub force: bool,
}

/// Decode a raw queue payload into a [`Job`].
///
/// Accepts a JSON object (`inn` as string or number, `force` as
/// bool / `"1"` / `"true"` / `1`, `chat_id` as number or numeric string) or a
/// bare identifier payload. Fails only when the identifier does not
/// normalise to 10–12 digits.
pub fn decode(payload: &str) -> Result<Job, AppError> {
    let value: Value =
        serde_json::from_str(payload).unwrap_or_else(|_| Value::String(payload.to_string()));

    match value {
        Value::Object(map) => {
            let inn_raw = match map.get("inn") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => String::new(),
            };
            let inn = normalize_inn(&inn_raw)?;

            let chat_id = match map.get("chat_id") {
                Some(Value::Number(n)) => n.as_i64(),
                Some(Value::String(s)) => s.parse().ok(),
                _ => None,
            };

            let force = match map.get("force") {
                Some(Value::Bool(b)) => *b,
                Some(Value::String(s)) => matches!(s.as_str(), "1" | "true" | "True"),
                Some(Value::Number(n)) => n.as_i64() == Some(1),
                _ => false,
            };

            Ok(Job { inn, chat_id, force })
        }
        Value::String(s) => Ok(Job {
            inn: normalize_inn(&s)?,
            chat_id: None,
            force: false,
        }),
        Value::Number(n) => Ok(Job {
            inn: normalize_inn(&n.to_string())?,
            chat_id: None,
            force: false,
        }),
        other => Err(AppError::InvalidInn(other.to_string())),
    }
}

/// Strip non-digit characters and require 10–12 digits.
pub fn normalize_inn(raw: &str) -> Result<String, AppError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if (10..=12).contains(&digits.len()) {
        Ok(digits)
    } else {
        Err(AppError::InvalidInn(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_payload() {
        let job = decode(r#"{"inn": "7712345678", "chat_id": 100500, "force": true}"#).unwrap();
        assert_eq!(
            job,
            Job {
                inn: "7712345678".into(),
                chat_id: Some(100500),
                force: true,
            }
        );
    }

    #[test]
    fn numeric_inn_and_string_chat_id() {
        let job = decode(r#"{"inn": 7712345678, "chat_id": "42"}"#).unwrap();
        assert_eq!(job.inn, "7712345678");
        assert_eq!(job.chat_id, Some(42));
        assert!(!job.force);
    }

    #[test]
    fn force_truthiness_variants() {
        for payload in [
            r#"{"inn": "7712345678", "force": "1"}"#,
            r#"{"inn": "7712345678", "force": "true"}"#,
            r#"{"inn": "7712345678", "force": "True"}"#,
            r#"{"inn": "7712345678", "force": 1}"#,
            r#"{"inn": "7712345678", "force": true}"#,
        ] {
            assert!(decode(payload).unwrap().force, "payload: {payload}");
        }
        for payload in [
            r#"{"inn": "7712345678", "force": "0"}"#,
            r#"{"inn": "7712345678", "force": 0}"#,
            r#"{"inn": "7712345678", "force": false}"#,
            r#"{"inn": "7712345678"}"#,
        ] {
            assert!(!decode(payload).unwrap().force, "payload: {payload}");
        }
    }

    #[test]
    fn bare_string_payload() {
        let job = decode("7712345678").unwrap();
        assert_eq!(job.inn, "7712345678");
        assert_eq!(job.chat_id, None);
        assert!(!job.force);
    }

    #[test]
    fn formatted_identifier_is_normalised() {
        let job = decode(r#"{"inn": "77-123 456 78"}"#).unwrap();
        assert_eq!(job.inn, "7712345678");
    }

    #[test]
    fn non_json_string_payload() {
        // Not valid JSON at all — still treated as a bare identifier.
        let job = decode("  77 1234 5678 ").unwrap();
        assert_eq!(job.inn, "7712345678");
    }

    #[test]
    fn invalid_identifier_rejected() {
        assert!(matches!(decode("abc"), Err(AppError::InvalidInn(_))));
        assert!(matches!(decode("123"), Err(AppError::InvalidInn(_))));
        assert!(matches!(
            decode(r#"{"inn": "1234567890123"}"#),
            Err(AppError::InvalidInn(_))
        ));
        assert!(matches!(decode(r#"{"chat_id": 1}"#), Err(AppError::InvalidInn(_))));
    }

    #[test]
    fn twelve_digit_identifier_accepted() {
        assert_eq!(decode("123456789012").unwrap().inn, "123456789012");
    }
}
