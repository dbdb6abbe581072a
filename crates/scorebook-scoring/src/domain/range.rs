//! Key range parsing and selection.
//!
//! Ranges are compared by `over * 10 + ball`. The ball bound of 6 is
//! enforced while parsing each key, so ordinals never collide across overs.

use scorebook_core::delivery::{DeliveryKey, EventRecord};
use scorebook_core::error::{DomainError, FieldViolation};
use scorebook_core::undo::KeyRange;

/// Parses and validates an inclusive `from..=to` key range.
///
/// # Errors
///
/// Returns `DomainError::Validation` naming `fromKey`, `toKey`, or `range`
/// when a key is malformed, a ball is outside `1..=6`, or the bounds are
/// reversed.
pub fn parse_range(from_key: &str, to_key: &str) -> Result<KeyRange, DomainError> {
    let from = from_key.trim().parse::<DeliveryKey>();
    let to = to_key.trim().parse::<DeliveryKey>();

    match (from, to) {
        (Ok(from_key), Ok(to_key)) => {
            if from_key.ordinal() > to_key.ordinal() {
                return Err(DomainError::invalid(
                    "range",
                    format!("fromKey {from_key} must not come after toKey {to_key}"),
                ));
            }
            Ok(KeyRange { from_key, to_key })
        }
        (from, to) => {
            let mut violations = Vec::new();
            if let Err(e) = from {
                violations.push(FieldViolation::new("fromKey", e.to_string()));
            }
            if let Err(e) = to {
                violations.push(FieldViolation::new("toKey", e.to_string()));
            }
            Err(DomainError::Validation(violations))
        }
    }
}

/// Keeps the active, non-tombstoned records whose key falls in `range`,
/// preserving their `(over, ball)` order.
#[must_use]
pub fn select_range(active: Vec<EventRecord>, range: &KeyRange) -> Vec<EventRecord> {
    active
        .into_iter()
        .filter(|record| !record.is_tombstoned() && range.contains(record.key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(err: DomainError) -> Vec<String> {
        match err {
            DomainError::Validation(violations) => {
                violations.into_iter().map(|v| v.field).collect()
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_range_accepts_single_key() {
        let range = parse_range("3.4", "3.4").unwrap();

        assert_eq!(range.from_key, range.to_key);
    }

    #[test]
    fn test_parse_range_rejects_reversed_bounds() {
        assert_eq!(fields(parse_range("2.1", "1.6").unwrap_err()), ["range"]);
    }

    #[test]
    fn test_parse_range_reports_both_bad_keys() {
        assert_eq!(
            fields(parse_range("1.9", "abc").unwrap_err()),
            ["fromKey", "toKey"]
        );
    }

    #[test]
    fn test_parse_range_rejects_ball_zero() {
        assert_eq!(fields(parse_range("1.1", "2.0").unwrap_err()), ["toKey"]);
    }
}
