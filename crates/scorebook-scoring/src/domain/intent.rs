//! Delivery intents and their validation.

use serde::Deserialize;

use scorebook_core::delivery::{DEFAULT_MATCH_ID, DeliveryKey, MAX_BALL, MAX_RUNS};
use scorebook_core::error::{DomainError, FieldViolation};

/// Attribution used when an intent does not say who entered it.
pub const DEFAULT_ENTERED_BY: &str = "anonymous";

/// A request to record (or correct) one delivery, as received from the
/// boundary. Numeric fields are wide so that out-of-range input reaches
/// validation instead of failing to parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryIntent {
    /// Match partition; blank or missing means [`DEFAULT_MATCH_ID`].
    #[serde(default)]
    pub match_id: Option<String>,
    /// Over number, must be >= 1.
    pub over: i64,
    /// Ball number, must be within `1..=6`.
    pub ball: i64,
    /// Runs scored, must be within `0..=6`.
    pub runs: i64,
    /// Whether a wicket fell.
    #[serde(default)]
    pub wicket: bool,
    /// Free-text attribution.
    #[serde(default)]
    pub entered_by: Option<String>,
}

/// A delivery intent that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDelivery {
    /// Resolved match partition.
    pub match_id: String,
    /// Delivery identity.
    pub key: DeliveryKey,
    /// Runs scored.
    pub runs: u8,
    /// Whether a wicket fell.
    pub wicket: bool,
    /// Resolved attribution.
    pub entered_by: String,
}

/// Resolves a possibly-blank match identifier to its partition.
#[must_use]
pub fn resolve_match_id(match_id: Option<&str>) -> String {
    match match_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_owned(),
        _ => DEFAULT_MATCH_ID.to_owned(),
    }
}

impl DeliveryIntent {
    /// Checks every field and reports all violations at once.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` naming each offending field.
    pub fn validate(&self) -> Result<ValidDelivery, DomainError> {
        let mut violations = Vec::new();

        let over = u32::try_from(self.over).ok().filter(|over| *over >= 1);
        if over.is_none() {
            violations.push(FieldViolation::new(
                "over",
                format!("must be a positive integer, got {}", self.over),
            ));
        }

        let ball = u8::try_from(self.ball)
            .ok()
            .filter(|ball| (1..=MAX_BALL).contains(ball));
        if ball.is_none() {
            violations.push(FieldViolation::new(
                "ball",
                format!("must be between 1 and {MAX_BALL}, got {}", self.ball),
            ));
        }

        let runs = u8::try_from(self.runs)
            .ok()
            .filter(|runs| *runs <= MAX_RUNS);
        if runs.is_none() {
            violations.push(FieldViolation::new(
                "runs",
                format!("must be between 0 and {MAX_RUNS}, got {}", self.runs),
            ));
        }

        let (Some(over), Some(ball), Some(runs)) = (over, ball, runs) else {
            return Err(DomainError::Validation(violations));
        };
        let key = DeliveryKey::new(over, ball)
            .map_err(|e| DomainError::invalid("key", e.to_string()))?;

        let entered_by = match self.entered_by.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => DEFAULT_ENTERED_BY.to_owned(),
        };

        Ok(ValidDelivery {
            match_id: resolve_match_id(self.match_id.as_deref()),
            key,
            runs,
            wicket: self.wicket,
            entered_by,
        })
    }
}
