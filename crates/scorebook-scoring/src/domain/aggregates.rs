//! Read models folded from the active records of a match.
//!
//! Both projections are rebuilt from a full replay on every read. Nothing
//! here is persisted or cached.

use chrono::{DateTime, Utc};
use serde::Serialize;

use scorebook_core::delivery::{DeliveryKey, EventRecord};
use scorebook_core::projection::Projection;

/// Scoring values of the last delivery folded into a [`ScoreState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    /// The delivery key.
    pub key: DeliveryKey,
    /// Runs scored.
    pub runs: u8,
    /// Whether a wicket fell.
    pub wicket: bool,
}

/// The current score of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreState {
    /// The match this score belongs to.
    pub match_id: String,
    /// Sum of runs over visible deliveries.
    pub total_runs: u32,
    /// Count of visible deliveries with a wicket.
    pub total_wickets: u32,
    /// Count of visible deliveries.
    pub balls_faced: u32,
    /// Over of the last delivery in `(over, ball)` order; 0 when empty.
    pub current_over: u32,
    /// Ball of the last delivery in `(over, ball)` order; 0 when empty.
    pub current_ball: u8,
    /// `"{current_over}.{current_ball}"`.
    pub over_display: String,
    /// The last delivery in `(over, ball)` order.
    pub last_active_event: Option<DeliveryOutcome>,
    /// When this state was computed.
    pub computed_at: DateTime<Utc>,
}

impl ScoreState {
    /// The score of a match with no visible deliveries.
    #[must_use]
    pub fn empty(match_id: impl Into<String>, computed_at: DateTime<Utc>) -> Self {
        Self {
            match_id: match_id.into(),
            total_runs: 0,
            total_wickets: 0,
            balls_faced: 0,
            current_over: 0,
            current_ball: 0,
            over_display: "0.0".to_owned(),
            last_active_event: None,
            computed_at,
        }
    }
}

impl Projection for ScoreState {
    fn apply(&mut self, record: &EventRecord) {
        self.total_runs += u32::from(record.runs);
        if record.wicket {
            self.total_wickets += 1;
        }
        self.balls_faced += 1;
        self.current_over = record.over;
        self.current_ball = record.ball;
        self.over_display = record.key.to_string();
        self.last_active_event = Some(DeliveryOutcome {
            key: record.key,
            runs: record.runs,
            wicket: record.wicket,
        });
    }
}

/// Per-over totals inside [`DetailedStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverSummary {
    /// The over number.
    pub over: u32,
    /// Runs scored in the over.
    pub runs: u32,
    /// Wickets fallen in the over.
    pub wickets: u32,
    /// Visible deliveries in the over.
    pub balls: u32,
}

/// Secondary statistics derived from the same replay as [`ScoreState`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedStats {
    /// The match these statistics belong to.
    pub match_id: String,
    /// Over-by-over breakdown, ascending.
    pub overs: Vec<OverSummary>,
    /// Deliveries scoring exactly four.
    pub fours: u32,
    /// Deliveries scoring exactly six.
    pub sixes: u32,
    /// Deliveries scoring nothing.
    pub dot_balls: u32,
    /// Sum of runs.
    pub total_runs: u32,
    /// Count of wickets.
    pub total_wickets: u32,
    /// Count of visible deliveries.
    pub balls_faced: u32,
}

impl DetailedStats {
    /// Statistics for a match with no visible deliveries.
    #[must_use]
    pub fn empty(match_id: impl Into<String>) -> Self {
        Self {
            match_id: match_id.into(),
            overs: Vec::new(),
            fours: 0,
            sixes: 0,
            dot_balls: 0,
            total_runs: 0,
            total_wickets: 0,
            balls_faced: 0,
        }
    }

    /// Runs per six-ball over, rounded to two decimals; 0 before any ball.
    #[must_use]
    pub fn run_rate(&self) -> f64 {
        if self.balls_faced == 0 {
            return 0.0;
        }
        let rate = f64::from(self.total_runs) * 6.0 / f64::from(self.balls_faced);
        (rate * 100.0).round() / 100.0
    }
}

impl Projection for DetailedStats {
    fn apply(&mut self, record: &EventRecord) {
        // Records arrive in (over, ball) order, so a new over is always last.
        if self.overs.last().is_none_or(|s| s.over != record.over) {
            self.overs.push(OverSummary {
                over: record.over,
                runs: 0,
                wickets: 0,
                balls: 0,
            });
        }
        let Some(over) = self.overs.last_mut() else {
            return;
        };
        over.runs += u32::from(record.runs);
        over.balls += 1;
        if record.wicket {
            over.wickets += 1;
            self.total_wickets += 1;
        }

        match record.runs {
            0 => self.dot_balls += 1,
            4 => self.fours += 1,
            6 => self.sixes += 1,
            _ => {}
        }
        self.total_runs += u32::from(record.runs);
        self.balls_faced += 1;
    }
}
