//! Employee feedback directory models.
//!
//! The feedback collection doubles as the employee roster: each record is a
//! row in the employee list and a data point in the dashboard score chart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One employee feedback record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Record id; also the employee identifier used by selection.
    pub id: String,
    /// Employee display name.
    pub employee_name: String,
    /// Feedback score, 1 through 5.
    #[serde(default)]
    pub score: Option<u8>,
    /// Free-form feedback notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Server-assigned submission time.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// High-level events the employee list and dashboard consume.
///
/// Consumers start in a loading state; the first `RosterUpdated` ends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RosterEvent {
    /// The roster changed; replaces the rendered list wholesale.
    RosterUpdated {
        records: Vec<FeedbackRecord>,
    },
    /// A feedback record arrived after the initial load.
    NewFeedback,
}

/// One slice of the dashboard score chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBucket {
    /// Star score, 1 through 5.
    pub score: u8,
    /// Share of records with this score, percent with one decimal place.
    pub percent: f64,
}

/// Aggregates feedback records into the five 1-5 star buckets.
///
/// Percentages are taken over the full record count; records without a
/// score count towards the total but land in no bucket. An empty input
/// yields five zero buckets.
pub fn score_distribution(records: &[FeedbackRecord]) -> Vec<ScoreBucket> {
    (1..=5u8)
        .map(|score| {
            let percent = if records.is_empty() {
                0.0
            } else {
                let matching = records
                    .iter()
                    .filter(|record| record.score == Some(score))
                    .count();
                let raw = matching as f64 / records.len() as f64 * 100.0;
                (raw * 10.0).round() / 10.0
            };
            ScoreBucket { score, percent }
        })
        .collect()
}
