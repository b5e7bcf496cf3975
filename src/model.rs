//! Domain types and the persisted wire schema.
//!
//! The wire form is shared with every other client of the same document
//! store, so field names and enum tokens here are load-bearing: date keys are
//! zero-padded `YYYY-MM-DD` (lexicographic order == chronological order),
//! times are zero-padded `HH:MM`, and the creation timestamp travels as
//! `recordedAt` epoch milliseconds.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Primary classification of a logged occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "success" => Some(Outcome::Success),
            "failure" => Some(Outcome::Failure),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Magnitude of the occurrence. Descriptive only; no aggregation semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    Small,
    #[default]
    Medium,
    Large,
}

impl Quantity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantity::Small => "small",
            Quantity::Medium => "medium",
            Quantity::Large => "large",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "small" => Some(Quantity::Small),
            "medium" => Some(Quantity::Medium),
            "large" => Some(Quantity::Large),
            _ => None,
        }
    }
}

/// Whether an anticipatory signal preceded the event. Reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Awareness {
    Yes,
    No,
    #[default]
    Unknown,
}

impl Awareness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Awareness::Yes => "yes",
            Awareness::No => "no",
            Awareness::Unknown => "unknown",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "yes" => Some(Awareness::Yes),
            "no" => Some(Awareness::No),
            "unknown" => Some(Awareness::Unknown),
            _ => None,
        }
    }
}

/// One recorded occurrence inside a date partition.
///
/// Older documents may predate the `quantity`/`awareness`/`note` fields, so
/// those deserialize with defaults instead of failing the whole load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Zero-padded `HH:MM`; intra-day ordering key and hour-bucket source.
    pub time: String,
    pub outcome: Outcome,
    #[serde(default)]
    pub quantity: Quantity,
    #[serde(default)]
    pub awareness: Awareness,
    #[serde(default)]
    pub note: String,
    /// Epoch milliseconds at creation; tie-breaker and report ordering key.
    #[serde(rename = "recordedAt", default)]
    pub recorded_at: u64,
}

impl Event {
    /// Checks the fields that free-form input can break. Enum fields are
    /// already constrained by their types.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_time(&self.time)
    }
}

/// Accepts exactly zero-padded 24h `HH:MM`.
pub fn validate_time(time: &str) -> Result<(), CoreError> {
    let bytes = time.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[2] == b':'
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[3].is_ascii_digit()
        && bytes[4].is_ascii_digit();
    if !well_formed {
        return Err(CoreError::InvalidInput {
            reason: format!("time '{}' is not zero-padded HH:MM", time),
        });
    }
    let hh = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
    let mm = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
    if hh > 23 || mm > 59 {
        return Err(CoreError::InvalidInput {
            reason: format!("time '{}' is out of the 00:00..23:59 range", time),
        });
    }
    Ok(())
}

/// Hour bucket of a wire time string. Malformed times yield `None` and the
/// caller skips the event rather than failing an aggregation.
pub fn hour_of(time: &str) -> Option<u32> {
    let hh: u32 = time.get(..2)?.parse().ok()?;
    if hh < 24 && time.as_bytes().get(2) == Some(&b':') {
        Some(hh)
    } else {
        None
    }
}

/// Parses a `YYYY-MM-DD` date key from user input.
pub fn parse_date_key(key: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").map_err(|_| CoreError::InvalidInput {
        reason: format!("date '{}' is not YYYY-MM-DD", key),
    })
}

// =============================================================================
// Error taxonomy
// =============================================================================

/// Domain errors. Remote and malformed-data conditions are recovered where
/// they arise and only ever reach logs; out-of-range and invalid-input reach
/// callers.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Update or delete referenced a date+index that no longer exists.
    OutOfRange {
        date: NaiveDate,
        index: usize,
        len: usize,
    },
    /// The remote persistence provider could not be reached or refused.
    RemoteUnavailable { detail: String },
    /// A locally persisted document failed to parse into the schema.
    MalformedPersistedData { doc: String, detail: String },
    /// A submission failed validation; nothing was mutated.
    InvalidInput { reason: String },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::OutOfRange { date, index, len } => {
                write!(f, "index {} out of range for {} ({} entries)", index, date, len)
            }
            CoreError::RemoteUnavailable { detail } => {
                write!(f, "remote store unavailable: {}", detail)
            }
            CoreError::MalformedPersistedData { doc, detail } => {
                write!(f, "persisted document '{}' failed to parse: {}", doc, detail)
            }
            CoreError::InvalidInput { reason } => write!(f, "invalid input: {}", reason),
        }
    }
}

impl std::error::Error for CoreError {}
