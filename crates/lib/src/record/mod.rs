//! Late-arrival records and their validation rules.
//!
//! A [`LateRecord`] is the single mutation kind this crate queues: "subject S
//! was late in context C on date D, recorded by actor A". Records are validated
//! when produced, and the same rules are applied again by the remote batch
//! endpoint when they arrive over the wire.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

mod errors;

pub use errors::RecordError;

/// A calendar date in strict `YYYY-MM-DD` form.
///
/// Parsing rejects anything that is not exactly ten characters of zero-padded
/// digits separated by dashes, even if chrono would be lenient about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventDate(NaiveDate);

impl EventDate {
    /// Parse a strict `YYYY-MM-DD` string.
    pub fn parse(input: &str) -> Result<Self, RecordError> {
        let invalid = || RecordError::InvalidDate {
            input: input.to_string(),
        };

        let bytes = input.as_bytes();
        if bytes.len() != 10 {
            return Err(invalid());
        }
        for (i, b) in bytes.iter().enumerate() {
            let ok = match i {
                4 | 7 => *b == b'-',
                _ => b.is_ascii_digit(),
            };
            if !ok {
                return Err(invalid());
            }
        }

        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .map(EventDate)
            .map_err(|_| invalid())
    }

    /// The underlying chrono date.
    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for EventDate {
    fn from(date: NaiveDate) -> Self {
        EventDate(date)
    }
}

impl FromStr for EventDate {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventDate::parse(s)
    }
}

impl fmt::Display for EventDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Serialize for EventDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        EventDate::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// The tuple that identifies what a record targets, independent of any
/// locally generated identifier. Two records with the same natural key are
/// duplicates as far as the remote store is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NaturalKey {
    pub subject_id: i64,
    pub context_id: i64,
    pub event_date: EventDate,
}

/// A validated "mark late" mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LateRecord {
    /// The learner (or other entity) being marked late.
    pub subject_id: i64,
    /// Scope the mark applies to, e.g. an academic session.
    pub context_id: i64,
    /// Operator who captured the mark.
    pub actor_id: i64,
    /// Day the lateness pertains to.
    pub event_date: EventDate,
}

impl LateRecord {
    /// Build a record, rejecting non-positive identifiers.
    pub fn new(
        subject_id: i64,
        context_id: i64,
        actor_id: i64,
        event_date: EventDate,
    ) -> Result<Self, RecordError> {
        let record = Self {
            subject_id,
            context_id,
            actor_id,
            event_date,
        };
        record.validate()?;
        Ok(record)
    }

    /// Build a record from raw parts, parsing the date string as well.
    pub fn parse(
        subject_id: i64,
        context_id: i64,
        actor_id: i64,
        event_date: &str,
    ) -> Result<Self, RecordError> {
        Self::new(subject_id, context_id, actor_id, EventDate::parse(event_date)?)
    }

    /// Check the identifier invariants.
    pub fn validate(&self) -> Result<(), RecordError> {
        for (field, value) in [
            ("subjectId", self.subject_id),
            ("contextId", self.context_id),
            ("actorId", self.actor_id),
        ] {
            if value <= 0 {
                return Err(RecordError::NonPositiveId { field, value });
            }
        }
        Ok(())
    }

    /// The natural key used for duplicate detection.
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            subject_id: self.subject_id,
            context_id: self.context_id,
            event_date: self.event_date,
        }
    }

    /// Validate an untyped JSON object as it arrives over the wire.
    ///
    /// Absent or `null` fields are reported together as missing. Present ids
    /// that are not positive integers are reported as invalid ids, and the
    /// date must be a strict `YYYY-MM-DD` string.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, RecordError> {
        const FIELDS: [&str; 4] = ["subjectId", "contextId", "actorId", "eventDate"];

        let missing: Vec<&'static str> = FIELDS
            .iter()
            .copied()
            .filter(|f| value.get(f).is_none_or(|v| v.is_null()))
            .collect();
        if !missing.is_empty() {
            return Err(RecordError::MissingFields { fields: missing });
        }

        let id = |field: &'static str| -> Result<i64, RecordError> {
            match value.get(field).and_then(|v| v.as_i64()) {
                Some(n) if n > 0 => Ok(n),
                Some(n) => Err(RecordError::NonPositiveId { field, value: n }),
                None => Err(RecordError::NonPositiveId { field, value: 0 }),
            }
        };
        let subject_id = id("subjectId")?;
        let context_id = id("contextId")?;
        let actor_id = id("actorId")?;

        let event_date = match value.get("eventDate").and_then(|v| v.as_str()) {
            Some(raw) => EventDate::parse(raw)?,
            None => {
                return Err(RecordError::InvalidDate {
                    input: value["eventDate"].to_string(),
                });
            }
        };

        Ok(Self {
            subject_id,
            context_id,
            actor_id,
            event_date,
        })
    }
}
