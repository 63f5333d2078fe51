//! Daily fixed-time sync triggers.
//!
//! A [`SyncSchedule`] is configuration: the wall-clock times at which a sync
//! should run each day. A [`ScheduleTicker`] is the state the background loop
//! keeps to decide, once per tick, whether one of those times has been
//! reached since the previous tick.

use std::fmt;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::ConfigError;
use crate::constants::DEFAULT_SYNC_TIMES;

/// Wall-clock times at which a sync runs every day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSchedule {
    times: Vec<NaiveTime>,
}

impl SyncSchedule {
    /// Build a schedule, truncating times to the minute and dropping repeats.
    pub fn new(times: impl IntoIterator<Item = NaiveTime>) -> Self {
        let mut times: Vec<NaiveTime> = times
            .into_iter()
            .filter_map(|t| NaiveTime::from_hms_opt(t.hour(), t.minute(), 0))
            .collect();
        times.sort();
        times.dedup();
        Self { times }
    }

    /// A schedule that never fires.
    pub fn disabled() -> Self {
        Self { times: Vec::new() }
    }

    /// Parse a comma-separated list of `HH:MM` times, e.g. `"07:30,16:00"`.
    /// An empty string disables the schedule.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let times = input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_time)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(times))
    }

    /// Configured times in ascending order.
    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }

    /// Whether no times are configured.
    pub fn is_disabled(&self) -> bool {
        self.times.is_empty()
    }
}

impl Default for SyncSchedule {
    fn default() -> Self {
        Self::parse(DEFAULT_SYNC_TIMES).unwrap_or_else(|_| Self::disabled())
    }
}

impl fmt::Display for SyncSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self
            .times
            .iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect();
        f.write_str(&joined.join(","))
    }
}

impl Serialize for SyncSchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.times.iter().map(|t| t.format("%H:%M").to_string()))
    }
}

impl<'de> Deserialize<'de> for SyncSchedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        let times = raw
            .iter()
            .map(|s| parse_time(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(serde::de::Error::custom)?;
        Ok(Self::new(times))
    }
}

fn parse_time(input: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(input, "%H:%M").map_err(|_| ConfigError::InvalidTime {
        input: input.to_string(),
    })
}

/// Tracks which scheduled times have already been acted on.
///
/// [`check`](ScheduleTicker::check) fires when a configured time falls in
/// `(previous check, now]`, so a tick that arrives late or skips a minute
/// still fires exactly once.
#[derive(Debug, Clone)]
pub struct ScheduleTicker {
    schedule: SyncSchedule,
    last_checked: Option<NaiveDateTime>,
}

impl ScheduleTicker {
    pub fn new(schedule: SyncSchedule) -> Self {
        Self {
            schedule,
            last_checked: None,
        }
    }

    /// The schedule being tracked.
    pub fn schedule(&self) -> &SyncSchedule {
        &self.schedule
    }

    /// Compare `now` against the schedule and report whether a sync is due.
    pub fn check(&mut self, now: NaiveDateTime) -> bool {
        let due = match self.last_checked {
            // First observation: only the current minute counts.
            None => self
                .schedule
                .times
                .iter()
                .any(|t| t.hour() == now.hour() && t.minute() == now.minute()),
            // Wall clock moved backwards; wait for it to catch up.
            Some(prev) if now <= prev => false,
            Some(prev) => prev
                .date()
                .iter_days()
                .take_while(|date| *date <= now.date())
                .any(|date| {
                    self.schedule.times.iter().any(|t| {
                        let occurrence = date.and_time(*t);
                        occurrence > prev && occurrence <= now
                    })
                }),
        };
        self.last_checked = Some(self.last_checked.map_or(now, |prev| prev.max(now)));
        if due {
            tracing::debug!(%now, "Scheduled sync due");
        }
        due
    }
}
