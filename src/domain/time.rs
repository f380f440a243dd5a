use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A half-open interval `[start, end)` in UTC. Adjacent slots do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if start >= end {
            return Err(AppError::InvalidSlot);
        }
        Ok(Self { start, end })
    }

    pub fn from_duration(start: DateTime<Utc>, duration: DurationMin) -> AppResult<Self> {
        Self::new(start, start + duration.to_chrono())
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration(&self) -> DurationMin {
        DurationMin((self.end - self.start).num_minutes())
    }
}

/// Parse an instant from the wire. The offset is mandatory; a naive local
/// timestamp is rejected rather than guessed at.
pub fn parse_instant(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::NaiveTime)
}

/// Whole minutes, never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DurationMin(i64);

impl DurationMin {
    pub fn new(minutes: i64) -> AppResult<Self> {
        if minutes < 0 {
            return Err(AppError::NegativeDuration);
        }
        Ok(Self(minutes))
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn minutes(self) -> i64 {
        self.0
    }

    pub fn to_chrono(self) -> chrono::Duration {
        chrono::Duration::minutes(self.0)
    }
}

impl std::ops::Add for DurationMin {
    type Output = DurationMin;

    fn add(self, rhs: DurationMin) -> DurationMin {
        DurationMin(self.0 + rhs.0)
    }
}

impl std::iter::Sum for DurationMin {
    fn sum<I: Iterator<Item = DurationMin>>(iter: I) -> Self {
        iter.fold(DurationMin::zero(), |acc, d| acc + d)
    }
}
