//! As-of date normalization and validation
//!
//! Date-only input means the end of that UTC day. Timestamps keep their
//! wall-clock numbers and are relabelled as UTC; any offset is discarded.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::DatePolicy;
use crate::error::{CladetimeError, CladetimeResult};

/// A caller-supplied snapshot date, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum AsOf {
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl From<&str> for AsOf {
    fn from(s: &str) -> Self {
        AsOf::Text(s.to_string())
    }
}

impl From<String> for AsOf {
    fn from(s: String) -> Self {
        AsOf::Text(s)
    }
}

impl From<NaiveDate> for AsOf {
    fn from(d: NaiveDate) -> Self {
        AsOf::Date(d)
    }
}

impl From<NaiveDateTime> for AsOf {
    fn from(dt: NaiveDateTime) -> Self {
        AsOf::Timestamp(dt)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for AsOf {
    fn from(dt: DateTime<Tz>) -> Self {
        AsOf::Timestamp(dt.naive_local())
    }
}

impl fmt::Display for AsOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsOf::Text(s) => write!(f, "{}", s),
            AsOf::Date(d) => write!(f, "{}", d),
            AsOf::Timestamp(dt) => write!(f, "{}", dt),
        }
    }
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let eod = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    date.and_time(eod).and_utc()
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn parse_text(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(end_of_day(date));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local().and_utc());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc())
}

/// Normalize an as-of value to a whole-second UTC timestamp
pub fn normalize_as_of(input: &AsOf) -> Option<DateTime<Utc>> {
    let parsed = match input {
        AsOf::Text(s) => parse_text(s)?,
        AsOf::Date(d) => end_of_day(*d),
        AsOf::Timestamp(dt) => dt.and_utc(),
    };
    Some(parsed.trunc_subsecs(0))
}

/// Which of the two snapshot dates a warning or error concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    SequenceAsOf,
    TreeAsOf,
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateField::SequenceAsOf => write!(f, "sequence_as_of"),
            DateField::TreeAsOf => write!(f, "tree_as_of"),
        }
    }
}

/// Non-fatal adjustments made while validating as-of dates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateWarning {
    Unparseable {
        field: DateField,
        input: String,
        substituted: DateTime<Utc>,
    },
    FutureClamped {
        field: DateField,
        requested: DateTime<Utc>,
        clamped_to: DateTime<Utc>,
    },
    DefaultBelowFloor {
        field: DateField,
        requested: DateTime<Utc>,
        floor: DateTime<Utc>,
        substituted: DateTime<Utc>,
    },
}

impl fmt::Display for DateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateWarning::Unparseable { field, input, substituted } => write!(
                f,
                "{} could not be parsed from {:?}; using {}",
                field, input, substituted
            ),
            DateWarning::FutureClamped { field, requested, clamped_to } => write!(
                f,
                "{} {} is in the future; using {}",
                field, requested, clamped_to
            ),
            DateWarning::DefaultBelowFloor { field, requested, floor, substituted } => write!(
                f,
                "defaulted {} {} precedes {}; using {}",
                field, requested, floor, substituted
            ),
        }
    }
}

/// Floor and policy applied to one snapshot date
#[derive(Debug, Clone)]
pub struct DateRule {
    pub field: DateField,
    pub floor: DateTime<Utc>,
    pub reason: String,
    pub policy: DatePolicy,
}

impl DateRule {
    pub fn new(field: DateField, floor: DateTime<Utc>, reason: impl Into<String>, policy: DatePolicy) -> Self {
        Self {
            field,
            floor,
            reason: reason.into(),
            policy,
        }
    }

    /// Parse, floor-check and clamp one date. `None` means "now".
    pub fn apply(
        &self,
        input: Option<&AsOf>,
        now: DateTime<Utc>,
        warnings: &mut Vec<DateWarning>,
    ) -> CladetimeResult<DateTime<Utc>> {
        let now = now.trunc_subsecs(0);
        let date = match input {
            None => now,
            Some(raw) => match normalize_as_of(raw) {
                Some(date) => date,
                None => match self.policy {
                    DatePolicy::Strict => {
                        return Err(CladetimeError::InvalidDate(format!(
                            "{}: cannot parse {:?}; expected YYYY-MM-DD or a timestamp",
                            self.field,
                            raw.to_string()
                        )))
                    }
                    DatePolicy::Lenient => {
                        let warning = DateWarning::Unparseable {
                            field: self.field,
                            input: raw.to_string(),
                            substituted: now,
                        };
                        tracing::warn!(field = %self.field, input = %raw, "{}", warning);
                        warnings.push(warning);
                        now
                    }
                },
            },
        };

        self.check(date, now, warnings)
    }

    /// Floor check then future clamp on an already normalized date
    pub fn check(
        &self,
        date: DateTime<Utc>,
        now: DateTime<Utc>,
        warnings: &mut Vec<DateWarning>,
    ) -> CladetimeResult<DateTime<Utc>> {
        if date < self.floor {
            return Err(CladetimeError::DateUnavailable {
                date,
                floor: self.floor,
                reason: self.reason.clone(),
            });
        }

        if date > now {
            let warning = DateWarning::FutureClamped {
                field: self.field,
                requested: date,
                clamped_to: now,
            };
            tracing::warn!(field = %self.field, requested = %date, "{}", warning);
            warnings.push(warning);
            return Ok(now);
        }

        Ok(date)
    }
}
