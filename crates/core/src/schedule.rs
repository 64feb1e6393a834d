// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron-like schedule expressions for time triggers.
//!
//! Supports the classic five fields `minute hour day-of-month month day-of-week`
//! and an optional leading `second` field. Each field accepts `*`, `N`,
//! `A-B`, `*/S`, `A-B/S`, `N/S` and comma-separated lists of those.
//! Five-field schedules fire at second zero of each matching minute.

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::fmt;
use thiserror::Error;

/// Errors in trigger configuration, rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerConfigError {
    #[error("schedule '{expr}' must have 5 or 6 fields, found {found}")]
    FieldCount { expr: String, found: usize },

    #[error("invalid {field} field '{value}' in schedule '{expr}': {reason}")]
    InvalidField {
        expr: String,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("event trigger name must not be empty")]
    EmptyEventName,
}

/// Bit set over the values of one schedule field (at most 60 values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSet(u64);

impl FieldSet {
    fn contains(self, value: u32) -> bool {
        value < 64 && self.0 & (1 << value) != 0
    }
}

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
}

const SECOND: FieldSpec = FieldSpec { name: "second", min: 0, max: 59 };
const MINUTE: FieldSpec = FieldSpec { name: "minute", min: 0, max: 59 };
const HOUR: FieldSpec = FieldSpec { name: "hour", min: 0, max: 23 };
const DAY_OF_MONTH: FieldSpec = FieldSpec { name: "day-of-month", min: 1, max: 31 };
const MONTH: FieldSpec = FieldSpec { name: "month", min: 1, max: 12 };
const DAY_OF_WEEK: FieldSpec = FieldSpec { name: "day-of-week", min: 0, max: 7 };

/// A parsed schedule. Compared structurally; the source text is kept for
/// display and serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    expr: String,
    seconds: FieldSet,
    minutes: FieldSet,
    hours: FieldSet,
    days_of_month: FieldSet,
    months: FieldSet,
    days_of_week: FieldSet,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl Schedule {
    /// Parse a schedule expression.
    pub fn parse(expr: &str) -> Result<Self, TriggerConfigError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let (second, rest) = match fields.len() {
            5 => ("0", &fields[..]),
            6 => (fields[0], &fields[1..]),
            found => {
                return Err(TriggerConfigError::FieldCount {
                    expr: expr.to_string(),
                    found,
                })
            }
        };

        let mut days_of_week = parse_field(expr, rest[4], &DAY_OF_WEEK)?;
        // 7 is an alias for Sunday
        if days_of_week.contains(7) {
            days_of_week = FieldSet((days_of_week.0 | 1) & !(1 << 7));
        }

        Ok(Self {
            expr: fields.join(" "),
            seconds: parse_field(expr, second, &SECOND)?,
            minutes: parse_field(expr, rest[0], &MINUTE)?,
            hours: parse_field(expr, rest[1], &HOUR)?,
            days_of_month: parse_field(expr, rest[2], &DAY_OF_MONTH)?,
            months: parse_field(expr, rest[3], &MONTH)?,
            days_of_week,
            dom_restricted: rest[2] != "*",
            dow_restricted: rest[4] != "*",
        })
    }

    /// The normalized source expression.
    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// Whether `time` (truncated to the second) satisfies the schedule.
    pub fn matches(&self, time: &DateTime<Utc>) -> bool {
        self.seconds.contains(time.second())
            && self.minutes.contains(time.minute())
            && self.hours.contains(time.hour())
            && self.months.contains(time.month())
            && self.matches_day(time)
    }

    fn matches_day(&self, time: &DateTime<Utc>) -> bool {
        let dom = self.days_of_month.contains(time.day());
        let dow = self
            .days_of_week
            .contains(time.weekday().num_days_from_sunday());
        if self.dom_restricted && self.dow_restricted {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// First matching second strictly after `after`, searching up to a year ahead.
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after.with_nanosecond(0)? + chrono::Duration::seconds(1);
        // Walk minute by minute, then pick the first matching second inside the minute.
        let mut minute = start.with_second(0)?;
        let horizon = start + chrono::Duration::days(366);
        while minute <= horizon {
            if self.minutes.contains(minute.minute())
                && self.hours.contains(minute.hour())
                && self.months.contains(minute.month())
                && self.matches_day(&minute)
            {
                let first = if minute < start { start.second() } else { 0 };
                if let Some(sec) = (first..60).find(|s| self.seconds.contains(*s)) {
                    return minute.with_second(sec);
                }
            }
            minute += chrono::Duration::minutes(1);
        }
        None
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

impl std::str::FromStr for Schedule {
    type Err = TriggerConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for Schedule {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.expr)
    }
}

impl<'de> serde::Deserialize<'de> for Schedule {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Schedule::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn parse_field(expr: &str, value: &str, spec: &FieldSpec) -> Result<FieldSet, TriggerConfigError> {
    let invalid = |reason: String| TriggerConfigError::InvalidField {
        expr: expr.to_string(),
        field: spec.name,
        value: value.to_string(),
        reason,
    };

    let mut set = 0u64;
    for item in value.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| invalid(format!("invalid step '{}'", step)))?;
                if step == 0 {
                    return Err(invalid("step must be positive".to_string()));
                }
                (range, Some(step))
            }
            None => (item, None),
        };

        let (lo, hi) = if range == "*" {
            (spec.min, spec.max)
        } else if let Some((a, b)) = range.split_once('-') {
            (parse_value(a, spec, &invalid)?, parse_value(b, spec, &invalid)?)
        } else {
            let n = parse_value(range, spec, &invalid)?;
            // `N/S` means "from N every S"
            (n, if step.is_some() { spec.max } else { n })
        };

        if lo > hi {
            return Err(invalid(format!("range {}-{} is reversed", lo, hi)));
        }

        for v in (lo..=hi).step_by(step.unwrap_or(1) as usize) {
            set |= 1 << v;
        }
    }
    Ok(FieldSet(set))
}

fn parse_value(
    raw: &str,
    spec: &FieldSpec,
    invalid: &dyn Fn(String) -> TriggerConfigError,
) -> Result<u32, TriggerConfigError> {
    let n: u32 = raw
        .parse()
        .map_err(|_| invalid(format!("'{}' is not a number", raw)))?;
    if n < spec.min || n > spec.max {
        return Err(invalid(format!(
            "{} is outside {}-{}",
            n, spec.min, spec.max
        )));
    }
    Ok(n)
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
