//! Next-fire computation for alarm repeat rules.
//!
//! [`next_fire_time`] is a pure function of a [`RecurrenceRule`], a time of
//! day and the current instant. It never fails for a well-formed rule:
//! a non-empty day set always matches within seven days.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone};

use crate::types::{AlarmRecord, RepeatMode, WeekdaySet};

/// Upper bound of the day-by-day search for recurring rules.
const MAX_DAY_PROBES: usize = 7;

/// Repeat rule of an alarm, detached from the rest of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecurrenceRule {
    /// Repeat policy
    pub mode: RepeatMode,
    /// Days for the recurring policies
    pub days: WeekdaySet,
    /// Epoch milliseconds of the chosen date
    pub specific_date: Option<i64>,
}

impl RecurrenceRule {
    /// A rule that fires at the next occurrence of the time of day.
    pub fn once() -> Self {
        Self::default()
    }

    /// A rule that repeats on the given days.
    pub fn custom(days: WeekdaySet) -> Self {
        Self {
            mode: RepeatMode::Custom,
            days,
            specific_date: None,
        }
    }

    /// A rule bound to the calendar day of `millis`.
    pub fn on_date(millis: i64) -> Self {
        Self {
            mode: RepeatMode::SpecificDate,
            days: WeekdaySet::empty(),
            specific_date: Some(millis),
        }
    }
}

impl From<&AlarmRecord> for RecurrenceRule {
    fn from(alarm: &AlarmRecord) -> Self {
        Self {
            mode: alarm.repeat_mode,
            days: alarm.repeat_days,
            specific_date: alarm.specific_date,
        }
    }
}

/// Computes the next instant an alarm should fire.
///
/// - `SpecificDate` with a stored date: that calendar day at `hour:minute:00`,
///   returned as-is even when it lies in the past.
/// - `Once`, or an empty day set: today at `hour:minute:00`, moved to tomorrow
///   if that is not after `now`.
/// - Otherwise the same candidate is advanced day by day until its weekday is
///   in the day set.
///
/// Calendar arithmetic happens in the time zone of `now`.
pub fn next_fire_time<Tz: TimeZone>(
    rule: &RecurrenceRule,
    hour: u32,
    minute: u32,
    now: &DateTime<Tz>,
) -> DateTime<Tz> {
    let tz = now.timezone();
    let time = NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0).unwrap_or(NaiveTime::MIN);

    if rule.mode == RepeatMode::SpecificDate {
        if let Some(day) = rule
            .specific_date
            .and_then(|millis| tz.timestamp_millis_opt(millis).single())
        {
            return at_local(&tz, day.date_naive(), time);
        }
    }

    let mut date = now.date_naive();
    if at_local(&tz, date, time) <= *now {
        date = next_day(date);
    }

    if rule.mode != RepeatMode::Once && !rule.days.is_empty() {
        for _ in 0..MAX_DAY_PROBES {
            if rule.days.contains(date.weekday()) {
                break;
            }
            date = next_day(date);
        }
    }

    at_local(&tz, date, time)
}

/// Next fire time of a stored alarm.
pub fn next_fire_for<Tz: TimeZone>(alarm: &AlarmRecord, now: &DateTime<Tz>) -> DateTime<Tz> {
    next_fire_time(&RecurrenceRule::from(alarm), alarm.hour, alarm.minute, now)
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

/// Maps a wall-clock date and time to an instant in `tz`.
///
/// Ambiguous times (clocks going back) take the earlier instant; times inside
/// a gap (clocks going forward) are pushed one hour later.
fn at_local<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    let naive = date.and_time(time);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

// ============================================================================
// Tests
// ============================================================================
