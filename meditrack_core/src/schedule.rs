//! Weekly dosing schedule formatting.
//!
//! A schedule is an unordered list of (day, time) slots. For display the
//! slots are grouped by time of day, each group's days are put in
//! Monday-first order, and a group covering the whole week collapses
//! to "Daily":
//!
//! ```text
//! MONDAY 08:00, FRIDAY 08:00, WEDNESDAY 08:00  ->  "Mon, Wed, Fri at 08:00"
//! every day at 21:00                           ->  "Daily at 21:00"
//! ```
//!
//! Groups are emitted in ascending time-of-day order, so the output does
//! not depend on the order of the input slots.

use crate::{DayOfWeek, ScheduleDay, ScheduleEntry, TimeOfDay};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The set of days sharing one time of day
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecurrenceGroup {
    pub time: TimeOfDay,
    pub days: BTreeSet<ScheduleDay>,
}

impl RecurrenceGroup {
    /// True when the group covers exactly the seven weekdays
    pub fn is_daily(&self) -> bool {
        self.days.len() == DayOfWeek::ALL.len()
            && self.days.iter().all(|day| day.known().is_some())
    }
}

impl fmt::Display for RecurrenceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_daily() {
            return write!(f, "Daily at {}", self.time);
        }

        let days: Vec<String> = self.days.iter().map(ScheduleDay::abbreviation).collect();
        write!(f, "{} at {}", days.join(", "), self.time)
    }
}

/// Group schedule slots by time of day.
///
/// Duplicate slots collapse; groups come back in ascending time order
/// with each group's days in canonical weekday order.
pub fn group_schedule(schedule: &[ScheduleEntry]) -> Vec<RecurrenceGroup> {
    let mut by_time: BTreeMap<&TimeOfDay, BTreeSet<ScheduleDay>> = BTreeMap::new();

    for entry in schedule {
        by_time
            .entry(&entry.time_of_day)
            .or_default()
            .insert(entry.day_of_week.clone());
    }

    by_time
        .into_iter()
        .map(|(time, days)| RecurrenceGroup {
            time: time.clone(),
            days,
        })
        .collect()
}

/// Render a schedule as one display line per distinct time of day.
///
/// An empty schedule yields no lines.
pub fn format_schedule(schedule: &[ScheduleEntry]) -> Vec<String> {
    group_schedule(schedule)
        .iter()
        .map(RecurrenceGroup::to_string)
        .collect()
}
