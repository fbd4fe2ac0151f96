//! Core domain types for the MediTracker client.
//!
//! This module defines the shapes exchanged with the backend:
//! - Weekdays and wall-clock times used by dosing schedules
//! - Prescriptions and prescription creation requests
//! - Medicines and paged listings
//! - User accounts and authentication payloads

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ============================================================================
// Schedule Types
// ============================================================================

/// Day of the week, declared in canonical Monday-first order.
///
/// The derived `Ord` is the display order used for every day list.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// All seven days in canonical order
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// Upper-case English name as sent by the backend
    pub fn name(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
            DayOfWeek::Saturday => "SATURDAY",
            DayOfWeek::Sunday => "SUNDAY",
        }
    }

    /// Three-letter display abbreviation
    pub fn abbreviation(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Mon",
            DayOfWeek::Tuesday => "Tue",
            DayOfWeek::Wednesday => "Wed",
            DayOfWeek::Thursday => "Thu",
            DayOfWeek::Friday => "Fri",
            DayOfWeek::Saturday => "Sat",
            DayOfWeek::Sunday => "Sun",
        }
    }

    /// Look up a day by its English name, ignoring case and surrounding whitespace
    pub fn from_name(name: &str) -> Option<DayOfWeek> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|day| day.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DayOfWeek {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::Validation(format!("Unknown day of week: {}", s)))
    }
}

/// A day name as received from the backend.
///
/// Names outside the seven weekdays are kept rather than rejected and
/// order after every known day.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScheduleDay {
    Known(DayOfWeek),
    Unrecognized(String),
}

impl ScheduleDay {
    pub fn parse(name: &str) -> Self {
        match DayOfWeek::from_name(name) {
            Some(day) => ScheduleDay::Known(day),
            None => ScheduleDay::Unrecognized(name.to_string()),
        }
    }

    pub fn known(&self) -> Option<DayOfWeek> {
        match self {
            ScheduleDay::Known(day) => Some(*day),
            ScheduleDay::Unrecognized(_) => None,
        }
    }

    /// Three-letter title-cased abbreviation ("MONDAY" -> "Mon").
    /// A blank name shows as "?".
    pub fn abbreviation(&self) -> String {
        match self {
            ScheduleDay::Known(day) => day.abbreviation().to_string(),
            ScheduleDay::Unrecognized(name) => title_case_prefix(name, 3),
        }
    }
}

fn title_case_prefix(name: &str, len: usize) -> String {
    let mut chars = name.trim().chars().take(len);
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => "?".to_string(),
    }
}

impl From<DayOfWeek> for ScheduleDay {
    fn from(day: DayOfWeek) -> Self {
        ScheduleDay::Known(day)
    }
}

impl From<String> for ScheduleDay {
    fn from(name: String) -> Self {
        match DayOfWeek::from_name(&name) {
            Some(day) => ScheduleDay::Known(day),
            None => ScheduleDay::Unrecognized(name),
        }
    }
}

impl From<ScheduleDay> for String {
    fn from(day: ScheduleDay) -> Self {
        match day {
            ScheduleDay::Known(day) => day.name().to_string(),
            ScheduleDay::Unrecognized(name) => name,
        }
    }
}

impl fmt::Display for ScheduleDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleDay::Known(day) => f.write_str(day.name()),
            ScheduleDay::Unrecognized(name) => f.write_str(name),
        }
    }
}

/// Wall-clock time of a dose, e.g. "08:00", with no embedded time zone.
///
/// The text is kept verbatim for display. Ordering follows the parsed
/// clock time; text that does not parse sorts after every valid time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeOfDay(String);

impl TimeOfDay {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as `HH:MM` or `HH:MM:SS`
    pub fn clock(&self) -> Option<NaiveTime> {
        let text = self.0.trim();
        NaiveTime::parse_from_str(text, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
            .ok()
    }
}

impl Ord for TimeOfDay {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.clock(), other.clock()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for TimeOfDay {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TimeOfDay {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// One (day, time) slot at which a dose is due
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub day_of_week: ScheduleDay,
    pub time_of_day: TimeOfDay,
}

impl ScheduleEntry {
    pub fn new(day: impl Into<ScheduleDay>, time: impl Into<TimeOfDay>) -> Self {
        Self {
            day_of_week: day.into(),
            time_of_day: time.into(),
        }
    }
}

impl FromStr for ScheduleEntry {
    type Err = Error;

    /// Parse a `DAY@HH:MM` slot. The day must be a real weekday.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (day, time) = s
            .split_once('@')
            .ok_or_else(|| Error::Validation(format!("Expected DAY@HH:MM, got: {}", s)))?;
        let day: DayOfWeek = day.parse()?;
        let time = TimeOfDay::new(time.trim());
        if time.clock().is_none() {
            return Err(Error::Validation(format!("Invalid time of day: {}", time)));
        }
        Ok(ScheduleEntry::new(day, time))
    }
}

// ============================================================================
// Prescription Types
// ============================================================================

/// A prescription as listed by `GET /prescriptions/me`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: i64,
    pub medicine_id: i64,
    pub medicine_name: String,
    pub dosage_amount: f64,
    pub dosage_unit: String,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub time_zone: String,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
}

/// Amount and unit of a single dose
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Dosage {
    pub amount: f64,
    pub unit: String,
}

/// Body of `POST /prescriptions`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionRequest {
    pub medicine_id: i64,
    pub dosage: Dosage,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub time_zone: String,
    pub schedule: Vec<ScheduleEntry>,
}

// ============================================================================
// Medicine Types
// ============================================================================

/// A medicine catalog entry
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage_form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_effects: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contraindications: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openfda: Option<HashMap<String, Vec<String>>>,
}

/// One page of a listing
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl<T> PagedResponse<T> {
    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    /// One-based position line, e.g. "Page 1 of 3 (42 total)"
    pub fn summary(&self) -> String {
        format!(
            "Page {} of {} ({} total)",
            self.page + 1,
            self.total_pages.max(1),
            self.total_elements
        )
    }
}

// ============================================================================
// User and Auth Types
// ============================================================================

/// A user account as listed by the admin panel
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    /// Comma-separated role names, e.g. "ADMIN,PATIENT"
    pub role: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub patient_active: bool,
    #[serde(default)]
    pub doctor_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<UserDto>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RolesResponse {
    pub roles: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<UserDto>,
}
