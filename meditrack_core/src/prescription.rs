//! Prescription display and creation checks.

use crate::schedule::format_schedule;
use crate::{DayOfWeek, Error, Prescription, PrescriptionRequest, Result, ScheduleEntry};
use std::collections::BTreeSet;
use std::fmt;

/// Shown when a patient has no prescriptions at all
pub const NO_PRESCRIPTIONS: &str = "No prescriptions yet. Add one from the Medicine Database!";

/// Shown in place of schedule lines when a prescription has no slots
pub const NO_SCHEDULE: &str = "No schedule";

const MIN_DOSAGE_AMOUNT: f64 = 0.01;
const MAX_TIME_ZONE_LEN: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrescriptionStatus {
    /// Has an end date
    Active,
    /// Open-ended
    Ongoing,
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrescriptionStatus::Active => f.write_str("Active"),
            PrescriptionStatus::Ongoing => f.write_str("Ongoing"),
        }
    }
}

impl Prescription {
    pub fn status(&self) -> PrescriptionStatus {
        if self.end_date.is_some() {
            PrescriptionStatus::Active
        } else {
            PrescriptionStatus::Ongoing
        }
    }

    /// Schedule display lines, one per distinct time of day
    pub fn schedule_lines(&self) -> Vec<String> {
        format_schedule(&self.schedule)
    }
}

/// Render one prescription as the lines of a card
///
/// ```text
/// Metformin
///   500 MG [Ongoing]
///   Schedule:
///     • Mon, Wed, Fri at 08:00
///   Start: 2024-01-01  Timezone: Europe/London
/// ```
pub fn render_prescription(prescription: &Prescription) -> Vec<String> {
    let mut lines = vec![
        prescription.medicine_name.clone(),
        format!(
            "  {} {} [{}]",
            prescription.dosage_amount,
            prescription.dosage_unit,
            prescription.status()
        ),
        "  Schedule:".to_string(),
    ];

    let schedule = prescription.schedule_lines();
    if schedule.is_empty() {
        tracing::debug!("Prescription {} has an empty schedule", prescription.id);
        lines.push(format!("    {}", NO_SCHEDULE));
    } else {
        lines.extend(schedule.into_iter().map(|line| format!("    • {}", line)));
    }

    let mut footer = format!("  Start: {}", prescription.start_date);
    if let Some(end) = prescription.end_date {
        footer.push_str(&format!("  End: {}", end));
    }
    footer.push_str(&format!("  Timezone: {}", prescription.time_zone));
    lines.push(footer);

    lines
}

/// Render a whole listing, separating cards with a blank line
pub fn render_prescriptions(prescriptions: &[Prescription]) -> Vec<String> {
    if prescriptions.is_empty() {
        return vec![NO_PRESCRIPTIONS.to_string()];
    }

    let mut lines = Vec::new();
    for (i, prescription) in prescriptions.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.extend(render_prescription(prescription));
    }
    lines
}

/// Expand `daily@HH:MM` into seven slots; any other text is a single `DAY@HH:MM` slot
pub fn parse_slot(slot: &str) -> Result<Vec<ScheduleEntry>> {
    if let Some((day, time)) = slot.split_once('@') {
        if day.trim().eq_ignore_ascii_case("daily") {
            return DayOfWeek::ALL
                .into_iter()
                .map(|day| format!("{}@{}", day, time).parse::<ScheduleEntry>())
                .collect();
        }
    }
    Ok(vec![slot.parse()?])
}

impl PrescriptionRequest {
    /// Check the request the way the backend will, so mistakes surface
    /// before anything is sent.
    pub fn validate(&self) -> Result<()> {
        if self.medicine_id <= 0 {
            return Err(Error::Validation("A medicine must be selected".into()));
        }
        if !self.dosage.amount.is_finite() || self.dosage.amount < MIN_DOSAGE_AMOUNT {
            return Err(Error::Validation(format!(
                "Dosage amount must be at least {}",
                MIN_DOSAGE_AMOUNT
            )));
        }
        if self.dosage.unit.trim().is_empty() {
            return Err(Error::Validation("Dosage unit is required".into()));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(Error::Validation(
                    "End date must be on or after start date".into(),
                ));
            }
        }

        let time_zone = self.time_zone.trim();
        if time_zone.is_empty() {
            return Err(Error::Validation("Time zone is required".into()));
        }
        if time_zone.chars().count() > MAX_TIME_ZONE_LEN {
            return Err(Error::Validation(format!(
                "Time zone must be at most {} characters",
                MAX_TIME_ZONE_LEN
            )));
        }

        if self.schedule.is_empty() {
            return Err(Error::Validation(
                "Schedule must contain at least one time slot".into(),
            ));
        }
        for entry in &self.schedule {
            if entry.day_of_week.known().is_none() {
                return Err(Error::Validation(format!(
                    "Unknown day of week: {}",
                    entry.day_of_week
                )));
            }
            if entry.time_of_day.clock().is_none() {
                return Err(Error::Validation(format!(
                    "Invalid time of day: {}",
                    entry.time_of_day
                )));
            }
        }

        Ok(())
    }

    /// Validate, then drop duplicate slots and sort them by (day, time)
    pub fn normalized(mut self) -> Result<Self> {
        self.validate()?;
        let unique: BTreeSet<ScheduleEntry> = self.schedule.into_iter().collect();
        self.schedule = unique.into_iter().collect();
        self.time_zone = self.time_zone.trim().to_string();
        Ok(self)
    }
}
