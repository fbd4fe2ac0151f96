#![forbid(unsafe_code)]

//! Core domain model and client logic for MediTracker.
//!
//! This crate provides:
//! - Domain types (weekdays, schedules, prescriptions, medicines, users)
//! - Schedule formatting grouped by time of day
//! - Prescription rendering and request validation
//! - Roles, capabilities and the client session
//! - REST request descriptions and an HTTP backend

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod schedule;
pub mod prescription;
pub mod roles;
pub mod session;
pub mod api;
pub mod client;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use schedule::{format_schedule, group_schedule, RecurrenceGroup};
pub use prescription::{render_prescription, render_prescriptions, PrescriptionStatus};
pub use roles::{Capability, Role, RoleSet};
pub use session::{SessionContext, SessionStore};
pub use api::{ApiRequest, Backend, HttpBackend, MedicineQuery};
pub use client::MediTrackerClient;
