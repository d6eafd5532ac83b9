//! Appointment models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: String,
    pub customer_id: String,
    pub vehicle_id: String,
    pub assigned_mechanic: Option<String>,
    pub appointment_date: String,
    pub duration_minutes: i64,
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub customer_id: String,
    /// Canonical UUID or legacy integer id.
    pub vehicle_id: String,
    pub assigned_mechanic: Option<String>,
    pub appointment_date: String,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: i64,
    pub description: Option<String>,
}

fn default_duration_minutes() -> i64 {
    120
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminAppointmentUpdate {
    pub assigned_mechanic: Option<String>,
    pub appointment_date: Option<String>,
    pub duration_minutes: Option<i64>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// Update shape available to the assigned mechanic.
#[derive(Debug, Default, Deserialize)]
pub struct MechanicAppointmentUpdate {
    pub status: Option<String>,
    pub description: Option<String>,
}

impl From<MechanicAppointmentUpdate> for AdminAppointmentUpdate {
    fn from(update: MechanicAppointmentUpdate) -> Self {
        Self {
            status: update.status,
            description: update.description,
            ..Default::default()
        }
    }
}
