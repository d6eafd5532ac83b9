//! Appointment API endpoints.
//!
//! Visibility and update rights mirror work orders: an admin sees and edits
//! everything, a mechanic only appointments assigned to them, with updates
//! narrowed to status and description.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    AdminAppointmentUpdate, Appointment, AppointmentStatus, CreateAppointmentRequest, Customer,
    MechanicAppointmentUpdate, User, VehicleKey,
};
use crate::engine::lifecycle::resolve_vehicle;
use crate::engine::policy::{self, Role};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::require_admin;
use super::validation::{validate_text, validate_timestamp, validate_uuid};

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let caller = user.as_caller();
    let appointments = match caller.role {
        Role::Admin => {
            sqlx::query_as::<_, Appointment>(
                "SELECT * FROM appointments ORDER BY appointment_date",
            )
            .fetch_all(&state.db)
            .await?
        }
        Role::Mechanic => {
            sqlx::query_as::<_, Appointment>(
                "SELECT * FROM appointments WHERE assigned_mechanic = ? ORDER BY appointment_date",
            )
            .bind(&caller.id)
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(Json(appointments))
}

pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    require_admin(&user)?;

    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_uuid(&req.customer_id, "customer_id") {
        errors.add("customer_id", e);
    }
    if let Err(e) = validate_timestamp(&req.appointment_date, "appointment_date") {
        errors.add("appointment_date", e);
    }
    if req.duration_minutes <= 0 {
        errors.add("duration_minutes", "Duration must be greater than zero");
    }
    if let Err(e) = validate_text(&req.description, "Description", 2000) {
        errors.add("description", e);
    }
    errors.finish()?;

    let _customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
        .bind(&req.customer_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;

    let vehicle = resolve_vehicle(&state.db, &VehicleKey::parse(&req.vehicle_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Vehicle not found"))?;

    if let Some(ref mechanic_id) = req.assigned_mechanic {
        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE id = ?")
            .bind(mechanic_id)
            .fetch_optional(&state.db)
            .await?;
        if exists.is_none() {
            return Err(ApiError::validation_field(
                "assigned_mechanic",
                "Assigned mechanic does not exist",
            ));
        }
    }

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO appointments
            (id, customer_id, vehicle_id, assigned_mechanic, appointment_date,
             duration_minutes, description, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&req.customer_id)
    .bind(&vehicle.id)
    .bind(&req.assigned_mechanic)
    .bind(&req.appointment_date)
    .bind(req.duration_minutes)
    .bind(&req.description)
    .bind(AppointmentStatus::Scheduled.as_str())
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let appointment = sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    let appointment = visible_appointment(&state, &user, &id).await?;
    Ok(Json(appointment))
}

pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<Appointment>, ApiError> {
    let appointment = visible_appointment(&state, &user, &id).await?;

    // Role picks the payload shape, exactly as for work orders
    let fields: AdminAppointmentUpdate = if user.is_admin() {
        serde_json::from_value(body)
            .map_err(|_| ApiError::bad_request("Invalid update payload"))?
    } else {
        let narrowed: MechanicAppointmentUpdate = serde_json::from_value(body)
            .map_err(|_| ApiError::bad_request("Invalid update payload"))?;
        narrowed.into()
    };

    if let Some(ref raw) = fields.status {
        if AppointmentStatus::parse(raw).is_none() {
            return Err(ApiError::validation_field(
                "status",
                format!(
                    "Invalid status '{raw}'. Must be one of: scheduled, confirmed, completed, cancelled"
                ),
            ));
        }
    }
    if let Some(ref date) = fields.appointment_date {
        if let Err(e) = validate_timestamp(date, "appointment_date") {
            return Err(ApiError::validation_field("appointment_date", e));
        }
    }
    if matches!(fields.duration_minutes, Some(d) if d <= 0) {
        return Err(ApiError::validation_field(
            "duration_minutes",
            "Duration must be greater than zero",
        ));
    }

    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE appointments SET
            assigned_mechanic = COALESCE(?, assigned_mechanic),
            appointment_date = COALESCE(?, appointment_date),
            duration_minutes = COALESCE(?, duration_minutes),
            description = COALESCE(?, description),
            status = COALESCE(?, status),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.assigned_mechanic)
    .bind(&fields.appointment_date)
    .bind(fields.duration_minutes)
    .bind(&fields.description)
    .bind(&fields.status)
    .bind(&now)
    .bind(&appointment.id)
    .execute(&state.db)
    .await?;

    let appointment = sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = ?")
        .bind(&appointment.id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(appointment))
}

pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;

    let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Appointment not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Fetch an appointment the caller is allowed to see. Invisible reads the
/// same as absent.
async fn visible_appointment(
    state: &AppState,
    user: &User,
    id: &str,
) -> Result<Appointment, ApiError> {
    let appointment = sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment not found"))?;

    let caller = user.as_caller();
    if !policy::can_view(&caller, appointment.assigned_mechanic.as_deref()) {
        return Err(ApiError::not_found("Appointment not found"));
    }

    Ok(appointment)
}
