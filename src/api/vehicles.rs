//! Vehicle API endpoints.
//!
//! The `:id` path segment accepts either the canonical UUID or the legacy
//! integer id; both resolve to the same row.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{CreateVehicleRequest, Customer, UpdateVehicleRequest, User, Vehicle, VehicleKey};
use crate::engine::lifecycle::resolve_vehicle;
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::require_admin;
use super::validation::{validate_name, validate_uuid, validate_vin, validate_year};

fn validate_vehicle_fields(
    make: Option<&str>,
    model: Option<&str>,
    year: Option<i64>,
    vin: &Option<String>,
) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(make) = make {
        if let Err(e) = validate_name(make, "Make") {
            errors.add("make", e);
        }
    }
    if let Some(model) = model {
        if let Err(e) = validate_name(model, "Model") {
            errors.add("model", e);
        }
    }
    if let Err(e) = validate_year(year) {
        errors.add("year", e);
    }
    if let Err(e) = validate_vin(vin) {
        errors.add("vin", e);
    }

    errors.finish()
}

#[derive(Debug, Deserialize)]
pub struct VehicleListQuery {
    pub customer_id: Option<String>,
}

pub async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    _user: User,
    Query(query): Query<VehicleListQuery>,
) -> Result<Json<Vec<Vehicle>>, ApiError> {
    let vehicles = match query.customer_id {
        Some(ref customer_id) => {
            sqlx::query_as::<_, Vehicle>(
                "SELECT * FROM vehicles WHERE customer_id = ? ORDER BY created_at DESC",
            )
            .bind(customer_id)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles ORDER BY created_at DESC")
                .fetch_all(&state.db)
                .await?
        }
    };

    Ok(Json(vehicles))
}

pub async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<Vehicle>), ApiError> {
    require_admin(&user)?;
    if let Err(e) = validate_uuid(&req.customer_id, "customer_id") {
        return Err(ApiError::validation_field("customer_id", e));
    }
    validate_vehicle_fields(Some(&req.make), Some(&req.model), req.year, &req.vin)?;

    let _owner = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
        .bind(&req.customer_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO vehicles
            (id, legacy_id, customer_id, make, model, year, license_plate, vin, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(req.legacy_id)
    .bind(&req.customer_id)
    .bind(&req.make)
    .bind(&req.model)
    .bind(req.year)
    .bind(&req.license_plate)
    .bind(&req.vin)
    .bind(&now)
    .execute(&state.db)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create vehicle: {}", e);
        if e.to_string().contains("UNIQUE constraint failed") {
            ApiError::conflict("A vehicle with this legacy id already exists")
        } else {
            ApiError::database("Failed to create vehicle")
        }
    })?;

    let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(vehicle)))
}

pub async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    _user: User,
    Path(id): Path<String>,
) -> Result<Json<Vehicle>, ApiError> {
    let vehicle = resolve_vehicle(&state.db, &VehicleKey::parse(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Vehicle not found"))?;

    Ok(Json(vehicle))
}

pub async fn update_vehicle(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateVehicleRequest>,
) -> Result<Json<Vehicle>, ApiError> {
    require_admin(&user)?;
    validate_vehicle_fields(req.make.as_deref(), req.model.as_deref(), req.year, &req.vin)?;

    let existing = resolve_vehicle(&state.db, &VehicleKey::parse(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Vehicle not found"))?;

    if let Some(ref customer_id) = req.customer_id {
        let owner = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
            .bind(customer_id)
            .fetch_optional(&state.db)
            .await?;
        if owner.is_none() {
            return Err(ApiError::not_found("Customer not found"));
        }
    }

    sqlx::query(
        r#"
        UPDATE vehicles SET
            customer_id = COALESCE(?, customer_id),
            make = COALESCE(?, make),
            model = COALESCE(?, model),
            year = COALESCE(?, year),
            license_plate = COALESCE(?, license_plate),
            vin = COALESCE(?, vin)
        WHERE id = ?
        "#,
    )
    .bind(&req.customer_id)
    .bind(&req.make)
    .bind(&req.model)
    .bind(req.year)
    .bind(&req.license_plate)
    .bind(&req.vin)
    .bind(&existing.id)
    .execute(&state.db)
    .await?;

    let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = ?")
        .bind(&existing.id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(vehicle))
}

/// Delete a vehicle; its work orders and appointments cascade
pub async fn delete_vehicle(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;

    let existing = resolve_vehicle(&state.db, &VehicleKey::parse(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Vehicle not found"))?;

    sqlx::query("DELETE FROM vehicles WHERE id = ?")
        .bind(&existing.id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
