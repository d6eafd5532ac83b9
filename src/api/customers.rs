//! Customer API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{CreateCustomerRequest, Customer, UpdateCustomerRequest, User, Vehicle};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::require_admin;
use super::validation::{validate_name, validate_phone, validate_uuid};

fn validate_customer_fields(
    name: Option<&str>,
    phone: &Option<String>,
    email: &Option<String>,
) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(name) = name {
        if let Err(e) = validate_name(name, "Name") {
            errors.add("name", e);
        }
    }
    if let Err(e) = validate_phone(phone) {
        errors.add("phone", e);
    }
    if let Some(email) = email {
        if !email.is_empty() {
            if let Err(e) = super::validation::validate_email(email) {
                errors.add("email", e);
            }
        }
    }

    errors.finish()
}

#[derive(Debug, Deserialize)]
pub struct CustomerListQuery {
    /// Substring match on name, phone or email
    pub search: Option<String>,
}

pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    _user: User,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let customers = match query.search {
        Some(ref term) if !term.is_empty() => {
            let pattern = format!("%{}%", term);
            sqlx::query_as::<_, Customer>(
                r#"
                SELECT * FROM customers
                WHERE name LIKE ?1 OR phone LIKE ?1 OR email LIKE ?1
                ORDER BY created_at DESC
                "#,
            )
            .bind(&pattern)
            .fetch_all(&state.db)
            .await?
        }
        _ => {
            sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY created_at DESC")
                .fetch_all(&state.db)
                .await?
        }
    };

    Ok(Json(customers))
}

pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    require_admin(&user)?;
    validate_customer_fields(Some(&req.name), &req.phone, &req.email)?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO customers (id, name, phone, email, address, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&req.name)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.address)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    _user: User,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    if let Err(e) = validate_uuid(&id, "customer_id") {
        return Err(ApiError::validation_field("customer_id", e));
    }

    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;

    Ok(Json(customer))
}

pub async fn update_customer(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<Json<Customer>, ApiError> {
    require_admin(&user)?;
    if let Err(e) = validate_uuid(&id, "customer_id") {
        return Err(ApiError::validation_field("customer_id", e));
    }
    validate_customer_fields(req.name.as_deref(), &req.phone, &req.email)?;

    let _existing = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;

    sqlx::query(
        r#"
        UPDATE customers SET
            name = COALESCE(?, name),
            phone = COALESCE(?, phone),
            email = COALESCE(?, email),
            address = COALESCE(?, address)
        WHERE id = ?
        "#,
    )
    .bind(&req.name)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.address)
    .bind(&id)
    .execute(&state.db)
    .await?;

    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(customer))
}

/// Delete a customer; vehicles, work orders and appointments cascade
pub async fn delete_customer(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;
    if let Err(e) = validate_uuid(&id, "customer_id") {
        return Err(ApiError::validation_field("customer_id", e));
    }

    let result = sqlx::query("DELETE FROM customers WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Customer not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn customer_vehicles(
    State(state): State<Arc<AppState>>,
    _user: User,
    Path(id): Path<String>,
) -> Result<Json<Vec<Vehicle>>, ApiError> {
    if let Err(e) = validate_uuid(&id, "customer_id") {
        return Err(ApiError::validation_field("customer_id", e));
    }

    let _existing = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;

    let vehicles = sqlx::query_as::<_, Vehicle>(
        "SELECT * FROM vehicles WHERE customer_id = ? ORDER BY created_at DESC",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(vehicles))
}
