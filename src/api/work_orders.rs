//! Work order API endpoints.
//!
//! Handlers here only translate HTTP to engine calls; authorization, state
//! rules and total bookkeeping live in `engine::lifecycle`. The update
//! endpoint picks the payload shape by role, so a mechanic's request body
//! physically cannot carry fields outside their allow-list.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::{
    AddPartRequest, AdminWorkOrderUpdate, CreateWorkOrderRequest, Customer,
    MechanicWorkOrderUpdate, UpdatePartRequest, User, Vehicle, WorkOrder, WorkOrderPart,
};
use crate::engine::billing::{self, Invoice};
use crate::engine::lifecycle::{self, WorkOrderUpdate};
use crate::ui::invoice::InvoiceDocument;
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_name, validate_non_negative, validate_text};

pub async fn list_work_orders(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<WorkOrder>>, ApiError> {
    let orders = lifecycle::list_work_orders(&state.db, &user.as_caller()).await?;
    Ok(Json(orders))
}

pub async fn create_work_order(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateWorkOrderRequest>,
) -> Result<(StatusCode, Json<WorkOrder>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_name(&req.title, "Title") {
        errors.add("title", e);
    }
    if let Err(e) = validate_text(&req.description, "Description", 2000) {
        errors.add("description", e);
    }
    if let Err(e) = validate_non_negative(req.labor_hours, "labor_hours") {
        errors.add("labor_hours", e);
    }
    if let Some(rate) = req.labor_rate {
        if let Err(e) = validate_non_negative(rate, "labor_rate") {
            errors.add("labor_rate", e);
        }
    }
    errors.finish()?;

    let order = lifecycle::create_work_order(
        &state.db,
        &user.as_caller(),
        req,
        state.config.billing.default_labor_rate,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_work_order(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<WorkOrder>, ApiError> {
    let order = lifecycle::get_work_order(&state.db, &user.as_caller(), &id).await?;
    Ok(Json(order))
}

pub async fn update_work_order(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<WorkOrder>, ApiError> {
    // Deserialize into the shape the caller's role allows. Fields outside
    // the mechanic shape are dropped here, before the engine ever sees them.
    let update = if user.is_admin() {
        let fields: AdminWorkOrderUpdate = serde_json::from_value(body)
            .map_err(|_| ApiError::bad_request("Invalid update payload"))?;
        WorkOrderUpdate::Admin(fields)
    } else {
        let fields: MechanicWorkOrderUpdate = serde_json::from_value(body)
            .map_err(|_| ApiError::bad_request("Invalid update payload"))?;
        WorkOrderUpdate::Mechanic(fields)
    };

    let order = lifecycle::update_work_order(&state.db, &user.as_caller(), &id, update).await?;
    Ok(Json(order))
}

pub async fn delete_work_order(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    lifecycle::delete_work_order(&state.db, &user.as_caller(), &id).await?;
    Ok(Json(serde_json::json!({ "message": "Work order deleted" })))
}

pub async fn list_parts(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Vec<WorkOrderPart>>, ApiError> {
    let parts = lifecycle::list_parts(&state.db, &user.as_caller(), &id).await?;
    Ok(Json(parts))
}

pub async fn add_part(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<AddPartRequest>,
) -> Result<(StatusCode, Json<WorkOrderPart>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(ref name) = req.custom_name {
        if let Err(e) = validate_name(name, "Part name") {
            errors.add("custom_name", e);
        }
    }
    if let Some(price) = req.unit_price {
        if let Err(e) = validate_non_negative(price, "unit_price") {
            errors.add("unit_price", e);
        }
    }
    if let Some(cost) = req.cost_price {
        if let Err(e) = validate_non_negative(cost, "cost_price") {
            errors.add("cost_price", e);
        }
    }
    errors.finish()?;

    let part = lifecycle::add_part(&state.db, &user.as_caller(), &id, req).await?;
    Ok((StatusCode::CREATED, Json(part)))
}

pub async fn update_part(
    State(state): State<Arc<AppState>>,
    user: User,
    Path((id, part_id)): Path<(String, String)>,
    Json(req): Json<UpdatePartRequest>,
) -> Result<Json<WorkOrderPart>, ApiError> {
    let part = lifecycle::update_part(&state.db, &user.as_caller(), &id, &part_id, req).await?;
    Ok(Json(part))
}

pub async fn delete_part(
    State(state): State<Arc<AppState>>,
    user: User,
    Path((id, part_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    lifecycle::delete_part(&state.db, &user.as_caller(), &id, &part_id).await?;
    Ok(Json(serde_json::json!({ "message": "Part removed" })))
}

// -------------------------------------------------------------------------
// Invoice endpoints
// -------------------------------------------------------------------------

/// JSON invoice: the computation plus the customer/vehicle snapshot the SPA
/// shows alongside it.
#[derive(Debug, Serialize)]
pub struct InvoiceEnvelope {
    pub invoice: Invoice,
    pub customer: Customer,
    pub vehicle: Vehicle,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    /// Any value other than "0"/"false" requests an attachment
    pub download: Option<String>,
}

impl InvoiceQuery {
    fn wants_download(&self) -> bool {
        matches!(self.download.as_deref(), Some(v) if v != "0" && v != "false")
    }
}

pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<InvoiceEnvelope>, ApiError> {
    let (invoice, customer, vehicle) = load_invoice(&state, &user, &id).await?;
    Ok(Json(InvoiceEnvelope {
        invoice,
        customer,
        vehicle,
    }))
}

/// The printable invoice document. Served inline by default; `?download=1`
/// turns the same bytes into an attachment.
pub async fn get_invoice_html(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Query(query): Query<InvoiceQuery>,
) -> Result<Response, ApiError> {
    let (invoice, customer, vehicle) = load_invoice(&state, &user, &id).await?;

    let html = InvoiceDocument {
        shop: &state.config.billing,
        customer: &customer,
        vehicle: &vehicle,
        invoice: &invoice,
    }
    .render();

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8");
    if query.wants_download() {
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.html\"", invoice.number),
        );
    }

    builder
        .body(axum::body::Body::from(html))
        .map_err(|_| ApiError::internal("Failed to render invoice"))
}

/// Both invoice renditions go through here, so their numbers always agree.
async fn load_invoice(
    state: &AppState,
    user: &User,
    id: &str,
) -> Result<(Invoice, Customer, Vehicle), ApiError> {
    let caller = user.as_caller();
    let order = lifecycle::get_work_order(&state.db, &caller, id).await?;
    let parts = lifecycle::list_parts(&state.db, &caller, id).await?;

    // Resolve inventory-backed line names for display
    let mut part_names = Vec::with_capacity(parts.len());
    for part in &parts {
        let name = match &part.inventory_item_id {
            Some(item_id) => {
                let row: Option<(String,)> =
                    sqlx::query_as("SELECT name FROM inventory_items WHERE id = ?")
                        .bind(item_id)
                        .fetch_optional(&state.db)
                        .await?;
                row.map(|(n,)| n)
            }
            None => None,
        };
        part_names.push(name);
    }

    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
        .bind(&order.customer_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;

    let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = ?")
        .bind(&order.vehicle_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Vehicle not found"))?;

    let invoice = billing::build_invoice(
        &order,
        &parts,
        &part_names,
        state.config.billing.tax_rate,
        Utc::now().date_naive(),
    );

    Ok((invoice, customer, vehicle))
}
