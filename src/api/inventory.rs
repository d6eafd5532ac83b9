//! Inventory API endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    CreateInventoryItemRequest, InventoryItem, InventoryItemResponse, UpdateInventoryItemRequest,
    User,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::require_admin;
use super::validation::{validate_name, validate_non_negative, validate_sku, validate_uuid};

fn validate_item_fields(
    name: Option<&str>,
    sku: Option<&str>,
    min_stock_level: Option<i64>,
    price: Option<f64>,
) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(name) = name {
        if let Err(e) = validate_name(name, "Name") {
            errors.add("name", e);
        }
    }
    if let Some(sku) = sku {
        if let Err(e) = validate_sku(sku) {
            errors.add("sku", e);
        }
    }
    if let Some(level) = min_stock_level {
        if level < 0 {
            errors.add("min_stock_level", "Minimum stock level cannot be negative");
        }
    }
    if let Some(price) = price {
        if let Err(e) = validate_non_negative(price, "price") {
            errors.add("price", e);
        }
    }

    errors.finish()
}

pub async fn list_inventory(
    State(state): State<Arc<AppState>>,
    _user: User,
) -> Result<Json<Vec<InventoryItemResponse>>, ApiError> {
    let items = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items ORDER BY name")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// Items at or below their configured minimum stock level
pub async fn list_low_stock(
    State(state): State<Arc<AppState>>,
    _user: User,
) -> Result<Json<Vec<InventoryItemResponse>>, ApiError> {
    let items = sqlx::query_as::<_, InventoryItem>(
        "SELECT * FROM inventory_items WHERE stock_quantity <= min_stock_level ORDER BY name",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(items.into_iter().map(Into::into).collect()))
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateInventoryItemRequest>,
) -> Result<(StatusCode, Json<InventoryItemResponse>), ApiError> {
    require_admin(&user)?;
    validate_item_fields(
        Some(&req.name),
        Some(&req.sku),
        Some(req.min_stock_level),
        Some(req.price),
    )?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO inventory_items
            (id, name, sku, stock_quantity, min_stock_level, price, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&req.name)
    .bind(&req.sku)
    .bind(req.stock_quantity)
    .bind(req.min_stock_level)
    .bind(req.price)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create inventory item: {}", e);
        if e.to_string().contains("UNIQUE constraint failed") {
            ApiError::conflict("An inventory item with this SKU already exists")
        } else {
            ApiError::database("Failed to create inventory item")
        }
    })?;

    let item = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(item.into())))
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    _user: User,
    Path(id): Path<String>,
) -> Result<Json<InventoryItemResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "item_id") {
        return Err(ApiError::validation_field("item_id", e));
    }

    let item = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Inventory item not found"))?;

    Ok(Json(item.into()))
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateInventoryItemRequest>,
) -> Result<Json<InventoryItemResponse>, ApiError> {
    require_admin(&user)?;
    if let Err(e) = validate_uuid(&id, "item_id") {
        return Err(ApiError::validation_field("item_id", e));
    }
    validate_item_fields(
        req.name.as_deref(),
        req.sku.as_deref(),
        req.min_stock_level,
        req.price,
    )?;

    let _existing =
        sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items WHERE id = ?")
            .bind(&id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Inventory item not found"))?;

    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE inventory_items SET
            name = COALESCE(?, name),
            sku = COALESCE(?, sku),
            stock_quantity = COALESCE(?, stock_quantity),
            min_stock_level = COALESCE(?, min_stock_level),
            price = COALESCE(?, price),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&req.name)
    .bind(&req.sku)
    .bind(req.stock_quantity)
    .bind(req.min_stock_level)
    .bind(req.price)
    .bind(&now)
    .bind(&id)
    .execute(&state.db)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update inventory item: {}", e);
        if e.to_string().contains("UNIQUE constraint failed") {
            ApiError::conflict("An inventory item with this SKU already exists")
        } else {
            ApiError::database("Failed to update inventory item")
        }
    })?;

    let item = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(item.into()))
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;
    if let Err(e) = validate_uuid(&id, "item_id") {
        return Err(ApiError::validation_field("item_id", e));
    }

    let result = sqlx::query("DELETE FROM inventory_items WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await
        .map_err(|e| {
            if e.to_string().contains("FOREIGN KEY constraint failed") {
                ApiError::conflict("Inventory item is referenced by work order parts")
            } else {
                ApiError::from(e)
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Inventory item not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
