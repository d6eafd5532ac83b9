//! Work order lifecycle operations.
//!
//! Owns status transitions, assignment rules, part usage with inventory
//! stock decrement, and keeping `total_amount` consistent with labor and
//! parts. Every multi-statement mutation (part insert + stock decrement +
//! total recompute, part update/delete + total recompute) runs inside a
//! single transaction so concurrent requests cannot observe a half-applied
//! order.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::db::{
    AddPartRequest, AdminWorkOrderUpdate, CreateWorkOrderRequest, MechanicWorkOrderUpdate,
    UpdatePartRequest, Vehicle, VehicleKey, WorkOrder, WorkOrderPart, WorkOrderStatus,
};
use crate::engine::policy::{self, Caller, Role};
use crate::engine::EngineError;

/// Role-shaped update payload. The shape itself is the field allow-list: a
/// mechanic's payload has nowhere to carry labor or assignment changes.
#[derive(Debug)]
pub enum WorkOrderUpdate {
    Admin(AdminWorkOrderUpdate),
    Mechanic(MechanicWorkOrderUpdate),
}

/// Look a vehicle up by canonical UUID or legacy integer id.
pub async fn resolve_vehicle(
    pool: &SqlitePool,
    key: &VehicleKey,
) -> Result<Option<Vehicle>, sqlx::Error> {
    match key {
        VehicleKey::Canonical(id) => {
            sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await
        }
        VehicleKey::Legacy(n) => {
            sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE legacy_id = ?")
                .bind(n)
                .fetch_optional(pool)
                .await
        }
    }
}

pub async fn create_work_order(
    pool: &SqlitePool,
    caller: &Caller,
    req: CreateWorkOrderRequest,
    default_labor_rate: f64,
) -> Result<WorkOrder, EngineError> {
    if !caller.is_admin() {
        return Err(EngineError::Forbidden("Only an admin can create work orders"));
    }

    if req.labor_hours < 0.0 {
        return Err(EngineError::validation("labor_hours", "Labor hours cannot be negative"));
    }
    let labor_rate = req.labor_rate.unwrap_or(default_labor_rate);
    if labor_rate < 0.0 {
        return Err(EngineError::validation("labor_rate", "Labor rate cannot be negative"));
    }

    let vehicle = resolve_vehicle(pool, &VehicleKey::parse(&req.vehicle_id))
        .await?
        .ok_or(EngineError::NotFound("Vehicle not found"))?;

    if let Some(ref mechanic_id) = req.assigned_mechanic {
        ensure_mechanic_exists(pool, mechanic_id).await?;
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let total_amount = req.labor_hours * labor_rate;

    sqlx::query(
        r#"
        INSERT INTO work_orders
            (id, vehicle_id, customer_id, assigned_mechanic, title, description,
             status, labor_hours, labor_rate, total_amount, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&vehicle.id)
    .bind(&vehicle.customer_id)
    .bind(&req.assigned_mechanic)
    .bind(&req.title)
    .bind(&req.description)
    .bind(WorkOrderStatus::Pending.as_str())
    .bind(req.labor_hours)
    .bind(labor_rate)
    .bind(total_amount)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    let order = sqlx::query_as::<_, WorkOrder>("SELECT * FROM work_orders WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await?;

    Ok(order)
}

pub async fn get_work_order(
    pool: &SqlitePool,
    caller: &Caller,
    id: &str,
) -> Result<WorkOrder, EngineError> {
    let order = sqlx::query_as::<_, WorkOrder>("SELECT * FROM work_orders WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(EngineError::NotFound("Work order not found"))?;

    // Invisible reads the same as absent
    if !policy::can_view(caller, order.assigned_mechanic.as_deref()) {
        return Err(EngineError::NotFound("Work order not found"));
    }

    Ok(order)
}

pub async fn list_work_orders(
    pool: &SqlitePool,
    caller: &Caller,
) -> Result<Vec<WorkOrder>, EngineError> {
    let orders = match caller.role {
        Role::Admin => {
            sqlx::query_as::<_, WorkOrder>(
                "SELECT * FROM work_orders ORDER BY created_at DESC",
            )
            .fetch_all(pool)
            .await?
        }
        Role::Mechanic => {
            sqlx::query_as::<_, WorkOrder>(
                "SELECT * FROM work_orders WHERE assigned_mechanic = ? ORDER BY created_at DESC",
            )
            .bind(&caller.id)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(orders)
}

pub async fn update_work_order(
    pool: &SqlitePool,
    caller: &Caller,
    id: &str,
    update: WorkOrderUpdate,
) -> Result<WorkOrder, EngineError> {
    let order = mutable_order(pool, caller, id).await?;

    let fields: AdminWorkOrderUpdate = match (caller.role, update) {
        (Role::Admin, WorkOrderUpdate::Admin(u)) => u,
        (Role::Mechanic, WorkOrderUpdate::Mechanic(u)) => u.into(),
        _ => return Err(EngineError::Forbidden("Update payload does not match caller role")),
    };

    let status = match fields.status.as_deref() {
        Some(raw) => {
            let next = WorkOrderStatus::parse(raw).ok_or_else(|| {
                EngineError::validation(
                    "status",
                    format!("Invalid status '{raw}'. Must be one of: pending, in_progress, completed"),
                )
            })?;
            let next = order
                .status()
                .transition(next)
                .map_err(|e| EngineError::validation("status", e))?;
            Some(next.as_str().to_string())
        }
        None => None,
    };

    if matches!(fields.labor_hours, Some(h) if h < 0.0) {
        return Err(EngineError::validation("labor_hours", "Labor hours cannot be negative"));
    }
    if matches!(fields.labor_rate, Some(r) if r < 0.0) {
        return Err(EngineError::validation("labor_rate", "Labor rate cannot be negative"));
    }
    if let Some(ref mechanic_id) = fields.assigned_mechanic {
        ensure_mechanic_exists(pool, mechanic_id).await?;
    }

    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE work_orders SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            status = COALESCE(?, status),
            assigned_mechanic = COALESCE(?, assigned_mechanic),
            labor_hours = COALESCE(?, labor_hours),
            labor_rate = COALESCE(?, labor_rate),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(&status)
    .bind(&fields.assigned_mechanic)
    .bind(fields.labor_hours)
    .bind(fields.labor_rate)
    .bind(&now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    // Labor fields feed the total; recompute inside the same transaction
    recompute_total(&mut tx, id, &now).await?;
    tx.commit().await?;

    let order = sqlx::query_as::<_, WorkOrder>("SELECT * FROM work_orders WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(order)
}

pub async fn delete_work_order(
    pool: &SqlitePool,
    caller: &Caller,
    id: &str,
) -> Result<(), EngineError> {
    if !caller.is_admin() {
        return Err(EngineError::Forbidden("Only an admin can delete work orders"));
    }

    // Parts cascade via the schema
    let result = sqlx::query("DELETE FROM work_orders WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::NotFound("Work order not found"));
    }

    Ok(())
}

pub async fn list_parts(
    pool: &SqlitePool,
    caller: &Caller,
    work_order_id: &str,
) -> Result<Vec<WorkOrderPart>, EngineError> {
    // Visibility check rides on the order itself
    get_work_order(pool, caller, work_order_id).await?;

    let parts = sqlx::query_as::<_, WorkOrderPart>(
        "SELECT * FROM work_order_parts WHERE work_order_id = ? ORDER BY created_at, id",
    )
    .bind(work_order_id)
    .fetch_all(pool)
    .await?;

    Ok(parts)
}

pub async fn add_part(
    pool: &SqlitePool,
    caller: &Caller,
    work_order_id: &str,
    req: AddPartRequest,
) -> Result<WorkOrderPart, EngineError> {
    let order = mutable_order(pool, caller, work_order_id).await?;
    ensure_parts_editable(&order)?;

    if req.quantity_used <= 0 {
        return Err(EngineError::validation("quantity_used", "Quantity must be greater than zero"));
    }
    if matches!(req.unit_price, Some(p) if p < 0.0) {
        return Err(EngineError::validation("unit_price", "Unit price cannot be negative"));
    }

    // A part is drawn from inventory or supplied as a one-off custom entry,
    // never both and never neither.
    if req.is_custom {
        if req.inventory_item_id.is_some() {
            return Err(EngineError::validation(
                "inventory_item_id",
                "A custom part cannot also reference an inventory item",
            ));
        }
        match req.custom_name.as_deref() {
            Some(name) if !name.trim().is_empty() => {}
            _ => {
                return Err(EngineError::validation(
                    "custom_name",
                    "custom_name is required for a custom part",
                ))
            }
        }
        if req.unit_price.is_none() {
            return Err(EngineError::validation(
                "unit_price",
                "unit_price is required for a custom part",
            ));
        }
    } else {
        if req.inventory_item_id.is_none() {
            return Err(EngineError::validation(
                "inventory_item_id",
                "inventory_item_id is required unless the part is custom",
            ));
        }
        if req.custom_name.is_some() {
            return Err(EngineError::validation(
                "custom_name",
                "custom_name is only valid for custom parts",
            ));
        }
    }

    let part_id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    let mut tx = pool.begin().await?;

    let unit_price = if let Some(ref item_id) = req.inventory_item_id {
        let item: Option<(f64,)> =
            sqlx::query_as("SELECT price FROM inventory_items WHERE id = ?")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (price,) = item.ok_or(EngineError::NotFound("Inventory item not found"))?;
        req.unit_price.unwrap_or(price)
    } else {
        req.unit_price.unwrap_or(0.0)
    };

    sqlx::query(
        r#"
        INSERT INTO work_order_parts
            (id, work_order_id, inventory_item_id, custom_name, custom_sku,
             quantity_used, unit_price, cost_price, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&part_id)
    .bind(work_order_id)
    .bind(&req.inventory_item_id)
    .bind(&req.custom_name)
    .bind(&req.custom_sku)
    .bind(req.quantity_used)
    .bind(unit_price)
    .bind(req.cost_price)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    // Stock may go negative; the shop reconciles on the next count
    if let Some(ref item_id) = req.inventory_item_id {
        sqlx::query(
            "UPDATE inventory_items SET stock_quantity = stock_quantity - ?, updated_at = ? WHERE id = ?",
        )
        .bind(req.quantity_used)
        .bind(&now)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;
    }

    recompute_total(&mut tx, work_order_id, &now).await?;
    tx.commit().await?;

    let part = sqlx::query_as::<_, WorkOrderPart>("SELECT * FROM work_order_parts WHERE id = ?")
        .bind(&part_id)
        .fetch_one(pool)
        .await?;

    Ok(part)
}

pub async fn update_part(
    pool: &SqlitePool,
    caller: &Caller,
    work_order_id: &str,
    part_id: &str,
    req: UpdatePartRequest,
) -> Result<WorkOrderPart, EngineError> {
    let order = mutable_order(pool, caller, work_order_id).await?;
    ensure_parts_editable(&order)?;

    if matches!(req.quantity_used, Some(q) if q <= 0) {
        return Err(EngineError::validation("quantity_used", "Quantity must be greater than zero"));
    }
    if matches!(req.unit_price, Some(p) if p < 0.0) {
        return Err(EngineError::validation("unit_price", "Unit price cannot be negative"));
    }

    fetch_part(pool, work_order_id, part_id).await?;

    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE work_order_parts SET
            quantity_used = COALESCE(?, quantity_used),
            unit_price = COALESCE(?, unit_price),
            cost_price = COALESCE(?, cost_price)
        WHERE id = ? AND work_order_id = ?
        "#,
    )
    .bind(req.quantity_used)
    .bind(req.unit_price)
    .bind(req.cost_price)
    .bind(part_id)
    .bind(work_order_id)
    .execute(&mut *tx)
    .await?;

    recompute_total(&mut tx, work_order_id, &now).await?;
    tx.commit().await?;

    let part = sqlx::query_as::<_, WorkOrderPart>("SELECT * FROM work_order_parts WHERE id = ?")
        .bind(part_id)
        .fetch_one(pool)
        .await?;

    Ok(part)
}

pub async fn delete_part(
    pool: &SqlitePool,
    caller: &Caller,
    work_order_id: &str,
    part_id: &str,
) -> Result<(), EngineError> {
    let order = mutable_order(pool, caller, work_order_id).await?;
    ensure_parts_editable(&order)?;

    fetch_part(pool, work_order_id, part_id).await?;

    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    // Consumed stock stays consumed: deleting the line item does not return
    // quantity to inventory.
    sqlx::query("DELETE FROM work_order_parts WHERE id = ? AND work_order_id = ?")
        .bind(part_id)
        .bind(work_order_id)
        .execute(&mut *tx)
        .await?;

    recompute_total(&mut tx, work_order_id, &now).await?;
    tx.commit().await?;

    Ok(())
}

/// Fetch the order and require mutation rights. Orders a mechanic cannot
/// touch read as absent.
async fn mutable_order(
    pool: &SqlitePool,
    caller: &Caller,
    id: &str,
) -> Result<WorkOrder, EngineError> {
    let order = sqlx::query_as::<_, WorkOrder>("SELECT * FROM work_orders WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(EngineError::NotFound("Work order not found"))?;

    if !policy::can_mutate(caller, order.assigned_mechanic.as_deref()) {
        return Err(EngineError::NotFound("Work order not found"));
    }

    Ok(order)
}

fn ensure_parts_editable(order: &WorkOrder) -> Result<(), EngineError> {
    if order.is_completed() {
        return Err(EngineError::Forbidden(
            "Parts cannot be modified on a completed work order",
        ));
    }
    Ok(())
}

async fn fetch_part(
    pool: &SqlitePool,
    work_order_id: &str,
    part_id: &str,
) -> Result<WorkOrderPart, EngineError> {
    sqlx::query_as::<_, WorkOrderPart>(
        "SELECT * FROM work_order_parts WHERE id = ? AND work_order_id = ?",
    )
    .bind(part_id)
    .bind(work_order_id)
    .fetch_optional(pool)
    .await?
    .ok_or(EngineError::NotFound("Part not found"))
}

async fn ensure_mechanic_exists(pool: &SqlitePool, user_id: &str) -> Result<(), EngineError> {
    let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    if exists.is_none() {
        return Err(EngineError::validation(
            "assigned_mechanic",
            "Assigned mechanic does not exist",
        ));
    }
    Ok(())
}

/// Re-derive `total_amount` from labor and the current part rows, inside the
/// caller's transaction.
async fn recompute_total(
    tx: &mut Transaction<'_, Sqlite>,
    work_order_id: &str,
    now: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE work_orders SET
            total_amount = labor_hours * labor_rate + (
                SELECT COALESCE(SUM(quantity_used * unit_price), 0)
                FROM work_order_parts
                WHERE work_order_id = work_orders.id
            ),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(work_order_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    fn admin() -> Caller {
        Caller::new("u-admin", Role::Admin)
    }

    async fn seed_mechanic(pool: &SqlitePool, id: &str) -> Caller {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, full_name, role) VALUES (?, ?, 'x', 'Test Mechanic', 'mechanic')",
        )
        .bind(id)
        .bind(format!("{id}@shop.test"))
        .execute(pool)
        .await
        .unwrap();
        Caller::new(id, Role::Mechanic)
    }

    async fn seed_vehicle(pool: &SqlitePool, legacy_id: Option<i64>) -> Vehicle {
        let customer_id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO customers (id, name) VALUES (?, 'Dana Field')")
            .bind(&customer_id)
            .execute(pool)
            .await
            .unwrap();

        let vehicle_id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO vehicles (id, customer_id, make, model, legacy_id) VALUES (?, ?, 'Subaru', 'Outback', ?)",
        )
        .bind(&vehicle_id)
        .bind(&customer_id)
        .bind(legacy_id)
        .execute(pool)
        .await
        .unwrap();

        sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = ?")
            .bind(&vehicle_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn seed_inventory(pool: &SqlitePool, sku: &str, stock: i64, price: f64) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO inventory_items (id, name, sku, stock_quantity, price) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(format!("Item {sku}"))
        .bind(sku)
        .bind(stock)
        .bind(price)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    fn create_req(vehicle_id: &str, hours: f64, rate: f64) -> CreateWorkOrderRequest {
        CreateWorkOrderRequest {
            vehicle_id: vehicle_id.to_string(),
            title: "Brake replacement".to_string(),
            description: None,
            assigned_mechanic: None,
            labor_hours: hours,
            labor_rate: Some(rate),
        }
    }

    fn inventory_part(item_id: &str, qty: i64, price: Option<f64>) -> AddPartRequest {
        AddPartRequest {
            is_custom: false,
            inventory_item_id: Some(item_id.to_string()),
            custom_name: None,
            custom_sku: None,
            quantity_used: qty,
            unit_price: price,
            cost_price: None,
        }
    }

    async fn stock_of(pool: &SqlitePool, item_id: &str) -> i64 {
        let (stock,): (i64,) =
            sqlx::query_as("SELECT stock_quantity FROM inventory_items WHERE id = ?")
                .bind(item_id)
                .fetch_one(pool)
                .await
                .unwrap();
        stock
    }

    async fn assert_total_consistent(pool: &SqlitePool, order_id: &str) {
        let order = sqlx::query_as::<_, WorkOrder>("SELECT * FROM work_orders WHERE id = ?")
            .bind(order_id)
            .fetch_one(pool)
            .await
            .unwrap();
        let parts = sqlx::query_as::<_, WorkOrderPart>(
            "SELECT * FROM work_order_parts WHERE work_order_id = ?",
        )
        .bind(order_id)
        .fetch_all(pool)
        .await
        .unwrap();

        let expected = order.labor_hours * order.labor_rate
            + parts
                .iter()
                .map(|p| p.quantity_used as f64 * p.unit_price)
                .sum::<f64>();
        assert_eq!(order.total_amount, expected);
    }

    #[tokio::test]
    async fn test_create_and_bill_scenario() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, None).await;
        let pads = seed_inventory(&pool, "PAD-1", 10, 40.0).await;

        let order = create_work_order(&pool, &admin(), create_req(&vehicle.id, 2.0, 75.0), 75.0)
            .await
            .unwrap();
        assert_eq!(order.status, "pending");
        assert_eq!(order.customer_id, vehicle.customer_id);
        assert_eq!(order.total_amount, 150.0);

        add_part(&pool, &admin(), &order.id, inventory_part(&pads, 2, Some(40.0)))
            .await
            .unwrap();
        let order = get_work_order(&pool, &admin(), &order.id).await.unwrap();
        assert_eq!(order.total_amount, 230.0);
        assert_total_consistent(&pool, &order.id).await;

        let order = update_work_order(
            &pool,
            &admin(),
            &order.id,
            WorkOrderUpdate::Admin(AdminWorkOrderUpdate {
                status: Some("completed".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(order.status, "completed");

        let parts = sqlx::query_as::<_, WorkOrderPart>(
            "SELECT * FROM work_order_parts WHERE work_order_id = ?",
        )
        .bind(&order.id)
        .fetch_all(&pool)
        .await
        .unwrap();
        let totals = crate::engine::billing::compute_totals(&order, &parts, 0.22);
        assert_eq!(totals.subtotal, 230.0);
        assert_eq!(totals.tax, 50.60);
        assert_eq!(totals.total, 280.60);
    }

    #[tokio::test]
    async fn test_stock_decrement_on_add_part() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, None).await;
        let pads = seed_inventory(&pool, "PAD-1", 10, 40.0).await;

        let order = create_work_order(&pool, &admin(), create_req(&vehicle.id, 0.0, 75.0), 75.0)
            .await
            .unwrap();
        add_part(&pool, &admin(), &order.id, inventory_part(&pads, 3, None))
            .await
            .unwrap();

        assert_eq!(stock_of(&pool, &pads).await, 7);
        // Unit price fell back to the inventory price
        assert_total_consistent(&pool, &order.id).await;
        let order = get_work_order(&pool, &admin(), &order.id).await.unwrap();
        assert_eq!(order.total_amount, 120.0);
    }

    #[tokio::test]
    async fn test_stock_may_go_negative() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, None).await;
        let pads = seed_inventory(&pool, "PAD-1", 1, 40.0).await;

        let order = create_work_order(&pool, &admin(), create_req(&vehicle.id, 0.0, 75.0), 75.0)
            .await
            .unwrap();
        add_part(&pool, &admin(), &order.id, inventory_part(&pads, 4, None))
            .await
            .unwrap();

        assert_eq!(stock_of(&pool, &pads).await, -3);
    }

    #[tokio::test]
    async fn test_delete_part_does_not_restore_stock() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, None).await;
        let pads = seed_inventory(&pool, "PAD-1", 10, 40.0).await;

        let order = create_work_order(&pool, &admin(), create_req(&vehicle.id, 1.0, 75.0), 75.0)
            .await
            .unwrap();
        let part = add_part(&pool, &admin(), &order.id, inventory_part(&pads, 3, None))
            .await
            .unwrap();
        assert_eq!(stock_of(&pool, &pads).await, 7);

        delete_part(&pool, &admin(), &order.id, &part.id).await.unwrap();

        assert_eq!(stock_of(&pool, &pads).await, 7);
        let order = get_work_order(&pool, &admin(), &order.id).await.unwrap();
        assert_eq!(order.total_amount, 75.0);
        assert_total_consistent(&pool, &order.id).await;
    }

    #[tokio::test]
    async fn test_custom_part_rejection() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, None).await;

        let order = create_work_order(&pool, &admin(), create_req(&vehicle.id, 2.0, 75.0), 75.0)
            .await
            .unwrap();

        let req = AddPartRequest {
            is_custom: false,
            inventory_item_id: None,
            custom_name: None,
            custom_sku: None,
            quantity_used: 1,
            unit_price: Some(10.0),
            cost_price: None,
        };
        let err = add_part(&pool, &admin(), &order.id, req).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation { field: "inventory_item_id", .. }));

        // Nothing inserted, total untouched
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM work_order_parts WHERE work_order_id = ?")
                .bind(&order.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 0);
        let order = get_work_order(&pool, &admin(), &order.id).await.unwrap();
        assert_eq!(order.total_amount, 150.0);
    }

    #[tokio::test]
    async fn test_part_cannot_be_both_custom_and_stocked() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, None).await;
        let pads = seed_inventory(&pool, "PAD-1", 10, 40.0).await;

        let order = create_work_order(&pool, &admin(), create_req(&vehicle.id, 0.0, 75.0), 75.0)
            .await
            .unwrap();

        let req = AddPartRequest {
            is_custom: true,
            inventory_item_id: Some(pads.clone()),
            custom_name: Some("Gasket".to_string()),
            custom_sku: None,
            quantity_used: 1,
            unit_price: Some(5.0),
            cost_price: None,
        };
        let err = add_part(&pool, &admin(), &order.id, req).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
        assert_eq!(stock_of(&pool, &pads).await, 10);
    }

    #[tokio::test]
    async fn test_terminal_state_locks_parts() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, None).await;
        let pads = seed_inventory(&pool, "PAD-1", 10, 40.0).await;

        let order = create_work_order(&pool, &admin(), create_req(&vehicle.id, 1.0, 75.0), 75.0)
            .await
            .unwrap();
        let part = add_part(&pool, &admin(), &order.id, inventory_part(&pads, 2, None))
            .await
            .unwrap();
        update_work_order(
            &pool,
            &admin(),
            &order.id,
            WorkOrderUpdate::Admin(AdminWorkOrderUpdate {
                status: Some("completed".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        let add = add_part(&pool, &admin(), &order.id, inventory_part(&pads, 1, None)).await;
        assert!(matches!(add, Err(EngineError::Forbidden(_))));

        let upd = update_part(
            &pool,
            &admin(),
            &order.id,
            &part.id,
            UpdatePartRequest {
                quantity_used: Some(5),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(upd, Err(EngineError::Forbidden(_))));

        let del = delete_part(&pool, &admin(), &order.id, &part.id).await;
        assert!(matches!(del, Err(EngineError::Forbidden(_))));

        // Parts and total unchanged
        let order = get_work_order(&pool, &admin(), &order.id).await.unwrap();
        assert_eq!(order.total_amount, 155.0);
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM work_order_parts WHERE work_order_id = ?")
                .bind(&order.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
        assert_eq!(stock_of(&pool, &pads).await, 8);
    }

    #[tokio::test]
    async fn test_mechanic_role_containment() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, None).await;
        let assigned = seed_mechanic(&pool, "u-assigned").await;
        let other = seed_mechanic(&pool, "u-other").await;

        let mut req = create_req(&vehicle.id, 1.0, 75.0);
        req.assigned_mechanic = Some(assigned.id.clone());
        let order = create_work_order(&pool, &admin(), req, 75.0).await.unwrap();

        // Assigned mechanic sees it; another mechanic gets the same answer as
        // for an order that does not exist
        assert!(get_work_order(&pool, &assigned, &order.id).await.is_ok());
        let err = get_work_order(&pool, &other, &order.id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        assert_eq!(list_work_orders(&pool, &assigned).await.unwrap().len(), 1);
        assert!(list_work_orders(&pool, &other).await.unwrap().is_empty());

        let upd = update_work_order(
            &pool,
            &other,
            &order.id,
            WorkOrderUpdate::Mechanic(MechanicWorkOrderUpdate {
                status: Some("in_progress".to_string()),
                description: None,
            }),
        )
        .await;
        assert!(matches!(upd, Err(EngineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mechanic_update_ignores_forbidden_fields() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, None).await;
        let mechanic = seed_mechanic(&pool, "u-mech").await;

        let mut req = create_req(&vehicle.id, 2.0, 75.0);
        req.assigned_mechanic = Some(mechanic.id.clone());
        let order = create_work_order(&pool, &admin(), req, 75.0).await.unwrap();

        // The wire payload carries labor_rate; the mechanic shape has nowhere
        // to put it, so only status and description survive deserialization.
        let body = serde_json::json!({
            "status": "completed",
            "labor_rate": 999.0,
            "assigned_mechanic": "u-other"
        });
        let narrowed: MechanicWorkOrderUpdate = serde_json::from_value(body).unwrap();

        let order = update_work_order(
            &pool,
            &mechanic,
            &order.id,
            WorkOrderUpdate::Mechanic(narrowed),
        )
        .await
        .unwrap();

        assert_eq!(order.status, "completed");
        assert_eq!(order.labor_rate, 75.0);
        assert_eq!(order.assigned_mechanic.as_deref(), Some("u-mech"));
        assert_total_consistent(&pool, &order.id).await;
    }

    #[tokio::test]
    async fn test_mechanic_cannot_create_or_delete() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, None).await;
        let mechanic = seed_mechanic(&pool, "u-mech").await;

        let err = create_work_order(&pool, &mechanic, create_req(&vehicle.id, 1.0, 75.0), 75.0)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        let order = create_work_order(&pool, &admin(), create_req(&vehicle.id, 1.0, 75.0), 75.0)
            .await
            .unwrap();
        let err = delete_work_order(&pool, &mechanic, &order.id).await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_labor_update_recomputes_total() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, None).await;
        let pads = seed_inventory(&pool, "PAD-1", 10, 40.0).await;

        let order = create_work_order(&pool, &admin(), create_req(&vehicle.id, 2.0, 75.0), 75.0)
            .await
            .unwrap();
        add_part(&pool, &admin(), &order.id, inventory_part(&pads, 2, None))
            .await
            .unwrap();

        let order = update_work_order(
            &pool,
            &admin(),
            &order.id,
            WorkOrderUpdate::Admin(AdminWorkOrderUpdate {
                labor_hours: Some(3.0),
                labor_rate: Some(80.0),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert_eq!(order.total_amount, 3.0 * 80.0 + 2.0 * 40.0);
        assert_total_consistent(&pool, &order.id).await;
    }

    #[tokio::test]
    async fn test_update_part_recomputes_total() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, None).await;
        let pads = seed_inventory(&pool, "PAD-1", 10, 40.0).await;

        let order = create_work_order(&pool, &admin(), create_req(&vehicle.id, 0.0, 75.0), 75.0)
            .await
            .unwrap();
        let part = add_part(&pool, &admin(), &order.id, inventory_part(&pads, 2, None))
            .await
            .unwrap();

        update_part(
            &pool,
            &admin(),
            &order.id,
            &part.id,
            UpdatePartRequest {
                quantity_used: Some(4),
                unit_price: Some(35.0),
                cost_price: None,
            },
        )
        .await
        .unwrap();

        let order = get_work_order(&pool, &admin(), &order.id).await.unwrap();
        assert_eq!(order.total_amount, 140.0);
        // Updating a line item never touches stock
        assert_eq!(stock_of(&pool, &pads).await, 8);
        assert_total_consistent(&pool, &order.id).await;
    }

    #[tokio::test]
    async fn test_create_resolves_vehicle_by_legacy_id() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, Some(42)).await;

        let order = create_work_order(&pool, &admin(), create_req("42", 1.0, 75.0), 75.0)
            .await
            .unwrap();
        assert_eq!(order.vehicle_id, vehicle.id);
        assert_eq!(order.customer_id, vehicle.customer_id);
    }

    #[tokio::test]
    async fn test_create_unknown_vehicle_is_not_found() {
        let pool = test_pool().await;
        seed_vehicle(&pool, None).await;

        let err = create_work_order(&pool, &admin(), create_req("9999", 1.0, 75.0), 75.0)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_status_rejected() {
        let pool = test_pool().await;
        let vehicle = seed_vehicle(&pool, None).await;

        let order = create_work_order(&pool, &admin(), create_req(&vehicle.id, 1.0, 75.0), 75.0)
            .await
            .unwrap();
        let err = update_work_order(
            &pool,
            &admin(),
            &order.id,
            WorkOrderUpdate::Admin(AdminWorkOrderUpdate {
                status: Some("cancelled".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation { field: "status", .. }));
    }
}
