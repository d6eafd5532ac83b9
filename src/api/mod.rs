mod appointments;
pub mod auth;
mod customers;
mod error;
mod inventory;
mod users;
mod validation;
mod vehicles;
mod work_orders;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::db::User;
use crate::AppState;
use error::ApiError;

/// Guard for endpoints only an admin may call.
fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Administrator access required"))
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/validate", get(auth::validate))
        .route("/setup-status", get(auth::setup_status))
        .route("/setup", post(auth::setup));

    // Protected API routes
    let api_routes = Router::new()
        // Customers
        .route("/customers", get(customers::list_customers))
        .route("/customers", post(customers::create_customer))
        .route("/customers/:id", get(customers::get_customer))
        .route("/customers/:id", put(customers::update_customer))
        .route("/customers/:id", delete(customers::delete_customer))
        .route("/customers/:id/vehicles", get(customers::customer_vehicles))
        // Vehicles
        .route("/vehicles", get(vehicles::list_vehicles))
        .route("/vehicles", post(vehicles::create_vehicle))
        .route("/vehicles/:id", get(vehicles::get_vehicle))
        .route("/vehicles/:id", put(vehicles::update_vehicle))
        .route("/vehicles/:id", delete(vehicles::delete_vehicle))
        // Work orders
        .route("/work-orders", get(work_orders::list_work_orders))
        .route("/work-orders", post(work_orders::create_work_order))
        .route("/work-orders/:id", get(work_orders::get_work_order))
        .route("/work-orders/:id", put(work_orders::update_work_order))
        .route("/work-orders/:id", delete(work_orders::delete_work_order))
        .route("/work-orders/:id/parts", get(work_orders::list_parts))
        .route("/work-orders/:id/parts", post(work_orders::add_part))
        .route("/work-orders/:id/parts/:part_id", patch(work_orders::update_part))
        .route("/work-orders/:id/parts/:part_id", delete(work_orders::delete_part))
        .route("/work-orders/:id/invoice", get(work_orders::get_invoice))
        .route("/work-orders/:id/invoice/html", get(work_orders::get_invoice_html))
        // Inventory
        .route("/inventory", get(inventory::list_inventory))
        .route("/inventory", post(inventory::create_item))
        .route("/inventory/low-stock", get(inventory::list_low_stock))
        .route("/inventory/:id", get(inventory::get_item))
        .route("/inventory/:id", put(inventory::update_item))
        .route("/inventory/:id", delete(inventory::delete_item))
        // Appointments
        .route("/appointments", get(appointments::list_appointments))
        .route("/appointments", post(appointments::create_appointment))
        .route("/appointments/:id", get(appointments::get_appointment))
        .route("/appointments/:id", put(appointments::update_appointment))
        .route("/appointments/:id", delete(appointments::delete_appointment))
        // Users
        .route("/users", get(users::list_users))
        .route("/users", post(users::create_user))
        .route("/users/mechanics", get(users::list_mechanics))
        // Protected by auth
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
