//! Work order and line-item models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Work order status. Stored as TEXT in the database; parse with
/// [`WorkOrderStatus::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Pending,
    InProgress,
    Completed,
}

impl WorkOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Pending => "pending",
            WorkOrderStatus::InProgress => "in_progress",
            WorkOrderStatus::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(WorkOrderStatus::Pending),
            "in_progress" => Some(WorkOrderStatus::InProgress),
            "completed" => Some(WorkOrderStatus::Completed),
            _ => None,
        }
    }

    /// Every status change goes through here. All transitions between the
    /// three states are currently allowed; restricting one (e.g. reopening a
    /// completed order) only requires changing this function.
    pub fn transition(self, to: WorkOrderStatus) -> Result<WorkOrderStatus, String> {
        Ok(to)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkOrder {
    pub id: String,
    pub vehicle_id: String,
    pub customer_id: String,
    pub assigned_mechanic: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub labor_hours: f64,
    pub labor_rate: f64,
    pub total_amount: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl WorkOrder {
    pub fn status(&self) -> WorkOrderStatus {
        WorkOrderStatus::parse(&self.status).unwrap_or(WorkOrderStatus::Pending)
    }

    pub fn is_completed(&self) -> bool {
        self.status() == WorkOrderStatus::Completed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkOrderPart {
    pub id: String,
    pub work_order_id: String,
    pub inventory_item_id: Option<String>,
    pub custom_name: Option<String>,
    pub custom_sku: Option<String>,
    pub quantity_used: i64,
    pub unit_price: f64,
    /// Internal cost, never shown on customer-facing documents.
    pub cost_price: Option<f64>,
    pub created_at: String,
}

impl WorkOrderPart {
    /// Display name for invoices: inventory parts resolve their item name at
    /// render time, custom parts carry their own.
    pub fn display_name(&self, inventory_name: Option<&str>) -> String {
        if let Some(name) = &self.custom_name {
            return name.clone();
        }
        inventory_name.unwrap_or("Part").to_string()
    }
}

// DTOs for API

#[derive(Debug, Deserialize)]
pub struct CreateWorkOrderRequest {
    /// Canonical UUID or legacy integer id, as a string either way.
    pub vehicle_id: String,
    pub title: String,
    pub description: Option<String>,
    pub assigned_mechanic: Option<String>,
    #[serde(default)]
    pub labor_hours: f64,
    /// Falls back to the configured default rate when omitted.
    pub labor_rate: Option<f64>,
}

/// Full update payload. Only admins can submit this shape.
#[derive(Debug, Default, Deserialize)]
pub struct AdminWorkOrderUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub assigned_mechanic: Option<String>,
    pub labor_hours: Option<f64>,
    pub labor_rate: Option<f64>,
}

/// The narrow update shape a mechanic is allowed. Anything else in the
/// request body simply has no field to land in.
#[derive(Debug, Default, Deserialize)]
pub struct MechanicWorkOrderUpdate {
    pub status: Option<String>,
    pub description: Option<String>,
}

impl From<MechanicWorkOrderUpdate> for AdminWorkOrderUpdate {
    fn from(update: MechanicWorkOrderUpdate) -> Self {
        Self {
            status: update.status,
            description: update.description,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddPartRequest {
    #[serde(default)]
    pub is_custom: bool,
    pub inventory_item_id: Option<String>,
    pub custom_name: Option<String>,
    pub custom_sku: Option<String>,
    pub quantity_used: i64,
    /// Defaults to the inventory item's price for stocked parts.
    pub unit_price: Option<f64>,
    pub cost_price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePartRequest {
    pub quantity_used: Option<i64>,
    pub unit_price: Option<f64>,
    pub cost_price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            WorkOrderStatus::Pending,
            WorkOrderStatus::InProgress,
            WorkOrderStatus::Completed,
        ] {
            assert_eq!(WorkOrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(WorkOrderStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_transition_is_permissive() {
        // The shop moves orders back and forth today; the transition function
        // is the single choke point if that ever tightens.
        assert_eq!(
            WorkOrderStatus::Completed.transition(WorkOrderStatus::Pending),
            Ok(WorkOrderStatus::Pending)
        );
        assert_eq!(
            WorkOrderStatus::Pending.transition(WorkOrderStatus::Completed),
            Ok(WorkOrderStatus::Completed)
        );
    }

    #[test]
    fn test_mechanic_update_narrows_to_allow_list() {
        let update = MechanicWorkOrderUpdate {
            status: Some("completed".to_string()),
            description: Some("replaced pads".to_string()),
        };
        let full: AdminWorkOrderUpdate = update.into();
        assert_eq!(full.status.as_deref(), Some("completed"));
        assert_eq!(full.description.as_deref(), Some("replaced pads"));
        assert!(full.labor_rate.is_none());
        assert!(full.assigned_mechanic.is_none());
        assert!(full.title.is_none());
    }
}
