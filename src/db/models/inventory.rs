//! Inventory item models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
    pub price: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_level
    }
}

/// Response DTO carrying the derived low-stock flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItemResponse {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
    pub price: f64,
    pub is_low_stock: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<InventoryItem> for InventoryItemResponse {
    fn from(item: InventoryItem) -> Self {
        let is_low_stock = item.is_low_stock();
        Self {
            id: item.id,
            name: item.name,
            sku: item.sku,
            stock_quantity: item.stock_quantity,
            min_stock_level: item.min_stock_level,
            price: item.price,
            is_low_stock,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInventoryItemRequest {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub min_stock_level: i64,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInventoryItemRequest {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub stock_quantity: Option<i64>,
    pub min_stock_level: Option<i64>,
    pub price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(stock: i64, min: i64) -> InventoryItem {
        InventoryItem {
            id: "i1".to_string(),
            name: "Brake pads".to_string(),
            sku: "PAD-1".to_string(),
            stock_quantity: stock,
            min_stock_level: min,
            price: 40.0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_low_stock_at_or_below_threshold() {
        assert!(item(3, 5).is_low_stock());
        assert!(item(5, 5).is_low_stock());
        assert!(!item(6, 5).is_low_stock());
        // Stock can go negative; still low
        assert!(item(-2, 0).is_low_stock());
    }
}
