//! Vehicle models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: String,
    /// Integer id carried over from the pre-migration schema. Kept so older
    /// callers can still look a vehicle up by it.
    pub legacy_id: Option<i64>,
    pub customer_id: String,
    pub make: String,
    pub model: String,
    pub year: Option<i64>,
    pub license_plate: Option<String>,
    pub vin: Option<String>,
    pub created_at: String,
}

/// A vehicle reference as supplied by a caller: either the canonical UUID or
/// a legacy integer id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VehicleKey {
    Canonical(String),
    Legacy(i64),
}

impl VehicleKey {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(n) => VehicleKey::Legacy(n),
            Err(_) => VehicleKey::Canonical(raw.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateVehicleRequest {
    pub customer_id: String,
    pub make: String,
    pub model: String,
    pub year: Option<i64>,
    pub license_plate: Option<String>,
    pub vin: Option<String>,
    pub legacy_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVehicleRequest {
    pub customer_id: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub license_plate: Option<String>,
    pub vin: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_key_parse() {
        assert_eq!(VehicleKey::parse("42"), VehicleKey::Legacy(42));
        assert_eq!(
            VehicleKey::parse("550e8400-e29b-41d4-a716-446655440000"),
            VehicleKey::Canonical("550e8400-e29b-41d4-a716-446655440000".to_string())
        );
    }
}
