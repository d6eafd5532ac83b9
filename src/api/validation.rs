//! Input validation for API requests.
//!
//! Format-level checks on request data. Business rules (ownership, state
//! terminality, stock effects) live in the engine; this module only rejects
//! inputs that could never be valid.
//!
//! For collecting multiple validation errors and returning them as an
//! ApiError, use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Permissive email shape check; deliverability is not our problem
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^@\s]+@[^@\s]+\.[^@\s]+$"
    ).unwrap();

    /// Phone numbers: digits with common separators and an optional +prefix
    static ref PHONE_REGEX: Regex = Regex::new(
        r"^\+?[0-9][0-9 ().\-]{4,24}$"
    ).unwrap();

    /// SKUs: uppercase alphanumeric with dashes (e.g. PAD-1, OIL-5W30)
    static ref SKU_REGEX: Regex = Regex::new(
        r"^[A-Z0-9]([A-Z0-9-]*[A-Z0-9])?$"
    ).unwrap();

    /// VINs: 11-17 chars, no I/O/Q per ISO 3779
    static ref VIN_REGEX: Regex = Regex::new(
        r"^[A-HJ-NPR-Z0-9]{11,17}$"
    ).unwrap();
}

/// Validate a display name (customer, vehicle make/model, part name)
pub fn validate_name(name: &str, field: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{} is required", field));
    }

    if name.len() > 120 {
        return Err(format!("{} is too long (max 120 characters)", field));
    }

    Ok(())
}

/// Validate a work order or appointment title/description field
pub fn validate_text(text: &Option<String>, field: &str, max: usize) -> Result<(), String> {
    if let Some(t) = text {
        if t.len() > max {
            return Err(format!("{} is too long (max {} characters)", field, max));
        }
    }

    Ok(())
}

/// Validate an email address (optional on customers, required on users)
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }

    Ok(())
}

/// Validate a phone number (optional field)
pub fn validate_phone(phone: &Option<String>) -> Result<(), String> {
    if let Some(p) = phone {
        if p.is_empty() {
            return Ok(()); // Empty string treated as no phone
        }

        if !PHONE_REGEX.is_match(p) {
            return Err("Invalid phone number format".to_string());
        }
    }

    Ok(())
}

/// Validate a stock-keeping unit
pub fn validate_sku(sku: &str) -> Result<(), String> {
    if sku.is_empty() {
        return Err("SKU is required".to_string());
    }

    if sku.len() > 40 {
        return Err("SKU is too long (max 40 characters)".to_string());
    }

    if !SKU_REGEX.is_match(sku) {
        return Err(
            "SKU must be uppercase alphanumeric with dashes, starting and ending with alphanumeric"
                .to_string(),
        );
    }

    Ok(())
}

/// Validate a vehicle identification number (optional field)
pub fn validate_vin(vin: &Option<String>) -> Result<(), String> {
    if let Some(v) = vin {
        if v.is_empty() {
            return Ok(()); // Empty string treated as no VIN
        }

        if !VIN_REGEX.is_match(v) {
            return Err("Invalid VIN: 11-17 characters, letters I, O and Q not allowed".to_string());
        }
    }

    Ok(())
}

/// Validate a vehicle model year (optional field)
pub fn validate_year(year: Option<i64>) -> Result<(), String> {
    if let Some(y) = year {
        if !(1900..=2100).contains(&y) {
            return Err("Year must be between 1900 and 2100".to_string());
        }
    }

    Ok(())
}

/// Validate a non-negative money or hours amount
pub fn validate_non_negative(value: f64, field: &str) -> Result<(), String> {
    if value < 0.0 {
        return Err(format!("{} cannot be negative", field));
    }

    if !value.is_finite() {
        return Err(format!("{} must be a finite number", field));
    }

    Ok(())
}

/// Validate a UUID string
pub fn validate_uuid(id: &str, field_name: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if uuid::Uuid::parse_str(id).is_err() {
        return Err(format!("Invalid {} format", field_name));
    }

    Ok(())
}

/// Validate an RFC 3339 timestamp (appointment dates)
pub fn validate_timestamp(raw: &str, field: &str) -> Result<(), String> {
    if raw.is_empty() {
        return Err(format!("{} is required", field));
    }

    if chrono::DateTime::parse_from_rfc3339(raw).is_err() {
        return Err(format!("Invalid {}: expected an RFC 3339 timestamp", field));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("mechanic@shop.example").is_ok());
        assert!(validate_email("a.b+tag@domain.co").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("two@@signs.com").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone(&Some("+1 (555) 123-4567".to_string())).is_ok());
        assert!(validate_phone(&Some("555-0100".to_string())).is_ok());
        assert!(validate_phone(&None).is_ok());
        assert!(validate_phone(&Some(String::new())).is_ok());

        assert!(validate_phone(&Some("call me".to_string())).is_err());
        assert!(validate_phone(&Some("123".to_string())).is_err());
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("PAD-1").is_ok());
        assert!(validate_sku("OIL-5W30").is_ok());
        assert!(validate_sku("X").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("pad-1").is_err()); // lowercase
        assert!(validate_sku("-PAD").is_err());
        assert!(validate_sku("PAD-").is_err());
        assert!(validate_sku("PAD 1").is_err()); // space
    }

    #[test]
    fn test_validate_vin() {
        assert!(validate_vin(&Some("1HGCM82633A004352".to_string())).is_ok());
        assert!(validate_vin(&Some("JH4KA7561PC008269".to_string())).is_ok());
        assert!(validate_vin(&None).is_ok());

        assert!(validate_vin(&Some("SHORT".to_string())).is_err());
        assert!(validate_vin(&Some("1HGCM82633A0043IO".to_string())).is_err()); // I and O
    }

    #[test]
    fn test_validate_year() {
        assert!(validate_year(Some(1998)).is_ok());
        assert!(validate_year(Some(2025)).is_ok());
        assert!(validate_year(None).is_ok());

        assert!(validate_year(Some(1850)).is_err());
        assert!(validate_year(Some(3000)).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative(0.0, "labor_hours").is_ok());
        assert!(validate_non_negative(2.5, "labor_hours").is_ok());

        assert!(validate_non_negative(-1.0, "labor_hours").is_err());
        assert!(validate_non_negative(f64::NAN, "labor_hours").is_err());
        assert!(validate_non_negative(f64::INFINITY, "labor_hours").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "customer_id").is_ok());
        assert!(validate_uuid("", "customer_id").is_err());
        assert!(validate_uuid("not-a-uuid", "customer_id").is_err());
    }

    #[test]
    fn test_validate_timestamp() {
        assert!(validate_timestamp("2025-06-01T09:30:00Z", "appointment_date").is_ok());
        assert!(validate_timestamp("2025-06-01T09:30:00+02:00", "appointment_date").is_ok());

        assert!(validate_timestamp("", "appointment_date").is_err());
        assert!(validate_timestamp("next tuesday", "appointment_date").is_err());
        assert!(validate_timestamp("2025-06-01", "appointment_date").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Dana Field", "Name").is_ok());
        assert!(validate_name("", "Name").is_err());
        assert!(validate_name("   ", "Name").is_err());
        assert!(validate_name(&"x".repeat(121), "Name").is_err());
    }
}
