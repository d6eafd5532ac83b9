//! Invoice computation.
//!
//! Pure functions over a work order snapshot and its parts list. Nothing
//! here touches the database or mutates its inputs, so the preview and the
//! downloadable rendition of an invoice always agree: they are fed by the
//! same call.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::db::{WorkOrder, WorkOrderPart};

/// Days until an invoice falls due.
pub const DUE_DAYS: i64 = 30;

/// Round to whole cents. All displayed amounts pass through here.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceTotals {
    pub parts_total: f64,
    pub labor_total: f64,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax: f64,
    pub total: f64,
}

/// One displayed row of the invoice.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub number: String,
    pub work_order_id: String,
    pub issued_on: NaiveDate,
    pub due_on: NaiveDate,
    pub labor: InvoiceLine,
    pub parts: Vec<InvoiceLine>,
    #[serde(flatten)]
    pub totals: InvoiceTotals,
}

/// Compute the totals block for an order and its parts. The tax rate is the
/// configured constant; it is never derived from any entity.
pub fn compute_totals(order: &WorkOrder, parts: &[WorkOrderPart], tax_rate: f64) -> InvoiceTotals {
    let parts_total = round_cents(
        parts
            .iter()
            .map(|p| p.quantity_used as f64 * p.unit_price)
            .sum(),
    );
    let labor_total = round_cents(order.labor_hours * order.labor_rate);
    let subtotal = round_cents(parts_total + labor_total);
    let tax = round_cents(subtotal * tax_rate);
    let total = round_cents(subtotal + tax);

    InvoiceTotals {
        parts_total,
        labor_total,
        subtotal,
        tax_rate,
        tax,
        total,
    }
}

/// Derive the invoice number from the order id: first 8 hex characters,
/// uppercased, prefixed `INV-`.
pub fn invoice_number(order_id: &str) -> String {
    let short: String = order_id
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .take(8)
        .collect();
    format!("INV-{}", short.to_uppercase())
}

/// Assemble the full invoice. `part_names` resolves inventory-backed lines
/// to their item names, positionally matching `parts`; the issue date is
/// passed in so the function stays deterministic.
pub fn build_invoice(
    order: &WorkOrder,
    parts: &[WorkOrderPart],
    part_names: &[Option<String>],
    tax_rate: f64,
    issued_on: NaiveDate,
) -> Invoice {
    let totals = compute_totals(order, parts, tax_rate);

    let labor = InvoiceLine {
        description: format!("Labor — {}", order.title),
        quantity: order.labor_hours,
        unit_price: order.labor_rate,
        amount: totals.labor_total,
    };

    let part_lines = parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let name = part_names.get(i).and_then(|n| n.as_deref());
            InvoiceLine {
                description: part.display_name(name),
                quantity: part.quantity_used as f64,
                unit_price: part.unit_price,
                amount: round_cents(part.quantity_used as f64 * part.unit_price),
            }
        })
        .collect();

    Invoice {
        number: invoice_number(&order.id),
        work_order_id: order.id.clone(),
        issued_on,
        due_on: issued_on + Duration::days(DUE_DAYS),
        labor,
        parts: part_lines,
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(hours: f64, rate: f64) -> WorkOrder {
        WorkOrder {
            id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            vehicle_id: "v1".to_string(),
            customer_id: "c1".to_string(),
            assigned_mechanic: None,
            title: "Brake replacement".to_string(),
            description: None,
            status: "completed".to_string(),
            labor_hours: hours,
            labor_rate: rate,
            total_amount: 0.0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn part(qty: i64, price: f64) -> WorkOrderPart {
        WorkOrderPart {
            id: "p1".to_string(),
            work_order_id: "w1".to_string(),
            inventory_item_id: Some("i1".to_string()),
            custom_name: None,
            custom_sku: None,
            quantity_used: qty,
            unit_price: price,
            cost_price: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_brake_replacement_totals() {
        let totals = compute_totals(&order(2.0, 75.0), &[part(2, 40.0)], 0.22);
        assert_eq!(totals.labor_total, 150.0);
        assert_eq!(totals.parts_total, 80.0);
        assert_eq!(totals.subtotal, 230.0);
        assert_eq!(totals.tax, 50.60);
        assert_eq!(totals.total, 280.60);
    }

    #[test]
    fn test_computation_is_idempotent() {
        let o = order(3.5, 82.0);
        let parts = vec![part(2, 40.0), part(1, 12.99)];
        let first = compute_totals(&o, &parts, 0.22);
        let second = compute_totals(&o, &parts, 0.22);
        // Bit-identical, not merely approximately equal
        assert_eq!(first, second);
    }

    #[test]
    fn test_alternate_tax_rate() {
        let totals = compute_totals(&order(2.0, 75.0), &[part(2, 40.0)], 0.08);
        assert_eq!(totals.tax, 18.40);
        assert_eq!(totals.total, 248.40);
    }

    #[test]
    fn test_empty_parts() {
        let totals = compute_totals(&order(1.0, 60.0), &[], 0.22);
        assert_eq!(totals.parts_total, 0.0);
        assert_eq!(totals.subtotal, 60.0);
    }

    #[test]
    fn test_tax_rounds_to_cents() {
        // 33.33 * 0.22 = 7.3326 -> 7.33
        let totals = compute_totals(&order(0.0, 0.0), &[part(1, 33.33)], 0.22);
        assert_eq!(totals.tax, 7.33);
        assert_eq!(totals.total, 40.66);
    }

    #[test]
    fn test_invoice_number_from_order_id() {
        assert_eq!(
            invoice_number("550e8400-e29b-41d4-a716-446655440000"),
            "INV-550E8400"
        );
    }

    #[test]
    fn test_build_invoice_dates_and_lines() {
        let issued = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let o = order(2.0, 75.0);
        let parts = vec![part(2, 40.0)];
        let names = vec![Some("Brake pads".to_string())];

        let invoice = build_invoice(&o, &parts, &names, 0.22, issued);

        assert_eq!(invoice.number, "INV-550E8400");
        assert_eq!(invoice.due_on, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
        assert_eq!(invoice.parts.len(), 1);
        assert_eq!(invoice.parts[0].description, "Brake pads");
        assert_eq!(invoice.parts[0].amount, 80.0);
        assert_eq!(invoice.labor.amount, 150.0);
        assert_eq!(invoice.totals.total, 280.60);
    }

    #[test]
    fn test_custom_part_keeps_its_own_name() {
        let issued = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let o = order(0.0, 0.0);
        let mut p = part(1, 15.0);
        p.inventory_item_id = None;
        p.custom_name = Some("Salvaged trim clip".to_string());

        let invoice = build_invoice(&o, &[p], &[None], 0.22, issued);
        assert_eq!(invoice.parts[0].description, "Salvaged trim clip");
    }
}
