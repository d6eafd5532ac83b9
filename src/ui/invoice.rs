//! Printable invoice document.
//!
//! Renders a computed [`Invoice`] into a standalone HTML page with the shop
//! letterhead. The same render backs the inline preview and the download;
//! only the Content-Disposition header differs.

use crate::config::BillingConfig;
use crate::db::{Customer, Vehicle};
use crate::engine::billing::Invoice;

pub struct InvoiceDocument<'a> {
    pub shop: &'a BillingConfig,
    pub customer: &'a Customer,
    pub vehicle: &'a Vehicle,
    pub invoice: &'a Invoice,
}

/// Escape text for embedding in HTML
fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn money(amount: f64) -> String {
    format!("${:.2}", amount)
}

impl<'a> InvoiceDocument<'a> {
    pub fn render(&self) -> String {
        let invoice = self.invoice;

        let vehicle_line = {
            let year = self
                .vehicle
                .year
                .map(|y| format!("{} ", y))
                .unwrap_or_default();
            let plate = self
                .vehicle
                .license_plate
                .as_ref()
                .map(|p| format!(" · {}", esc(p)))
                .unwrap_or_default();
            format!(
                "{}{} {}{}",
                year,
                esc(&self.vehicle.make),
                esc(&self.vehicle.model),
                plate
            )
        };

        let mut rows = String::new();
        rows.push_str(&format!(
            "<tr><td>{}</td><td class=\"num\">{:.2}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>\n",
            esc(&invoice.labor.description),
            invoice.labor.quantity,
            money(invoice.labor.unit_price),
            money(invoice.labor.amount),
        ));
        for line in &invoice.parts {
            rows.push_str(&format!(
                "<tr><td>{}</td><td class=\"num\">{:.0}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>\n",
                esc(&line.description),
                line.quantity,
                money(line.unit_price),
                money(line.amount),
            ));
        }

        let contact = [
            self.shop.shop_address.as_str(),
            self.shop.shop_phone.as_str(),
            self.shop.shop_email.as_str(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| esc(s))
        .collect::<Vec<_>>()
        .join(" · ");

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{number}</title>
<style>
  body {{ font-family: Georgia, serif; color: #1c1c1c; margin: 2.5rem auto; max-width: 46rem; }}
  header {{ border-bottom: 3px solid #1c1c1c; padding-bottom: 1rem; margin-bottom: 1.5rem; }}
  h1 {{ margin: 0; font-size: 1.6rem; }}
  .contact {{ color: #555; font-size: 0.85rem; }}
  .meta {{ display: flex; justify-content: space-between; margin-bottom: 1.5rem; }}
  .meta h2 {{ font-size: 1.1rem; margin: 0 0 0.3rem; }}
  table {{ width: 100%; border-collapse: collapse; }}
  th, td {{ text-align: left; padding: 0.4rem 0.6rem; border-bottom: 1px solid #ddd; }}
  th {{ border-bottom: 2px solid #1c1c1c; }}
  .num {{ text-align: right; }}
  .totals {{ margin-top: 1rem; width: 18rem; margin-left: auto; }}
  .totals td {{ border: none; padding: 0.2rem 0.6rem; }}
  .totals .grand td {{ border-top: 2px solid #1c1c1c; font-weight: bold; }}
  @media print {{ body {{ margin: 0; }} }}
</style>
</head>
<body>
<header>
  <h1>{shop_name}</h1>
  <div class="contact">{contact}</div>
</header>
<div class="meta">
  <div>
    <h2>Invoice {number}</h2>
    <div>Issued: {issued}</div>
    <div>Due: {due}</div>
  </div>
  <div>
    <h2>Bill to</h2>
    <div>{customer}</div>
    <div class="contact">{vehicle}</div>
  </div>
</div>
<table>
  <thead>
    <tr><th>Description</th><th class="num">Qty</th><th class="num">Unit</th><th class="num">Amount</th></tr>
  </thead>
  <tbody>
{rows}  </tbody>
</table>
<table class="totals">
  <tr><td>Subtotal</td><td class="num">{subtotal}</td></tr>
  <tr><td>Tax ({tax_pct:.0}%)</td><td class="num">{tax}</td></tr>
  <tr class="grand"><td>Total</td><td class="num">{total}</td></tr>
</table>
</body>
</html>
"#,
            number = esc(&invoice.number),
            shop_name = esc(&self.shop.shop_name),
            contact = contact,
            issued = invoice.issued_on,
            due = invoice.due_on,
            customer = esc(&self.customer.name),
            vehicle = vehicle_line,
            rows = rows,
            subtotal = money(invoice.totals.subtotal),
            tax_pct = invoice.totals.tax_rate * 100.0,
            tax = money(invoice.totals.tax),
            total = money(invoice.totals.total),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{WorkOrder, WorkOrderPart};
    use crate::engine::billing::build_invoice;
    use chrono::NaiveDate;

    fn fixture() -> (BillingConfig, Customer, Vehicle, Invoice) {
        let shop = BillingConfig::default();
        let customer = Customer {
            id: "c1".to_string(),
            name: "Dana & Sons".to_string(),
            phone: None,
            email: None,
            address: None,
            created_at: String::new(),
        };
        let vehicle = Vehicle {
            id: "v1".to_string(),
            legacy_id: None,
            customer_id: "c1".to_string(),
            make: "Subaru".to_string(),
            model: "Outback".to_string(),
            year: Some(2019),
            license_plate: Some("ABC-123".to_string()),
            vin: None,
            created_at: String::new(),
        };
        let order = WorkOrder {
            id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            vehicle_id: "v1".to_string(),
            customer_id: "c1".to_string(),
            assigned_mechanic: None,
            title: "Brake replacement".to_string(),
            description: None,
            status: "completed".to_string(),
            labor_hours: 2.0,
            labor_rate: 75.0,
            total_amount: 230.0,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let part = WorkOrderPart {
            id: "p1".to_string(),
            work_order_id: order.id.clone(),
            inventory_item_id: Some("i1".to_string()),
            custom_name: None,
            custom_sku: None,
            quantity_used: 2,
            unit_price: 40.0,
            cost_price: None,
            created_at: String::new(),
        };
        let invoice = build_invoice(
            &order,
            &[part],
            &[Some("Brake pads".to_string())],
            0.22,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        );
        (shop, customer, vehicle, invoice)
    }

    #[test]
    fn test_render_carries_totals_and_number() {
        let (shop, customer, vehicle, invoice) = fixture();
        let html = InvoiceDocument {
            shop: &shop,
            customer: &customer,
            vehicle: &vehicle,
            invoice: &invoice,
        }
        .render();

        assert!(html.contains("INV-550E8400"));
        assert!(html.contains("$230.00"));
        assert!(html.contains("$50.60"));
        assert!(html.contains("$280.60"));
        assert!(html.contains("Brake pads"));
        assert!(html.contains("2019 Subaru Outback"));
    }

    #[test]
    fn test_render_escapes_html() {
        let (shop, mut customer, vehicle, invoice) = fixture();
        customer.name = "Dana <script>alert(1)</script>".to_string();
        let html = InvoiceDocument {
            shop: &shop,
            customer: &customer,
            vehicle: &vehicle,
            invoice: &invoice,
        }
        .render();

        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let (shop, customer, vehicle, invoice) = fixture();
        let doc = InvoiceDocument {
            shop: &shop,
            customer: &customer,
            vehicle: &vehicle,
            invoice: &invoice,
        };
        // Preview and download are the same bytes
        assert_eq!(doc.render(), doc.render());
    }
}
