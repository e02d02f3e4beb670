// models/src/medical/prescription.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flat discount applied to every invoice.
pub const INVOICE_DISCOUNT_RATE: f64 = 0.10;

/// At most this many medicine lines appear on a prescription.
pub const MAX_MEDICINE_LINES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrescriptionData {
    pub patient_name: Option<String>,
    pub age: Option<u32>,
    pub sex: Option<String>,
    pub diagnosis: Option<String>,
    pub doctor_name: Option<String>,
    pub medicine1: Option<String>,
    pub medicine2: Option<String>,
    pub medicine3: Option<String>,
    pub medicine4: Option<String>,
    pub medicine5: Option<String>,
    pub next_visit: Option<String>,
}

impl PrescriptionData {
    /// Non-blank medicine lines, keeping their slot number (1-based).
    pub fn medicines(&self) -> Vec<(usize, &str)> {
        [
            &self.medicine1,
            &self.medicine2,
            &self.medicine3,
            &self.medicine4,
            &self.medicine5,
        ]
        .iter()
        .enumerate()
        .filter_map(|(i, m)| {
            m.as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(|m| (i + 1, m))
        })
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceLine {
    pub service: String,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceData {
    pub invoice_id: Option<String>,
    pub date: Option<String>,
    pub patient_name: Option<String>,
    pub age: Option<u32>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub sex: Option<String>,
    pub doctor_name: Option<String>,
    pub services: Vec<InvoiceLine>,
    pub subtotal: Option<f64>,
    pub discount: Option<f64>,
    pub grand_total: Option<f64>,
    // Older invoice payloads carried the billed figure under these names.
    pub total_amount: Option<f64>,
    pub amount: Option<f64>,
}

/// Subtotal, discount and grand total for a list of priced lines.
pub fn invoice_totals(services: &[InvoiceLine]) -> (f64, f64, f64) {
    let subtotal: f64 = services.iter().map(|line| line.price).sum();
    let discount = subtotal * INVOICE_DISCOUNT_RATE;
    (subtotal, discount, subtotal - discount)
}

impl InvoiceData {
    /// The billed amount: `grandTotal`, then `totalAmount`, then `amount`,
    /// then zero. Zero-valued fields fall through to the next name.
    pub fn billed_amount(&self) -> f64 {
        [self.grand_total, self.total_amount, self.amount]
            .into_iter()
            .flatten()
            .find(|v| *v != 0.0)
            .unwrap_or(0.0)
    }

    pub fn has_totals(&self) -> bool {
        self.subtotal.is_some() || self.discount.is_some() || self.grand_total.is_some()
    }

    /// Fills subtotal/discount/grand total from the line items when the caller
    /// sent none of them. Caller-supplied totals are kept verbatim.
    pub fn with_computed_totals(mut self) -> Self {
        if !self.has_totals() {
            let (subtotal, discount, grand_total) = invoice_totals(&self.services);
            self.subtotal = Some(subtotal);
            self.discount = Some(discount);
            self.grand_total = Some(grand_total);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    Sent,
    Pending,
}

/// Append-only record produced once per appointment at generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub patient_id: Option<String>,
    pub doctor_id: String,
    pub prescription_data: PrescriptionData,
    pub invoice_data: InvoiceData,
    pub pdf_path: String,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_invoice_gets_flat_discount() {
        let invoice = InvoiceData {
            services: vec![InvoiceLine { service: "Root Canal Treatment".into(), price: 2000.0 }],
            ..Default::default()
        }
        .with_computed_totals();
        assert_eq!(invoice.subtotal, Some(2000.0));
        assert_eq!(invoice.discount, Some(200.0));
        assert_eq!(invoice.grand_total, Some(1800.0));
        assert_eq!(invoice.billed_amount(), 1800.0);
    }

    #[test]
    fn caller_totals_are_kept_verbatim() {
        let invoice = InvoiceData {
            services: vec![InvoiceLine { service: "Tooth Whitening".into(), price: 5000.0 }],
            subtotal: Some(5000.0),
            discount: Some(0.0),
            grand_total: Some(4999.0),
            ..Default::default()
        }
        .with_computed_totals();
        assert_eq!(invoice.grand_total, Some(4999.0));
    }

    #[test]
    fn billed_amount_falls_back_through_legacy_names() {
        let invoice = InvoiceData { total_amount: Some(750.0), ..Default::default() };
        assert_eq!(invoice.billed_amount(), 750.0);
        let invoice = InvoiceData { grand_total: Some(0.0), amount: Some(300.0), ..Default::default() };
        assert_eq!(invoice.billed_amount(), 300.0);
        assert_eq!(InvoiceData::default().billed_amount(), 0.0);
    }

    #[test]
    fn medicines_skip_blank_lines() {
        let data = PrescriptionData {
            medicine1: Some("Amoxicillin 500mg".into()),
            medicine3: Some("  ".into()),
            medicine4: Some("Ibuprofen 400mg".into()),
            ..Default::default()
        };
        assert_eq!(data.medicines(), vec![(1, "Amoxicillin 500mg"), (4, "Ibuprofen 400mg")]);
    }
}
