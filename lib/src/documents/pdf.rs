// lib/src/documents/pdf.rs
// Combined prescription + invoice PDF. Page one is the prescription, page two
// the invoice. Layout is plain text in the built-in Helvetica faces.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use models::errors::{ClinicError, ClinicResult};
use models::{InvoiceData, PrescriptionData};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const LEFT_MARGIN_MM: f32 = 20.0;
const TOP_MM: f32 = 277.0;
const BOTTOM_MM: f32 = 20.0;

/// Everything printed on the document, owned so it can move to the blocking
/// pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PrescriptionDocument {
    pub clinic_name: String,
    pub appointment_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub patient_name: String,
    pub doctor: String,
    pub prescription: PrescriptionData,
    pub invoice: InvoiceData,
}

pub trait DocumentRenderer: Send + Sync + 'static {
    fn render(&self, document: &PrescriptionDocument) -> ClinicResult<Vec<u8>>;
}

#[derive(Debug, Default, Clone)]
pub struct PrintPdfRenderer;

/// Writes lines top-down and starts a continuation page when the current
/// one runs out.
struct PageCursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    title: &'static str,
    pages: usize,
    y: f32,
}

impl<'a> PageCursor<'a> {
    fn new(doc: &'a PdfDocumentReference, title: &'static str) -> Self {
        let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), title);
        Self::on_page(doc, doc.get_page(page).get_layer(layer), title)
    }

    fn on_page(doc: &'a PdfDocumentReference, layer: PdfLayerReference, title: &'static str) -> Self {
        Self { doc, layer, title, pages: 1, y: TOP_MM }
    }

    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        if self.y < BOTTOM_MM {
            let (page, layer) =
                self.doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), format!("{} (continued)", self.title));
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.pages += 1;
            self.y = TOP_MM;
            debug!("{} continues on page {}", self.title, self.pages);
        }
        self.layer.use_text(text, size, Mm(LEFT_MARGIN_MM), Mm(self.y), font);
        // Roughly 1.4 line height, points to millimetres.
        self.y -= size * 0.35 * 1.4;
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).unwrap_or("-")
}

fn money(value: Option<f64>) -> String {
    format!("{:.2}", value.unwrap_or(0.0))
}

fn font(doc: &PdfDocumentReference, builtin: BuiltinFont) -> ClinicResult<IndirectFontRef> {
    doc.add_builtin_font(builtin)
        .map_err(|e| ClinicError::DocumentError(format!("failed to load built-in font: {}", e)))
}

impl DocumentRenderer for PrintPdfRenderer {
    fn render(&self, document: &PrescriptionDocument) -> ClinicResult<Vec<u8>> {
        let title = format!("{} Prescription & Invoice", document.clinic_name);
        let (doc, page, layer) = PdfDocument::new(title.as_str(), Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Prescription");
        let regular = font(&doc, BuiltinFont::Helvetica)?;
        let bold = font(&doc, BuiltinFont::HelveticaBold)?;
        let rx = &document.prescription;
        let invoice = &document.invoice;

        let mut cursor = PageCursor::on_page(&doc, doc.get_page(page).get_layer(layer), "Prescription");
        cursor.line(&document.clinic_name, 22.0, &bold);
        cursor.line("PRESCRIPTION", 14.0, &bold);
        cursor.gap(4.0);
        cursor.line(&format!("Date: {}", document.issued_at.format("%Y-%m-%d")), 11.0, &regular);
        cursor.line(&format!("Patient: {}", rx.patient_name.as_deref().unwrap_or(&document.patient_name)), 11.0, &regular);
        cursor.line(
            &format!(
                "Age: {}    Sex: {}",
                rx.age.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string()),
                or_dash(&rx.sex)
            ),
            11.0,
            &regular,
        );
        cursor.line(&format!("Doctor: {}", rx.doctor_name.as_deref().unwrap_or(&document.doctor)), 11.0, &regular);
        cursor.gap(4.0);
        cursor.line("Diagnosis", 12.0, &bold);
        cursor.line(or_dash(&rx.diagnosis), 11.0, &regular);
        cursor.gap(4.0);
        cursor.line("Rx", 12.0, &bold);
        let medicines = rx.medicines();
        if medicines.is_empty() {
            cursor.line("-", 11.0, &regular);
        }
        for (n, medicine) in medicines {
            cursor.line(&format!("{}. {}", n, medicine), 11.0, &regular);
        }
        cursor.gap(4.0);
        cursor.line(&format!("Next visit: {}", or_dash(&rx.next_visit)), 11.0, &regular);

        let mut cursor = PageCursor::new(&doc, "Invoice");
        cursor.line(&document.clinic_name, 22.0, &bold);
        cursor.line("INVOICE", 14.0, &bold);
        cursor.gap(4.0);
        cursor.line(&format!("Invoice: {}", or_dash(&invoice.invoice_id)), 11.0, &regular);
        cursor.line(&format!("Date: {}", or_dash(&invoice.date)), 11.0, &regular);
        cursor.line(
            &format!("Patient: {}", invoice.patient_name.as_deref().unwrap_or(&document.patient_name)),
            11.0,
            &regular,
        );
        cursor.line(
            &format!("Email: {}    Mobile: {}", or_dash(&invoice.email), or_dash(&invoice.mobile)),
            11.0,
            &regular,
        );
        cursor.gap(4.0);
        cursor.line("Services", 12.0, &bold);
        for line in &invoice.services {
            cursor.line(&format!("{}  {:.2}", line.service, line.price), 11.0, &regular);
        }
        cursor.gap(4.0);
        cursor.line(&format!("Subtotal: {}", money(invoice.subtotal)), 11.0, &regular);
        cursor.line(&format!("Discount: {}", money(invoice.discount)), 11.0, &regular);
        cursor.line(&format!("Grand total: {:.2}", invoice.billed_amount()), 12.0, &bold);

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| ClinicError::DocumentError(format!("failed to serialize PDF: {}", e)))?;
        debug!("Rendered prescription PDF for appointment {} ({} bytes)", document.appointment_id, bytes.len());
        Ok(bytes)
    }
}

/// Writes generated PDFs into one directory.
#[derive(Debug, Clone)]
pub struct PrescriptionArchive {
    directory: PathBuf,
}

impl PrescriptionArchive {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file_name(appointment_id: &Uuid, at: DateTime<Utc>) -> String {
        format!("prescription_{}_{}.pdf", appointment_id, at.timestamp_millis())
    }

    /// Stores `bytes` and returns the path written.
    pub async fn store(&self, appointment_id: &Uuid, at: DateTime<Utc>, bytes: &[u8]) -> ClinicResult<PathBuf> {
        fs::create_dir_all(&self.directory).await?;
        let path = self.directory.join(Self::file_name(appointment_id, at));
        fs::write(&path, bytes).await?;
        info!("Saved prescription PDF to {}", path.display());
        Ok(path)
    }

    /// Removes a stored PDF whose prescription was never recorded.
    pub async fn discard(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => info!("Removed orphaned prescription PDF {}", path.display()),
            Err(e) => warn!("Could not remove orphaned prescription PDF {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::InvoiceLine;

    fn document() -> PrescriptionDocument {
        PrescriptionDocument {
            clinic_name: "DentoCare+".into(),
            appointment_id: Uuid::new_v4(),
            issued_at: Utc::now(),
            patient_name: "Asha Rao".into(),
            doctor: "dr-michael-smith".into(),
            prescription: PrescriptionData {
                diagnosis: Some("Dental caries".into()),
                medicine1: Some("Amoxicillin 500mg".into()),
                ..Default::default()
            },
            invoice: InvoiceData {
                services: vec![InvoiceLine { service: "Root Canal Treatment".into(), price: 2000.0 }],
                ..Default::default()
            }
            .with_computed_totals(),
        }
    }

    #[test]
    fn renders_a_pdf() {
        let bytes = PrintPdfRenderer.render(&document()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_invoices_continue_on_a_new_page() {
        let mut long = document();
        long.invoice.services = (1..=120)
            .map(|n| InvoiceLine { service: format!("Scaling session {}", n), price: 500.0 })
            .collect();
        assert!(PrintPdfRenderer.render(&long.clone()).unwrap().starts_with(b"%PDF"));

        let (doc, _, _) = PdfDocument::new("layout", Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "first");
        let regular = font(&doc, BuiltinFont::Helvetica).unwrap();
        let mut cursor = PageCursor::new(&doc, "Invoice");
        for line in &long.invoice.services {
            cursor.line(&line.service, 11.0, &regular);
        }
        assert!(cursor.pages >= 2);
        assert!(cursor.y < TOP_MM);

        let mut short = PageCursor::new(&doc, "Invoice");
        short.line("Subtotal", 11.0, &regular);
        assert_eq!(short.pages, 1);
    }

    #[tokio::test]
    async fn discard_removes_the_stored_file() {
        let dir = tempfile::tempdir().unwrap();
        let archive = PrescriptionArchive::new(dir.path());
        let path = archive.store(&Uuid::new_v4(), Utc::now(), b"%PDF-1.3").await.unwrap();
        archive.discard(&path).await;
        assert!(!path.exists());
        // Already gone: only logged.
        archive.discard(&path).await;
    }

    #[tokio::test]
    async fn archive_names_files_by_appointment_and_time() {
        let dir = tempfile::tempdir().unwrap();
        let archive = PrescriptionArchive::new(dir.path().join("rx"));
        let id = Uuid::new_v4();
        let at = Utc::now();
        let path = archive.store(&id, at, b"%PDF-1.3").await.unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(PrescriptionArchive::file_name(&id, at).as_str())
        );
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.3");
    }
}
