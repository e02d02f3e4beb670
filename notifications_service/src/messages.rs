// notifications_service/src/messages.rs
// Builders for the two patient emails the clinic sends.

use models::{Appointment, InvoiceData, PrescriptionData};

use crate::mailer::{EmailAttachment, EmailMessage};

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn wrap(clinic_name: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body style=\"font-family: Arial, sans-serif; color: #333;\">\
         <h1>{clinic}</h1>{body}\
         <p style=\"font-size: 12px; color: #666;\">This is an automated email, please do not reply.</p>\
         </body></html>",
        clinic = escape(clinic_name),
        body = body
    )
}

/// Confirmation sent when staff accept a booking. `confirmation_notes` are
/// shown to the patient only; they are never stored on the appointment.
pub fn appointment_confirmation(
    clinic_name: &str,
    appointment: &Appointment,
    confirmation_notes: &str,
) -> EmailMessage {
    let mut body = format!(
        "<h2>Dear {name},</h2>\
         <p>Your appointment request has been accepted.</p>\
         <p><strong>Date:</strong> {date}<br><strong>Time:</strong> {time}<br>\
         <strong>Doctor:</strong> {doctor}<br><strong>Service:</strong> {service}</p>",
        name = escape(&appointment.patient_name),
        date = escape(&appointment.date),
        time = escape(&appointment.time),
        doctor = escape(&appointment.doctor),
        service = escape(&appointment.service),
    );
    if !confirmation_notes.trim().is_empty() {
        body.push_str(&format!(
            "<h3>Important Information from Clinic</h3><p>{}</p>",
            escape(confirmation_notes.trim())
        ));
    }

    EmailMessage {
        to: appointment.patient_email.clone(),
        subject: format!("Appointment Confirmed - {}", clinic_name),
        html: wrap(clinic_name, &body),
        attachments: Vec::new(),
    }
}

/// Prescription and invoice email carrying the generated PDF.
pub fn prescription_delivery(
    clinic_name: &str,
    to: &str,
    patient_name: &str,
    prescription: &PrescriptionData,
    invoice: &InvoiceData,
    pdf: Vec<u8>,
) -> EmailMessage {
    let mut body = format!(
        "<h2>Dear {},</h2><p>Please find your prescription and invoice attached.</p>",
        escape(patient_name)
    );
    if let Some(diagnosis) = prescription.diagnosis.as_deref().filter(|d| !d.trim().is_empty()) {
        body.push_str(&format!("<p><strong>Diagnosis:</strong> {}</p>", escape(diagnosis)));
    }
    if let Some(next_visit) = prescription.next_visit.as_deref().filter(|d| !d.trim().is_empty()) {
        body.push_str(&format!("<p><strong>Next Visit:</strong> {}</p>", escape(next_visit)));
    }
    let billed = invoice.billed_amount();
    if billed > 0.0 {
        body.push_str(&format!("<p><strong>Total Amount:</strong> {:.2}</p>", billed));
    }

    let filename_stem: String = patient_name.split_whitespace().collect::<Vec<_>>().join("_");
    EmailMessage {
        to: to.to_string(),
        subject: format!("Your Prescription & Invoice - {}", clinic_name),
        html: wrap(clinic_name, &body),
        attachments: vec![EmailAttachment {
            filename: format!("Prescription_Invoice_{}.pdf", filename_stem),
            content_type: "application/pdf".to_string(),
            content: pdf,
        }],
    }
}
