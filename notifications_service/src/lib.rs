// notifications_service/src/lib.rs

pub mod mailer;
pub mod messages;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use mailer::{
    DeliveryReceipt, DisabledMailer, EmailAttachment, EmailMessage, HttpRelayMailer, HttpRelaySettings,
    Mailer, NotificationError, send_best_effort,
};
