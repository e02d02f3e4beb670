// notifications_service/src/mailer.rs

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("email delivery is not configured")]
    Disabled,
    #[error("no recipient address")]
    MissingRecipient,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("relay rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    #[serde(serialize_with = "as_base64")]
    pub content: Vec<u8>,
}

fn as_base64<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<EmailAttachment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Delivers one message. Implementations never retry.
    async fn send(&self, message: &EmailMessage) -> Result<DeliveryReceipt, NotificationError>;
}

/// Stand-in used when no relay is configured; every send reports failure.
#[derive(Debug, Default, Clone)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn send(&self, message: &EmailMessage) -> Result<DeliveryReceipt, NotificationError> {
        debug!("Email to {} not sent: delivery is disabled", message.to);
        Err(NotificationError::Disabled)
    }
}

#[derive(Debug, Clone)]
pub struct HttpRelaySettings {
    pub relay_url: String,
    pub api_key: Option<String>,
    pub from_address: String,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    #[serde(flatten)]
    message: &'a EmailMessage,
}

/// Posts messages as JSON to an HTTP mail relay.
pub struct HttpRelayMailer {
    client: reqwest::Client,
    settings: HttpRelaySettings,
}

impl HttpRelayMailer {
    pub fn new(settings: HttpRelaySettings) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    fn name(&self) -> &'static str {
        "http-relay"
    }

    async fn send(&self, message: &EmailMessage) -> Result<DeliveryReceipt, NotificationError> {
        if message.to.trim().is_empty() {
            return Err(NotificationError::MissingRecipient);
        }

        let payload = RelayPayload { from: &self.settings.from_address, message };
        let mut request = self.client.post(&self.settings.relay_url).json(&payload);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Mail relay rejected message to {}: {} {}", message.to, status, body);
            return Err(NotificationError::Rejected { status: status.as_u16(), body });
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message_id = body
            .get("messageId")
            .or_else(|| body.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);
        info!("Email sent to {} (message id {:?})", message.to, message_id);
        Ok(DeliveryReceipt { message_id })
    }
}

/// Sends `message` and reports only whether it went out. Failures are logged,
/// never returned.
pub async fn send_best_effort(mailer: &dyn Mailer, message: &EmailMessage) -> bool {
    if message.to.trim().is_empty() {
        warn!("Skipping email \"{}\": no recipient address", message.subject);
        return false;
    }
    match mailer.send(message).await {
        Ok(_) => true,
        Err(NotificationError::Disabled) => {
            debug!("Email \"{}\" to {} skipped: delivery disabled", message.subject, message.to);
            false
        }
        Err(e) => {
            warn!("Email \"{}\" to {} failed via {}: {}", message.subject, message.to, mailer.name(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            to: "asha@example.com".into(),
            subject: "Appointment Confirmed".into(),
            html: "<p>hello</p>".into(),
            attachments: vec![EmailAttachment {
                filename: "rx.pdf".into(),
                content_type: "application/pdf".into(),
                content: b"%PDF".to_vec(),
            }],
        }
    }

    #[tokio::test]
    async fn disabled_mailer_always_fails() {
        let result = DisabledMailer.send(&message()).await;
        assert!(matches!(result, Err(NotificationError::Disabled)));
    }

    #[tokio::test]
    async fn relay_mailer_refuses_blank_recipient() {
        let mailer = HttpRelayMailer::new(HttpRelaySettings {
            relay_url: "http://127.0.0.1:9/send".into(),
            api_key: None,
            from_address: "clinic@example.com".into(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        let mut blank = message();
        blank.to = " ".into();
        assert!(matches!(mailer.send(&blank).await, Err(NotificationError::MissingRecipient)));
    }

    #[tokio::test]
    async fn best_effort_send_reports_a_flag() {
        assert!(!send_best_effort(&DisabledMailer, &message()).await);
        let recorder = crate::testing::RecordingMailer::new();
        assert!(send_best_effort(&recorder, &message()).await);
        recorder.set_failing(true);
        assert!(!send_best_effort(&recorder, &message()).await);
        assert_eq!(recorder.sent().await.len(), 1);
    }

    #[test]
    fn attachments_are_base64_on_the_wire() {
        let msg = message();
        let payload = RelayPayload { from: "clinic@example.com", message: &msg };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["from"], "clinic@example.com");
        assert_eq!(json["attachments"][0]["content"], "JVBERg==");
        assert_eq!(json["attachments"][0]["contentType"], "application/pdf");
    }
}
