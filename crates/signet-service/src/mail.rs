use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::MailConfig;

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    Activation,
    Welcome,
    PasswordReset,
}

/// Template context for outgoing mail. `token` carries the activation or
/// password-reset token where the template embeds one.
#[derive(Debug, Clone, Default)]
pub struct MailContext {
    pub first_name: String,
    pub token: Option<String>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// Notification dispatch seam. The account lifecycle treats sends as
/// fire-and-forget: a delivery error is logged by the caller and never rolls
/// back the mutation that triggered it.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, kind: MailKind, to: &str, ctx: &MailContext) -> Result<(), MailError>;
}

/// Render the subject and text body for a notification.
///
/// Subject lines are part of the user-visible contract; tests pin them.
pub fn render(kind: MailKind, ctx: &MailContext) -> (String, String) {
    match kind {
        MailKind::Activation => (
            format!("Dear {}, your account is created", ctx.first_name),
            format!(
                "Hi {},\n\nYour account has been created. Activate it with the \
                 token below before it expires:\n\n{}\n",
                ctx.first_name,
                ctx.token.as_deref().unwrap_or_default(),
            ),
        ),
        MailKind::Welcome => (
            format!("Welcome {}", ctx.first_name),
            format!(
                "Hi {},\n\nYour account is now active. Welcome aboard!\n",
                ctx.first_name,
            ),
        ),
        MailKind::PasswordReset => (
            "Password reset".to_string(),
            format!(
                "Hi {},\n\nUse the token below to choose a new password. If you \
                 did not request this, you can ignore this message.\n\n{}\n",
                ctx.first_name,
                ctx.token.as_deref().unwrap_or_default(),
            ),
        ),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    sender: EmailAddress,
    to: Vec<EmailAddress>,
    subject: String,
    text_content: String,
}

/// Brevo transactional-email sender.
pub struct BrevoMailer {
    client: reqwest::Client,
    config: MailConfig,
}

impl BrevoMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send(&self, kind: MailKind, to: &str, ctx: &MailContext) -> Result<(), MailError> {
        let (subject, text) = render(kind, ctx);

        let body = SendEmailBody {
            sender: EmailAddress {
                email: self.config.sender_email.clone(),
                name: self.config.sender_name.clone(),
            },
            to: vec![EmailAddress {
                email: to.to_string(),
                name: None,
            }],
            subject,
            text_content: text,
        };

        let resp = self
            .client
            .post(BREVO_SEND_URL)
            .header("api-key", &self.config.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(MailError::Delivery(format!(
            "Brevo send failed (status={status}): {body}"
        )))
    }
}

/// Stand-in for deployments without a configured mail provider: the send is
/// logged and reported as delivered.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, kind: MailKind, to: &str, ctx: &MailContext) -> Result<(), MailError> {
        let (subject, _) = render(kind, ctx);
        tracing::info!(kind = ?kind, to = %to, subject = %subject, "mail provider not configured, skipping send");
        Ok(())
    }
}
