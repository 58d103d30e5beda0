use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::config::AppConfig;

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Email provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl EmailMessage {
    pub fn verification(to: &str, link: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Verify your email".to_string(),
            html: format!(
                "<p>Confirm your email address to start using your contacts.</p>\
                 <p><a target=\"_blank\" href=\"{link}\">Verify email</a></p>"
            ),
        }
    }
}

/// Outbound mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Delivers through the SendGrid v3 HTTP API.
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl SendGridMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from },
            "subject": message.subject,
            "content": [{ "type": "text/html", "value": message.html }],
        });

        let response = self
            .client
            .post(SENDGRID_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected { status, body });
        }

        log::info!("📧 Email sent to {}", message.to);
        Ok(())
    }
}

/// Used when no provider key is configured: the message is only logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        log::warn!(
            "📧 SENDGRID_API_KEY not set, email to {} not delivered: {}",
            message.to,
            message.html
        );
        Ok(())
    }
}

pub fn mailer_from_config(config: &AppConfig) -> Box<dyn Mailer> {
    match &config.sendgrid_api_key {
        Some(key) => Box::new(SendGridMailer::new(key.clone(), config.mail_from.clone())),
        None => Box::new(LogMailer),
    }
}

pub fn verification_link(api_base_url: &str, token: &str) -> String {
    format!("{}/users/verify/{}", api_base_url, token)
}
