//! Operator notification when differences are found

use crate::config::NotifyConfig;
use crate::error::NotifyError;
use crate::schema::Difference;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, differences: &[Difference]) -> Result<(), NotifyError>;
}

/// Plain-text body listing every difference
pub fn report_body(differences: &[Difference]) -> Result<String, NotifyError> {
    Ok(format!(
        "Differences detected:\n\n{}",
        serde_json::to_string_pretty(differences)?
    ))
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: String,
}

/// POSTs the report as JSON to a webhook (mail relay, chat bridge, ...)
pub struct WebhookNotifier {
    client: Client,
    url: String,
    sender: String,
    recipient: String,
    subject: String,
}

impl WebhookNotifier {
    pub fn new(client: Client, url: impl Into<String>, config: &NotifyConfig) -> Self {
        Self {
            client,
            url: url.into(),
            sender: config.sender.clone(),
            recipient: config.recipient.clone(),
            subject: config.subject.clone(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, differences: &[Difference]) -> Result<(), NotifyError> {
        let message = Message {
            from: &self.sender,
            to: &self.recipient,
            subject: &self.subject,
            body: report_body(differences)?,
        };

        let response = self.client.post(&self.url).json(&message).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Writes the report to the log instead of delivering it
pub struct LogNotifier {
    subject: String,
}

impl LogNotifier {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            subject: config.subject.clone(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, differences: &[Difference]) -> Result<(), NotifyError> {
        let body = report_body(differences)?;
        tracing::warn!("{}\n{}", self.subject, body);
        Ok(())
    }
}

/// Webhook notifier if one is configured, log notifier otherwise
pub fn from_config(config: &NotifyConfig, client: Client) -> Box<dyn Notifier> {
    match &config.webhook_url {
        Some(url) => Box::new(WebhookNotifier::new(client, url.as_str(), config)),
        None => Box::new(LogNotifier::new(config)),
    }
}
