//! Posting the day's highlights to a Slack incoming webhook.

use std::{fmt::Display, path::Path, time::Duration};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::NotifyConfig,
    format::chat::to_slack_markup,
    summary::{SummaryOutcome, UnavailableReason},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookMessage {
    pub text: String,
    pub unfurl_links: bool,
}

impl WebhookMessage {
    pub fn new(text: String) -> Self {
        Self {
            text,
            unfurl_links: false,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Webhook: Send + Sync {
    async fn post(&self, message: &WebhookMessage) -> Result<()>;
}

pub struct SlackWebhook {
    client: reqwest::Client,
    url: String,
}

impl SlackWebhook {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Webhook for SlackWebhook {
    async fn post(&self, message: &WebhookMessage) -> Result<()> {
        // Webhook urls are secrets, keep them out of error messages.
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| e.without_url())?;
        if !response.status().is_success() {
            bail!("Webhook answered with status {}", response.status());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Turned off for this run.
    Disabled,
    /// No webhook url.
    NotConfigured,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Disabled => write!(f, "notifications turned off"),
            SkipReason::NotConfigured => write!(f, "no webhook configured"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyStatus {
    Sent,
    Skipped(SkipReason),
    Failed,
}

pub struct Notifier {
    webhook: Result<Box<dyn Webhook>, SkipReason>,
}

impl Notifier {
    pub fn new(webhook: Box<dyn Webhook>) -> Self {
        Self {
            webhook: Ok(webhook),
        }
    }

    pub fn disabled() -> Self {
        Self {
            webhook: Err(SkipReason::Disabled),
        }
    }

    pub fn not_configured() -> Self {
        Self {
            webhook: Err(SkipReason::NotConfigured),
        }
    }

    pub fn from_config(config: &NotifyConfig, enabled: bool) -> Result<Self> {
        match (&config.webhook_url, enabled) {
            (_, false) => Ok(Self::disabled()),
            (None, true) => Ok(Self::not_configured()),
            (Some(url), true) => Ok(Self::new(Box::new(SlackWebhook::new(
                url.clone(),
                Duration::from_secs(config.timeout_secs),
            )?))),
        }
    }

    /// Sends a single message. Failures are logged and reported through the status.
    pub async fn notify(&self, date: NaiveDate, outcome: &SummaryOutcome, path: &Path) -> NotifyStatus {
        let webhook = match &self.webhook {
            Ok(v) => v,
            Err(reason) => {
                info!("Skipping notification, {reason}");
                return NotifyStatus::Skipped(*reason);
            }
        };
        let message = compose_message(date, outcome, path);
        match webhook.post(&message).await {
            Ok(()) => {
                info!("Notification sent");
                NotifyStatus::Sent
            }
            Err(e) => {
                warn!("Notification failed: {e:#}");
                NotifyStatus::Failed
            }
        }
    }
}

/// Highlights when there are some, otherwise a note that only the document was written.
pub fn compose_message(date: NaiveDate, outcome: &SummaryOutcome, path: &Path) -> WebhookMessage {
    let day = date.format("%m/%d");
    let path = path.display();
    let text = match outcome {
        SummaryOutcome::Ready(summary) => to_slack_markup(&format!(
            "# 📊 {day} Daily Summary (AI)\n\n{}\n\n---\n**Full report**: `{path}`",
            summary.to_markdown()
        )),
        SummaryOutcome::Unavailable(reason) => {
            let why = match reason {
                UnavailableReason::NotConfigured => {
                    "Highlights are missing because no Gemini API key is configured.".to_string()
                }
                UnavailableReason::Disabled => "Highlights were turned off for this run.".to_string(),
                UnavailableReason::Failed(message) => {
                    format!("Highlights are missing because the Gemini API failed: {message}")
                }
            };
            format!("✅ *{day}* daily report was written.\n\n*Location*: `{path}`\n({why})")
        }
    };
    WebhookMessage::new(text)
}
