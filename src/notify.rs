// Notifications
//
// Structured notifications and the Discord webhook sink that delivers them.

use crate::config::{WebhookTarget, WorkflowConfig};
use crate::errors::{Result, WorkflowError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Embed color for successful outcomes (green)
pub const COLOR_SUCCESS: u32 = 0x00ff00;

/// Embed color for failures (red)
pub const COLOR_DANGER: u32 = 0xff0000;

/// Title shown on every notification
pub const NOTIFICATION_TITLE: &str = "Git Workflow Update";

/// Footer tag shown on every notification
pub const NOTIFICATION_FOOTER: &str = "gitpulse";

/// A single message for the notification channel
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Embed title
    pub title: String,
    /// Body text
    pub description: String,
    /// RGB color as an integer
    pub color: u32,
    /// When the notification was created
    pub timestamp: DateTime<Utc>,
    /// Footer text
    pub footer: String,
}

impl Notification {
    /// Build a notification stamped with the current time
    pub fn new(description: impl Into<String>, color: u32) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            description: description.into(),
            color,
            timestamp: Utc::now(),
            footer: NOTIFICATION_FOOTER.to_string(),
        }
    }

    /// Discord webhook body with a single embed
    pub fn to_webhook_body(&self) -> Value {
        json!({
            "embeds": [{
                "title": self.title,
                "description": self.description,
                "color": self.color,
                "timestamp": self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                "footer": { "text": self.footer },
            }]
        })
    }
}

/// Destination for notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification; delivery is all-or-nothing
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Sink posting embeds to a Discord webhook
#[derive(Debug, Clone)]
pub struct DiscordWebhook {
    client: reqwest::Client,
    target: WebhookTarget,
}

impl DiscordWebhook {
    /// Create a sink for the configured webhook
    pub fn new(config: &WorkflowConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.notification_timeout)
            .build()
            .map_err(|e| {
                WorkflowError::config_error(format!("Failed to build HTTP client: {}", e), None)
            })?;

        Ok(Self {
            client,
            target: config.notification_target.clone(),
        })
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhook {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        debug!("Posting notification to {:?}", self.target);

        let response = self
            .client
            .post(self.target.url().clone())
            .json(&notification.to_webhook_body())
            .send()
            .await
            .map_err(|e| {
                // reqwest errors embed the URL, which carries the webhook token
                WorkflowError::delivery_error(e.without_url().to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Webhook rejected notification: {}", status);
            return Err(WorkflowError::delivery_error(status.to_string()));
        }

        Ok(())
    }
}
