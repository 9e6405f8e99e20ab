//! Alert delivery
//!
//! Checks hand alerts to an [`AlertSink`] from inside the event callback, so
//! the sink must never block. The daemon uses [`AlertQueue`], which pushes
//! onto a bounded channel drained by the async [`AlertDispatcher`]; the
//! dispatcher writes alerts to the output, stores them and posts them to
//! Discord and generic webhooks.

use crate::config::{AlertConfig, DiscordConfig, WebhookConfig};
use crate::models::CheckAlert;
use crate::output::OutputHandler;
use crate::persistence::AlertStore;
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Capacity of the alert channel
pub const ALERT_QUEUE_CAPACITY: usize = 100;

/// Errors that can occur during alert dispatch
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Alert channel closed")]
    ChannelClosed,

    #[error("Alert queue full")]
    QueueFull,
}

/// Receives every alert raised by a check
pub trait AlertSink: Send + Sync {
    fn dispatch(&self, alert: CheckAlert);
}

/// Async alert dispatcher
///
/// Runs as a tokio task and fans each alert out to the output handler, the
/// alert store and the configured webhooks.
pub struct AlertDispatcher {
    config: AlertConfig,
    client: Client,
    output: Option<OutputHandler>,
    store: Option<Arc<dyn AlertStore>>,
}

impl AlertDispatcher {
    /// Create a dispatcher together with the queue that feeds it
    ///
    /// The dispatcher should be spawned as a tokio task using `run()`.
    pub fn new(config: AlertConfig) -> (Self, AlertQueue, mpsc::Receiver<CheckAlert>) {
        let (tx, rx) = Self::create_channel();
        let dispatcher = AlertDispatcher {
            config,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            output: None,
            store: None,
        };
        (dispatcher, AlertQueue::new(tx), rx)
    }

    pub fn create_channel() -> (mpsc::Sender<CheckAlert>, mpsc::Receiver<CheckAlert>) {
        mpsc::channel(ALERT_QUEUE_CAPACITY)
    }

    /// Write every alert to this output handler
    pub fn with_output(mut self, output: OutputHandler) -> Self {
        self.output = Some(output);
        self
    }

    /// Persist every alert to this store
    pub fn with_store(mut self, store: Arc<dyn AlertStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Run the alert dispatch loop until every queue handle is dropped
    pub async fn run(mut self, mut rx: mpsc::Receiver<CheckAlert>) {
        log::info!("Alert dispatcher started");

        while let Some(alert) = rx.recv().await {
            if let Some(output) = self.output.as_mut() {
                if let Err(e) = output.write_alert(&alert) {
                    log::error!("Failed to write alert: {}", e);
                }
            }

            if let Some(store) = &self.store {
                if let Err(e) = store.store_alert(&alert) {
                    log::error!("Failed to store alert: {}", e);
                }
            }

            if !self.config.enabled {
                continue;
            }

            log::info!(
                "Dispatching alert: {} failed {} ({}/{})",
                alert.player_name,
                alert.check_name,
                alert.violations,
                alert.max_violations
            );

            if let Err(e) = self.dispatch_alert(&alert).await {
                log::error!("Failed to dispatch alert: {}", e);
            }
        }

        if let Some(output) = self.output.as_mut() {
            if let Err(e) = output.flush() {
                log::error!("Failed to flush output: {}", e);
            }
        }
        log::info!("Alert dispatcher stopped");
    }

    /// Dispatch an alert to all configured channels
    async fn dispatch_alert(&self, alert: &CheckAlert) -> Result<(), AlertError> {
        let mut errors = Vec::new();

        if let Some(ref discord) = self.config.discord {
            if let Err(e) = self.send_discord_alert(discord, alert).await {
                log::error!("Discord alert failed: {}", e);
                errors.push(e);
            }
        }

        for webhook in &self.config.webhooks {
            if let Err(e) = self.send_generic_webhook(webhook, alert).await {
                log::error!("Webhook {} failed: {}", webhook.name, e);
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.remove(0))
        }
    }

    async fn send_discord_alert(
        &self,
        config: &DiscordConfig,
        alert: &CheckAlert,
    ) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&config.webhook_url)
            .json(&discord_payload(config, alert))
            .send()
            .await?;

        if !response.status().is_success() {
            log::warn!("Discord returned non-success status: {}", response.status());
        }

        Ok(())
    }

    async fn send_generic_webhook(
        &self,
        config: &WebhookConfig,
        alert: &CheckAlert,
    ) -> Result<(), AlertError> {
        let method = config.method.as_deref().unwrap_or("POST");

        let mut request = match method.to_uppercase().as_str() {
            "PUT" => self.client.put(&config.url),
            _ => self.client.post(&config.url),
        };

        if let Some(ref headers) = config.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }

        let response = request.json(alert).send().await?;

        if !response.status().is_success() {
            log::warn!(
                "Webhook {} returned non-success status: {}",
                config.name,
                response.status()
            );
        }

        Ok(())
    }
}

/// Discord embed for an alert
fn discord_payload(config: &DiscordConfig, alert: &CheckAlert) -> serde_json::Value {
    let color = if alert.punish {
        0xFF0000 // Red
    } else if alert.experimental {
        0xFFCC00 // Yellow
    } else {
        0xFF6600 // Orange
    };

    let timestamp = chrono::DateTime::from_timestamp_millis(alert.timestamp)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();

    let mut fields = vec![
        serde_json::json!({ "name": "Player", "value": &alert.player_name, "inline": true }),
        serde_json::json!({ "name": "Check", "value": &alert.check_name, "inline": true }),
        serde_json::json!({
            "name": "Violations",
            "value": format!("{}/{}", alert.violations, alert.max_violations),
            "inline": true
        }),
    ];
    for field in alert.evidence.fields() {
        fields.push(serde_json::json!({
            "name": &field.name,
            "value": field.value.to_string(),
            "inline": true
        }));
    }

    let title = if alert.punish {
        format!(":hammer: {} punished for {}", alert.player_name, alert.check_name)
    } else {
        format!(":shield: {}", alert.check_name)
    };

    serde_json::json!({
        "username": config.username.as_deref().unwrap_or("TotemWatch"),
        "embeds": [{
            "title": title,
            "description": &alert.description,
            "color": color,
            "fields": fields,
            "timestamp": timestamp,
            "footer": {
                "text": format!("TotemWatch | {}", alert.player_id)
            }
        }]
    })
}

/// Non-blocking alert producer for use inside event callbacks
#[derive(Clone)]
pub struct AlertQueue {
    tx: mpsc::Sender<CheckAlert>,
}

impl AlertQueue {
    pub fn new(tx: mpsc::Sender<CheckAlert>) -> Self {
        AlertQueue { tx }
    }

    /// Queue an alert for dispatch (non-blocking)
    ///
    /// If the queue is full the alert is dropped and a warning logged.
    pub fn queue_alert(&self, alert: CheckAlert) -> Result<(), AlertError> {
        self.tx.try_send(alert).map_err(|e| match e {
            mpsc::error::TrySendError::Full(alert) => {
                log::warn!(
                    "Alert queue full, dropping {} alert for {}",
                    alert.check_name,
                    alert.player_name
                );
                AlertError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => {
                log::warn!("Alert queue closed");
                AlertError::ChannelClosed
            }
        })
    }

    pub async fn queue_alert_async(&self, alert: CheckAlert) -> Result<(), AlertError> {
        self.tx
            .send(alert)
            .await
            .map_err(|_| AlertError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl AlertSink for AlertQueue {
    fn dispatch(&self, alert: CheckAlert) {
        // Failures are already logged
        let _ = self.queue_alert(alert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Evidence;
    use crate::output::OutputFormat;
    use crate::persistence::SqliteAlertStore;
    use uuid::Uuid;

    fn create_test_alert() -> CheckAlert {
        CheckAlert {
            check_name: "AutoTotemA".to_string(),
            description: "Click time difference".to_string(),
            experimental: false,
            player_id: Uuid::new_v4(),
            player_name: "Steve".to_string(),
            violations: 2,
            max_violations: 2,
            punish: true,
            timestamp: 1_700_000_000_000,
            evidence: Evidence::new()
                .millis("Totem Time", 90)
                .millis("Click Difference", 50),
        }
    }

    #[tokio::test]
    async fn test_alert_queue_send() {
        let (tx, mut rx) = AlertDispatcher::create_channel();
        let queue = AlertQueue::new(tx);
        assert!(!queue.is_closed());

        queue.dispatch(create_test_alert());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.check_name, "AutoTotemA");
    }

    #[tokio::test]
    async fn test_alert_queue_async_send() {
        let (tx, mut rx) = AlertDispatcher::create_channel();
        let queue = AlertQueue::new(tx);

        queue.queue_alert_async(create_test_alert()).await.unwrap();
        assert!(rx.recv().await.is_some());
    }

    #[test]
    fn test_alert_queue_full_and_closed() {
        let (tx, rx) = mpsc::channel(1);
        let queue = AlertQueue::new(tx);

        assert!(queue.queue_alert(create_test_alert()).is_ok());
        assert!(matches!(
            queue.queue_alert(create_test_alert()),
            Err(AlertError::QueueFull)
        ));

        drop(rx);
        assert!(matches!(
            queue.queue_alert(create_test_alert()),
            Err(AlertError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_dispatcher_writes_output_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.jsonl");
        let store = Arc::new(SqliteAlertStore::in_memory().unwrap());

        let output = OutputHandler::new(OutputFormat::Jsonl, Some(path.clone())).unwrap();
        let (dispatcher, queue, rx) = AlertDispatcher::new(AlertConfig::default());
        let dispatcher = dispatcher.with_output(output).with_store(store.clone());

        let alert = create_test_alert();
        queue.dispatch(alert.clone());
        drop(queue);
        dispatcher.run(rx).await;

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: CheckAlert = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(parsed, alert);
        assert_eq!(store.count_player_alerts(&alert.player_id).unwrap(), 1);
    }

    #[test]
    fn test_discord_payload() {
        let config = DiscordConfig {
            webhook_url: "https://discord.invalid/webhook".to_string(),
            username: None,
        };
        let payload = discord_payload(&config, &create_test_alert());

        assert_eq!(payload["username"], "TotemWatch");
        let embed = &payload["embeds"][0];
        assert_eq!(embed["color"], 0xFF0000);
        assert_eq!(embed["fields"][2]["value"], "2/2");
        assert_eq!(embed["fields"][3]["name"], "Totem Time");
        assert_eq!(embed["fields"][3]["value"], "90ms");
        assert!(embed["timestamp"].as_str().unwrap().starts_with("2023-11-14"));
    }
}
