//! Update publisher
//!
//! Messages are serialized to JSON and queued on a local buffer drained by a
//! background task. `publish` waits for the buffer to drain (flush) before
//! returning but never reports delivery failures to the caller: they are
//! logged and counted.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, info};

use crate::error::PublishError;

/// A serialized message bound for a topic
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub topic: String,
    pub key: Option<String>,
    pub value: String,
}

/// Where messages are delivered
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, message: &Message) -> Result<(), PublishError>;
}

/// Delivers through a Kafka REST proxy (`POST /topics/{topic}`)
pub struct RestProxyTransport {
    client: Client,
    base_url: String,
    client_id: String,
}

impl RestProxyTransport {
    pub fn new(base_url: &str, client_id: &str, timeout: Duration) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
        })
    }
}

#[async_trait]
impl MessageTransport for RestProxyTransport {
    async fn send(&self, message: &Message) -> Result<(), PublishError> {
        let url = format!("{}/topics/{}", self.base_url, message.topic);
        let value: Value =
            serde_json::from_str(&message.value).unwrap_or_else(|_| Value::String(message.value.clone()));
        let body = json!({ "records": [{ "key": message.key, "value": value }] });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/vnd.kafka.json.v2+json")
            .header("User-Agent", self.client_id.as_str())
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PublishError::Transport(format!("{}: {}", status, text)));
        }
        Ok(())
    }
}

/// Keeps every delivered message in memory
#[derive(Default)]
pub struct MemoryTransport {
    messages: Mutex<Vec<Message>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl MessageTransport for MemoryTransport {
    async fn send(&self, message: &Message) -> Result<(), PublishError> {
        self.messages.lock().await.push(message.clone());
        Ok(())
    }
}

/// Delivery counters, updated by the background task
#[derive(Debug, Default)]
pub struct DeliveryStats {
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl DeliveryStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }
}

enum Command {
    Produce(Message),
    Flush(oneshot::Sender<()>),
}

pub struct UpdatePublisher {
    sender: mpsc::Sender<Command>,
    stats: Arc<DeliveryStats>,
}

impl UpdatePublisher {
    /// Spawn the delivery task. Must be called inside a Tokio runtime.
    pub fn new(transport: Arc<dyn MessageTransport>, buffer: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let stats = Arc::new(DeliveryStats::default());
        tokio::spawn(delivery_loop(transport, receiver, Arc::clone(&stats)));
        Self { sender, stats }
    }

    pub fn stats(&self) -> &DeliveryStats {
        &self.stats
    }

    /// Serialize and send `payload` to `topic`, then flush. Errors are
    /// logged, never returned.
    pub async fn publish<T: Serialize + ?Sized>(&self, topic: &str, key: Option<&str>, payload: &T) {
        if let Err(e) = self.enqueue(topic, key, payload).await {
            error!("Failed to send message to {}: {}", topic, e);
        }
        self.flush().await;
    }

    async fn enqueue<T: Serialize + ?Sized>(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &T,
    ) -> Result<(), PublishError> {
        let message = Message {
            topic: topic.to_string(),
            key: key.map(str::to_string),
            value: serde_json::to_string(payload)?,
        };
        self.sender
            .send(Command::Produce(message))
            .await
            .map_err(|_| PublishError::Closed)
    }

    /// Wait until everything queued so far has been handed to the transport
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Command::Flush(done)).await.is_err() {
            error!("Publisher closed before flush");
            return;
        }
        let _ = wait.await;
    }
}

async fn delivery_loop(
    transport: Arc<dyn MessageTransport>,
    mut receiver: mpsc::Receiver<Command>,
    stats: Arc<DeliveryStats>,
) {
    while let Some(command) = receiver.recv().await {
        match command {
            Command::Produce(message) => match transport.send(&message).await {
                Ok(()) => {
                    stats.delivered.fetch_add(1, Ordering::SeqCst);
                    debug!(
                        "Message delivered to {} (key {:?}, {} bytes)",
                        message.topic,
                        message.key,
                        message.value.len()
                    );
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::SeqCst);
                    error!("Delivery failed for {:?} on {}: {}", message.key, message.topic, e);
                }
            },
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    info!("Publisher delivery task stopped");
}
