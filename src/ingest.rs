//! Ingestion consumer: the long-lived task that turns inbound channel
//! messages into archived posts.
//!
//! Messages arrive on an mpsc channel from the messaging platform client
//! (transport and retry are that client's concern). The consumer processes
//! them strictly sequentially: filter by source channel, classify, upsert
//! with a bounded timeout. A failed or timed-out write is logged and the
//! loop moves on; one bad message never halts ingestion.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classifier::{classify, default_rules, CategoryRule, InboundMessage};
use crate::storage::Storage;

pub struct IngestConsumer {
    storage: Arc<dyn Storage>,
    rules: Vec<CategoryRule>,
    channel_id: i64,
    upsert_timeout: Duration,
}

impl IngestConsumer {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, channel_id: i64, upsert_timeout: Duration) -> Self {
        Self {
            storage,
            rules: default_rules(),
            channel_id,
            upsert_timeout,
        }
    }

    /// Replace the default category rule table.
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<CategoryRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Consume messages until the channel closes or shutdown is signalled.
    ///
    /// The shutdown token is checked before receiving the next message, so
    /// an upsert already in flight runs to completion.
    pub async fn run(self, mut rx: mpsc::Receiver<InboundMessage>, shutdown: CancellationToken) {
        info!(channel_id = self.channel_id, "Ingestion consumer started");

        loop {
            let message = tokio::select! {
                () = shutdown.cancelled() => break,
                received = rx.recv() => match received {
                    Some(message) => message,
                    None => break,
                },
            };

            self.process(message).await;
        }

        info!("Ingestion consumer stopped");
    }

    async fn process(&self, message: InboundMessage) {
        if message.source_chat_id != self.channel_id {
            debug!(
                chat_id = message.source_chat_id,
                message_id = message.source_message_id,
                "Ignoring message from foreign chat"
            );
            return;
        }

        let record = classify(&message, &self.rules);

        match tokio::time::timeout(self.upsert_timeout, self.storage.upsert(&record)).await {
            Ok(Ok(())) => {
                info!(
                    source_message_id = record.source_message_id,
                    category = %record.category,
                    media_kind = record.media_kind.as_str(),
                    "Archived post"
                );
            }
            Ok(Err(e)) => {
                error!(
                    source_message_id = record.source_message_id,
                    "Failed to store post: {e}"
                );
            }
            Err(_) => {
                error!(
                    source_message_id = record.source_message_id,
                    timeout_secs = self.upsert_timeout.as_secs(),
                    "Upsert timed out"
                );
            }
        }
    }
}

/// Feed inbound message descriptors from stdin, one JSON object per line.
///
/// Stand-in transport for the messaging platform client: anything that can
/// write NDJSON descriptors can drive ingestion. Unparseable lines are
/// logged and skipped.
pub async fn feed_from_stdin(tx: mpsc::Sender<InboundMessage>, shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            () = shutdown.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("Inbound stream closed (EOF)");
                    break;
                }
                Err(e) => {
                    error!("Failed to read inbound stream: {e}");
                    break;
                }
            },
        };

        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<InboundMessage>(&line) {
            Ok(message) => {
                if tx.send(message).await.is_err() {
                    // Consumer gone; nothing left to feed.
                    break;
                }
            }
            Err(e) => {
                warn!("Skipping malformed inbound descriptor: {e}");
            }
        }
    }
}
