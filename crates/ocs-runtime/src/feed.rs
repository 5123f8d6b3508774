//! Message sources for the ingestion loop.
//!
//! The loop only needs "give me the next raw payload, or tell me the feed is
//! over". `NatsFeed` is the production source (core NATS subscription, no
//! acknowledgement); `ChannelFeed` drives the same loop from tests or from an
//! in-process producer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::info;

#[async_trait]
pub trait OrderFeed: Send {
    /// Human-readable source description for logs.
    fn describe(&self) -> String;

    /// Next raw payload. `None` means the feed is closed for good.
    /// Must be cancel-safe: the loop races it against shutdown.
    async fn next_payload(&mut self) -> Option<Bytes>;
}

// ---------------------------------------------------------------------------
// NATS
// ---------------------------------------------------------------------------

pub async fn connect_nats(url: &str) -> Result<async_nats::Client> {
    let client = async_nats::connect(url)
        .await
        .with_context(|| format!("connect nats failed: url={url}"))?;
    info!(url, "connected to nats");
    Ok(client)
}

pub struct NatsFeed {
    subject: String,
    subscriber: async_nats::Subscriber,
}

impl NatsFeed {
    pub async fn subscribe(client: &async_nats::Client, subject: &str) -> Result<Self> {
        let subscriber = client
            .subscribe(subject.to_string())
            .await
            .with_context(|| format!("subscribe failed: subject={subject}"))?;
        info!(subject, "subscribed to order subject");
        Ok(Self {
            subject: subject.to_string(),
            subscriber,
        })
    }
}

#[async_trait]
impl OrderFeed for NatsFeed {
    fn describe(&self) -> String {
        format!("nats:{}", self.subject)
    }

    async fn next_payload(&mut self) -> Option<Bytes> {
        self.subscriber.next().await.map(|msg| msg.payload)
    }
}

// ---------------------------------------------------------------------------
// In-process channel
// ---------------------------------------------------------------------------

pub struct ChannelFeed {
    rx: mpsc::Receiver<Bytes>,
}

impl ChannelFeed {
    /// Returns the producer half and the feed. Dropping every sender closes
    /// the feed once buffered payloads are drained.
    pub fn new(buffer: usize) -> (mpsc::Sender<Bytes>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }
}

#[async_trait]
impl OrderFeed for ChannelFeed {
    fn describe(&self) -> String {
        "channel".to_string()
    }

    async fn next_payload(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_feed_drains_then_closes() {
        let (tx, mut feed) = ChannelFeed::new(4);
        tx.send(Bytes::from_static(b"one")).await.unwrap();
        tx.send(Bytes::from_static(b"two")).await.unwrap();
        drop(tx);

        assert_eq!(feed.next_payload().await.as_deref(), Some(&b"one"[..]));
        assert_eq!(feed.next_payload().await.as_deref(), Some(&b"two"[..]));
        assert!(feed.next_payload().await.is_none());
    }
}
