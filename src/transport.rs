//! Outbound notification transports
//!
//! `HttpTransport` posts activities to the feed service's ActivityStreams
//! endpoint; `MemoryTransport` keeps them in memory.

use crate::activity::Activity;
use crate::error::{AggregationError, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// REST fragment of the feed service's ActivityStreams API
const ACTIVITY_STREAMS_PATH: &str = "social/rest/activitystreams/";

#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Deliver one activity to the stream of `user`
    async fn send(&self, activity: &Activity, user: &str) -> Result<()>;

    /// Transport name for logging
    fn transport_type(&self) -> &'static str;
}

/// JSON-over-HTTP transport
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    /// Stream endpoint of one user
    pub fn endpoint(&self, user: &str) -> String {
        format!("{}{}{}/@self", self.base_url, ACTIVITY_STREAMS_PATH, user)
    }
}

#[async_trait]
impl NotificationTransport for HttpTransport {
    async fn send(&self, activity: &Activity, user: &str) -> Result<()> {
        let url = self.endpoint(user);
        let response = self.client.post(&url).json(activity).send().await?;

        if !response.status().is_success() {
            return Err(AggregationError::Transport(format!(
                "{} answered {}",
                url,
                response.status()
            )));
        }

        Ok(())
    }

    fn transport_type(&self) -> &'static str {
        "HTTP"
    }
}

/// Transport that records every activity instead of sending it
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<(Activity, String)>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in delivery order
    pub fn sent(&self) -> Vec<(Activity, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn take(&self) -> Vec<(Activity, String)> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[async_trait]
impl NotificationTransport for MemoryTransport {
    async fn send(&self, activity: &Activity, user: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((activity.clone(), user.to_string()));
        Ok(())
    }

    fn transport_type(&self) -> &'static str {
        "memory"
    }
}
