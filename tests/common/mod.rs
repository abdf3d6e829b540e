#![allow(dead_code)]

use anyhow::{anyhow, Result};
use reqwest::Url;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Barrier, Mutex};

use amplifier::model::{EntityId, Platform};
use amplifier::notify::{Notification, Notifier};
use amplifier::webhook::{Delivery, WebhookRegistry, WebhookService};

pub fn hook(name: &str) -> Url {
    Url::parse(&format!("https://hook.us2.make.com/{name}")).unwrap()
}

pub fn registry(platforms: &[Platform]) -> WebhookRegistry {
    platforms
        .iter()
        .map(|p| (*p, hook(&p.as_str().to_lowercase())))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub url: Url,
    pub body: Value,
}

/// Records every request; ids in `failing` get a transport error and ids in
/// `hanging` never answer.
#[derive(Clone, Default)]
pub struct RecordingWebhooks {
    calls: Arc<Mutex<Vec<Call>>>,
    failing: BTreeSet<EntityId>,
    hanging: BTreeSet<EntityId>,
    barrier: Option<Arc<Barrier>>,
    confirm: bool,
}

impl RecordingWebhooks {
    pub fn failing(ids: &[EntityId]) -> Self {
        Self {
            failing: ids.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn hanging(ids: &[EntityId]) -> Self {
        Self {
            hanging: ids.iter().copied().collect(),
            ..Default::default()
        }
    }

    /// Every request waits until `n` requests are in flight at once.
    pub fn rendezvous(n: usize) -> Self {
        Self {
            barrier: Some(Arc::new(Barrier::new(n))),
            ..Default::default()
        }
    }

    pub fn confirming() -> Self {
        Self {
            confirm: true,
            ..Default::default()
        }
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn ids_sent_to(&self, url: &Url) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .calls()
            .await
            .into_iter()
            .filter(|c| &c.url == url)
            .filter_map(|c| c.body["id"].as_i64())
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait::async_trait]
impl WebhookService for RecordingWebhooks {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<Delivery> {
        self.calls.lock().await.push(Call {
            url: url.clone(),
            body: body.clone(),
        });
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        let id = body["id"].as_i64().unwrap_or_default();
        if self.hanging.contains(&id) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing.contains(&id) {
            return Err(anyhow!("connection reset for {id}"));
        }
        Ok(if self.confirm {
            Delivery::confirmed()
        } else {
            Delivery::assumed()
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    seen: StdMutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|n| n.title.clone()).collect()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, n: &Notification) {
        self.seen.lock().unwrap().push(n.clone());
    }
}
