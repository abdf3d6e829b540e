use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::model::{EntityId, Platform};

/// How a delivered request is judged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// A request that completes without a transport error counts as delivered;
    /// the HTTP status is not consulted.
    #[default]
    SendAndAssume,
    /// Only 2xx responses count as delivered.
    Acknowledged,
}

/// Result of one successful webhook call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// True when the receiving server acknowledged the request.
    pub confirmed: bool,
}

impl Delivery {
    pub fn assumed() -> Self {
        Self { confirmed: false }
    }

    pub fn confirmed() -> Self {
        Self { confirmed: true }
    }
}

/// Static mapping from platform to its automation endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookRegistry {
    endpoints: BTreeMap<Platform, Url>,
}

impl WebhookRegistry {
    pub fn insert(&mut self, platform: Platform, url: Url) -> Option<Url> {
        self.endpoints.insert(platform, url)
    }

    pub fn endpoint(&self, platform: Platform) -> Option<&Url> {
        self.endpoints.get(&platform)
    }

    pub fn is_integrated(&self, platform: Platform) -> bool {
        self.endpoints.contains_key(&platform)
    }

    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.endpoints.keys().copied()
    }
}

impl FromIterator<(Platform, Url)> for WebhookRegistry {
    fn from_iter<I: IntoIterator<Item = (Platform, Url)>>(iter: I) -> Self {
        Self {
            endpoints: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
pub trait WebhookService: Send + Sync {
    /// POST a JSON body to `url`. `Err` means the request was not delivered.
    async fn post_json(&self, url: &Url, body: &Value) -> Result<Delivery>;
}

/// Body sent to a publishing scenario for one entity.
pub fn entity_payload(entity_id: EntityId) -> Value {
    json!({ "id": entity_id })
}

#[derive(Clone)]
pub struct WebhookClient {
    http: Client,
    mode: DeliveryMode,
}

impl fmt::Debug for WebhookClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookClient")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl WebhookClient {
    pub fn new(mode: DeliveryMode, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent("amplifier/0.1")
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, mode })
    }

    pub fn build_request(&self, url: &Url, body: &Value) -> Result<reqwest::Request> {
        self.http
            .post(url.clone())
            .header("Content-Type", "application/json")
            .json(body)
            .build()
            .context("failed to build webhook request")
    }
}

#[async_trait]
impl WebhookService for WebhookClient {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<Delivery> {
        let request = self.build_request(url, body)?;
        debug!(url = %request.url(), %body, "sending webhook");

        let res = self
            .http
            .execute(request)
            .await
            .with_context(|| format!("failed to reach webhook {}", url.host_str().unwrap_or("?")))?;

        match self.mode {
            DeliveryMode::SendAndAssume => Ok(Delivery::assumed()),
            DeliveryMode::Acknowledged => {
                let status = res.status();
                if status.is_success() {
                    Ok(Delivery::confirmed())
                } else {
                    let body = res.text().await.unwrap_or_default();
                    warn!(%status, "webhook rejected request");
                    Err(anyhow!("webhook responded {}: {}", status, body))
                }
            }
        }
    }
}
