//! Insert and patch payloads accepted by the repositories.
//!
//! Patch structs leave a column untouched when a field is `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::EntityId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub domain: Option<String>,
    pub linkedin_url: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub twitter_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewIdea {
    pub content: Option<String>,
    pub priority_score: Option<f64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdeaPatch {
    pub content: Option<String>,
    pub priority_score: Option<f64>,
    pub used_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewContent {
    pub idea_id: Option<EntityId>,
    pub platform: Option<String>,
    pub kind: Option<String>,
    pub content_url: Option<String>,
    /// Defaults to `draft`.
    pub status: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPatch {
    pub idea_id: Option<EntityId>,
    pub platform: Option<String>,
    pub kind: Option<String>,
    pub content_url: Option<String>,
    pub status: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSource {
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPrompt {
    pub name: Option<String>,
    pub prompt: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptPatch {
    pub name: Option<String>,
    pub prompt: Option<String>,
    pub status: Option<String>,
}
