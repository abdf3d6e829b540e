//! Automation profile: what a user wants the content scenarios to produce,
//! submitted once to the profile webhook.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument};

use crate::webhook::{Delivery, WebhookService};

#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("please select a content domain")]
    MissingDomain,
    #[error("please select at least one content type")]
    NoContentTypes,
    #[error("please select at least one platform")]
    NoPlatforms,
    #[error("please select a tone")]
    MissingTone,
    #[error("{0} must be between 0 and 1, got {1}")]
    WeightOutOfRange(&'static str, f64),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutomationProfile {
    pub user_id: String,
    pub content_domain: String,
    #[serde(default)]
    pub content_sources: ContentSources,
    #[serde(default)]
    pub content_preferences: ContentPreferences,
    #[serde(default)]
    pub priority_settings: PrioritySettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentSources {
    #[serde(default)]
    pub websites: Vec<String>,
    #[serde(default)]
    pub social_handles: Vec<String>,
    #[serde(default)]
    pub rss_feeds: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentPreferences {
    #[serde(default)]
    pub content_types: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub tone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrioritySettings {
    pub engagement_weight: f64,
    pub relevance_weight: f64,
    pub trending_weight: f64,
}

impl Default for PrioritySettings {
    fn default() -> Self {
        Self {
            engagement_weight: 0.5,
            relevance_weight: 0.5,
            trending_weight: 0.5,
        }
    }
}

impl AutomationProfile {
    /// Checks run in form order; the first problem wins.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.content_domain.trim().is_empty() {
            return Err(ProfileError::MissingDomain);
        }
        if self.content_preferences.content_types.is_empty() {
            return Err(ProfileError::NoContentTypes);
        }
        if self.content_preferences.platforms.is_empty() {
            return Err(ProfileError::NoPlatforms);
        }
        if self.content_preferences.tone.trim().is_empty() {
            return Err(ProfileError::MissingTone);
        }
        let p = &self.priority_settings;
        for (name, w) in [
            ("engagementWeight", p.engagement_weight),
            ("relevanceWeight", p.relevance_weight),
            ("trendingWeight", p.trending_weight),
        ] {
            if !(0.0..=1.0).contains(&w) {
                return Err(ProfileError::WeightOutOfRange(name, w));
            }
        }
        Ok(())
    }

    /// Profile body plus submission metadata.
    pub fn payload(&self, source: &str, at: DateTime<Utc>) -> Result<Value> {
        let mut body = serde_json::to_value(self).context("failed to serialize profile")?;
        if let Value::Object(map) = &mut body {
            map.insert("timestamp".into(), Value::String(at.to_rfc3339()));
            map.insert("source".into(), Value::String(source.to_string()));
        }
        Ok(body)
    }
}

/// Validate and post the profile. Validation errors are returned before any
/// request is made.
#[instrument(skip_all, fields(user_id = %profile.user_id))]
pub async fn submit_profile(
    webhooks: &dyn WebhookService,
    url: &Url,
    source: &str,
    profile: &AutomationProfile,
) -> Result<Delivery> {
    profile.validate()?;
    let body = profile.payload(source, Utc::now())?;
    let delivery = webhooks
        .post_json(url, &body)
        .await
        .context("failed to submit automation profile")?;
    info!(confirmed = delivery.confirmed, "automation profile submitted");
    Ok(delivery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn valid() -> AutomationProfile {
        AutomationProfile {
            user_id: "user_1".into(),
            content_domain: "Technology".into(),
            content_preferences: ContentPreferences {
                content_types: vec!["Article".into()],
                platforms: vec!["LinkedIn".into()],
                tone: "Professional".into(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn valid_profile_passes() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn checks_run_in_form_order() {
        let mut p = valid();
        p.content_domain.clear();
        p.content_preferences.platforms.clear();
        assert_eq!(p.validate(), Err(ProfileError::MissingDomain));

        let mut p = valid();
        p.content_preferences.content_types.clear();
        assert_eq!(p.validate(), Err(ProfileError::NoContentTypes));

        let mut p = valid();
        p.content_preferences.platforms.clear();
        assert_eq!(p.validate(), Err(ProfileError::NoPlatforms));

        let mut p = valid();
        p.content_preferences.tone = "  ".into();
        assert_eq!(p.validate(), Err(ProfileError::MissingTone));
    }

    #[test]
    fn weights_must_be_fractions() {
        let mut p = valid();
        p.priority_settings.trending_weight = 1.5;
        assert_eq!(
            p.validate(),
            Err(ProfileError::WeightOutOfRange("trendingWeight", 1.5))
        );
    }

    #[test]
    fn payload_is_camel_case_with_metadata() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
        let body = valid().payload("LeaderAmplifierAi", at).unwrap();
        assert_eq!(body["contentDomain"], "Technology");
        assert_eq!(body["contentPreferences"]["contentTypes"][0], "Article");
        assert_eq!(body["prioritySettings"]["engagementWeight"], 0.5);
        assert_eq!(body["source"], "LeaderAmplifierAi");
        assert_eq!(body["timestamp"], "2024-01-15T09:30:00+00:00");
    }

    #[test]
    fn profile_parses_from_yaml() {
        let yaml = r#"
userId: user_42
contentDomain: Health
contentPreferences:
  contentTypes: [Video]
  platforms: [YouTube]
  tone: Friendly
"#;
        let p: AutomationProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(p.user_id, "user_42");
        assert_eq!(p.priority_settings, PrioritySettings::default());
        assert!(p.content_sources.websites.is_empty());
        p.validate().unwrap();
    }
}
