use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Opaque identifier of an idea or content record.
pub type EntityId = i64;

/// Subtype value that clears a platform association instead of setting one.
pub const SUBTYPE_NONE: &str = "none";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String")]
pub enum Platform {
    LinkedIn,
    Twitter,
    Instagram,
    Facebook,
    YouTube,
    TikTok,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::LinkedIn,
        Platform::Twitter,
        Platform::Instagram,
        Platform::Facebook,
        Platform::YouTube,
        Platform::TikTok,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "LinkedIn",
            Platform::Twitter => "Twitter",
            Platform::Instagram => "Instagram",
            Platform::Facebook => "Facebook",
            Platform::YouTube => "YouTube",
            Platform::TikTok => "TikTok",
        }
    }

    /// Content types offered for this platform in the ideas view.
    pub fn content_types(&self) -> &'static [&'static str] {
        match self {
            Platform::LinkedIn => &["Article", "Post", "Newsletter", "Image"],
            Platform::Instagram => &["Reels", "Post", "Story", "Image"],
            Platform::YouTube => &["Video", "Shorts"],
            Platform::Twitter => &["Tweet", "Thread", "Image"],
            Platform::Facebook => &["Post", "Article", "Image", "Video"],
            Platform::TikTok => &["Video", "Shorts"],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownPlatform(s.to_string()))
    }
}

impl TryFrom<String> for Platform {
    type Error = UnknownPlatform;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// One `(entity, platform, subtype)` choice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformAssociation {
    pub entity_id: EntityId,
    pub platform: Platform,
    pub subtype: String,
}

impl PlatformAssociation {
    pub fn new(entity_id: EntityId, platform: Platform, subtype: impl Into<String>) -> Self {
        Self {
            entity_id,
            platform,
            subtype: subtype.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssociationParseError {
    #[error("expected ID:PLATFORM:SUBTYPE, got {0:?}")]
    Shape(String),
    #[error("invalid entity id {0:?}")]
    Id(String),
    #[error(transparent)]
    Platform(#[from] UnknownPlatform),
}

/// Parses `ID:PLATFORM:SUBTYPE`, e.g. `3:LinkedIn:Article`.
impl FromStr for PlatformAssociation {
    type Err = AssociationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(id), Some(platform), Some(subtype)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(AssociationParseError::Shape(s.to_string()));
        };
        if subtype.trim().is_empty() {
            return Err(AssociationParseError::Shape(s.to_string()));
        }
        let entity_id = id
            .trim()
            .parse()
            .map_err(|_| AssociationParseError::Id(id.to_string()))?;
        Ok(Self::new(entity_id, platform.parse()?, subtype.trim()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: Option<String>,
    pub email: String,
    pub domain: Option<String>,
    pub linkedin_url: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub twitter_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Idea {
    pub id: EntityId,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<i64>,
    pub content: Option<String>,
    pub priority_score: Option<f64>,
    pub used_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    pub id: EntityId,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<i64>,
    pub idea_id: Option<EntityId>,
    pub platform: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub content_url: Option<String>,
    pub status: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceType {
    Website,
    SocialMedia,
    RssFeed,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Website => "Website",
            SourceType::SocialMedia => "Social Media",
            SourceType::RssFeed => "RSS Feed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Social Media" => SourceType::SocialMedia,
            "RSS Feed" => SourceType::RssFeed,
            _ => SourceType::Website,
        }
    }

    /// Classify a source by its URL: handles contain `@`, feeds mention
    /// `feed`, `rss` or `.xml`, anything else is a website.
    pub fn classify(url: &str) -> Self {
        if url.contains('@') {
            SourceType::SocialMedia
        } else if url.contains("feed") || url.contains("rss") || url.contains(".xml") {
            SourceType::RssFeed
        } else {
            SourceType::Website
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<i64>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub source_type: SourceType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PromptKind {
    IdeaGeneration,
    ContentGeneration,
}

impl PromptKind {
    pub fn table(&self) -> &'static str {
        match self {
            PromptKind::IdeaGeneration => "idea_generation_prompts",
            PromptKind::ContentGeneration => "content_generation_prompts",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prompt {
    pub id: i64,
    pub kind: PromptKind,
    pub created_at: DateTime<Utc>,
    pub name: Option<String>,
    pub prompt: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_parses_names_and_slugs() {
        assert_eq!("LinkedIn".parse::<Platform>(), Ok(Platform::LinkedIn));
        assert_eq!("youtube".parse::<Platform>(), Ok(Platform::YouTube));
        assert_eq!(" tiktok ".parse::<Platform>(), Ok(Platform::TikTok));
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn association_parses_from_cli_form() {
        assert_eq!(
            "3:linkedin:Article".parse::<PlatformAssociation>(),
            Ok(PlatformAssociation::new(3, Platform::LinkedIn, "Article"))
        );
        assert!(matches!(
            "3:LinkedIn".parse::<PlatformAssociation>(),
            Err(AssociationParseError::Shape(_))
        ));
        assert!(matches!(
            "x:LinkedIn:Post".parse::<PlatformAssociation>(),
            Err(AssociationParseError::Id(_))
        ));
        assert!(matches!(
            "1:Orkut:Post".parse::<PlatformAssociation>(),
            Err(AssociationParseError::Platform(_))
        ));
    }

    #[test]
    fn every_platform_offers_content_types() {
        for p in Platform::ALL {
            assert!(!p.content_types().is_empty(), "{p} has no content types");
        }
        assert!(Platform::Instagram.content_types().contains(&"Reels"));
    }

    #[test]
    fn classify_source_urls() {
        assert_eq!(SourceType::classify("@rustlang"), SourceType::SocialMedia);
        assert_eq!(SourceType::classify("https://blog.rust-lang.org/feed.xml"), SourceType::RssFeed);
        assert_eq!(SourceType::classify("https://example.com/rss"), SourceType::RssFeed);
        assert_eq!(SourceType::classify("https://example.com"), SourceType::Website);
        assert_eq!(SourceType::parse(SourceType::RssFeed.as_str()), SourceType::RssFeed);
    }
}
