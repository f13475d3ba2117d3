//! Runtime settings owned by the forum administrator.
//!
//! These are read from the settings store on every request so edits take
//! effect without a restart.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::origin::OriginRegistry;
use crate::sites::SiteTable;

pub const URL_KEY: &str = "blog-comments:url";
pub const CID_KEY: &str = "blog-comments:cid";
pub const NAME_KEY: &str = "blog-comments:name";
pub const COMPOSE_LOCATION_KEY: &str = "blog-comments:compose-location";
pub const TITLE_KEY: &str = "title";

/// Where the widget renders the reply box relative to the comment list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposeLocation {
    #[default]
    Top,
    Bottom,
}

impl ComposeLocation {
    /// Anything other than `bottom` places the box on top.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim() == "bottom" {
            Self::Bottom
        } else {
            Self::Top
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }

    #[must_use]
    pub fn at_top(self) -> bool {
        self == Self::Top
    }

    #[must_use]
    pub fn at_bottom(self) -> bool {
        self == Self::Bottom
    }
}

/// Snapshot of the bridge settings for one request.
///
/// The three list fields are comma-separated and joined by position: entry `i`
/// of `url`, `cid` and `name` all describe the same external site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeSettings {
    pub url: String,
    pub cid: String,
    pub name: String,
    pub compose_location: ComposeLocation,
    pub title: String,
}

impl BridgeSettings {
    /// Build settings from stored key/value pairs, ignoring unknown keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut settings = Self::default();
        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref() {
                URL_KEY => settings.url = value,
                CID_KEY => settings.cid = value,
                NAME_KEY => settings.name = value,
                COMPOSE_LOCATION_KEY => settings.compose_location = ComposeLocation::parse(&value),
                TITLE_KEY => settings.title = value,
                _ => {}
            }
        }
        settings
    }

    /// The trusted-origin table for this snapshot.
    #[must_use]
    pub fn registry(&self) -> OriginRegistry {
        OriginRegistry::parse(&self.url)
    }

    /// The per-site category/display-name table for this snapshot.
    #[must_use]
    pub fn sites(&self) -> SiteTable {
        SiteTable::from_lists(&self.url, &self.cid, &self.name)
    }
}

/// Partial update applied by the admin endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub url: Option<String>,
    pub cid: Option<String>,
    pub name: Option<String>,
    pub compose_location: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "_csrf")]
    pub csrf: Option<String>,
}

impl SettingsUpdate {
    /// Key/value pairs to write, in a stable order.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let compose = self
            .compose_location
            .as_deref()
            .map(|v| ComposeLocation::parse(v).as_str().to_string());

        [
            (URL_KEY, self.url.clone()),
            (CID_KEY, self.cid.clone()),
            (NAME_KEY, self.name.clone()),
            (COMPOSE_LOCATION_KEY, compose),
            (TITLE_KEY, self.title.clone()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

/// Keyed configuration storage shared with the forum.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the current settings.
    async fn load(&self) -> Result<BridgeSettings>;

    /// Write a single setting.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
