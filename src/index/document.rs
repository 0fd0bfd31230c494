use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

pub const SCHEMA_VERSION: &str = "1.0.0";

/// The published `mods.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    pub schema_version: String,
    pub source_name: String,
    pub mods: IndexMap<String, ItemRecord>,
    pub texture_packs: IndexMap<String, ItemRecord>,
    /// Only stamped by the publisher, and only when the content changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl IndexDocument {
    pub fn new(source_name: &str) -> Self {
        IndexDocument {
            schema_version: SCHEMA_VERSION.to_string(),
            source_name: source_name.to_string(),
            mods: IndexMap::new(),
            texture_packs: IndexMap::new(),
            last_updated: None,
        }
    }
}

/// One mod or texture pack. Which optional keys appear depends on the catalog it came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub display_name: String,
    pub description: String,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    /// Texture packs only; mods declare their games per version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_games: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    pub versions: Vec<VersionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_art_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_art_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    pub per_game_config: Option<IndexMap<String, PerGameArtRecord>>,
    /// `None` leaves the key out, `Some(None)` writes `null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_link: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerGameArtRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_art_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_art_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub version: String,
    pub published_date: Option<String>,
    #[serde(flatten)]
    pub downloads: Downloads,
}

impl VersionRecord {
    /// Whether anything about this version can actually be downloaded.
    pub fn has_downloads(&self) -> bool {
        match &self.downloads {
            Downloads::MultiPlatform(p) => {
                p.assets.windows.is_some() || p.assets.linux.is_some() || p.assets.macos.is_some()
            }
            Downloads::SingleArchive(a) => a.download_url.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Downloads {
    MultiPlatform(PlatformDownloads),
    SingleArchive(ArchiveDownload),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformDownloads {
    pub supported_games: Vec<String>,
    pub settings: Value,
    pub assets: PerPlatform<Option<String>>,
    pub asset_download_counts: PerPlatform<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerPlatform<T> {
    pub windows: T,
    pub linux: T,
    pub macos: T,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveDownload {
    pub download_url: Option<String>,
    pub download_count: u64,
}

/// Launcher settings a version gets when its `metadata.json` doesn't say otherwise.
pub fn default_settings() -> Value {
    json!({
        "decompConfigOverride": "",
        "shareVanillaSaves": false,
    })
}
