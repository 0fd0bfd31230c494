use derive_more::Display;
use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

/// The catalog as declared in `config.yaml`.
///
/// Sections are optional at the type level so that their absence can be reported with the same
/// wording in every run mode, see [CatalogConfig::source_name] and [CatalogConfig::section].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    pub metadata: Option<CatalogMetadata>,
    pub mods: Option<IndexMap<String, ModEntry>>,
    pub texture_packs: Option<IndexMap<String, ModEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogMetadata {
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("'metadata' section missing name")]
    MissingSourceName,
    #[error("'{0}' section missing")]
    MissingSection(CatalogKind),
}

impl CatalogConfig {
    pub fn source_name(&self) -> Result<&str, CatalogError> {
        self.metadata
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .filter(|name| !name.is_empty())
            .ok_or(CatalogError::MissingSourceName)
    }

    pub fn section(&self, kind: CatalogKind) -> Result<&IndexMap<String, ModEntry>, CatalogError> {
        match kind {
            CatalogKind::Mods => self.mods.as_ref(),
            CatalogKind::TexturePacks => self.texture_packs.as_ref(),
        }
        .ok_or(CatalogError::MissingSection(kind))
    }
}

/// Which half of the catalog an entry was declared in.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq)]
pub enum CatalogKind {
    #[display("mods")]
    Mods,
    #[display("texture_packs")]
    TexturePacks,
}

impl CatalogKind {
    /// How releases of this kind of item carry their downloads.
    pub fn asset_shape(self) -> AssetShape {
        match self {
            CatalogKind::Mods => AssetShape::MultiPlatform,
            CatalogKind::TexturePacks => AssetShape::SingleArchive,
        }
    }
}

#[derive(Debug, Display, Copy, Clone, Eq, PartialEq)]
pub enum AssetShape {
    /// `windows-*`, `linux-*` and `macos-*` assets, plus an optional `metadata.json`.
    #[display("multi-platform")]
    MultiPlatform,
    /// A single `assets.zip`.
    #[display("single-archive")]
    SingleArchive,
}

/// A single mod or texture pack as declared in the catalog.
///
/// Required keys are checked by [crate::checks::entry::required_keys], not by serde, so they are
/// modelled as options here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModEntry {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub authors: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub supported_games: Option<Vec<String>>,
    pub website_url: Option<String>,
    pub external_link: Option<String>,
    pub cover_art_url: Option<String>,
    pub thumbnail_art_url: Option<String>,
    pub release_date_override: Option<String>,
    pub per_game_config: Option<IndexMap<String, PerGameArt>>,
    pub repo_owner: Option<String>,
    pub repo_name: Option<String>,
    #[serde(default)]
    pub ignore_versions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerGameArt {
    pub cover_art_url: Option<String>,
    pub thumbnail_art_url: Option<String>,
}

/// Owner and name of the repository an entry publishes its releases under.
#[derive(Debug, Display, Clone, Eq, PartialEq)]
#[display("{owner}/{name}")]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn website_url(&self) -> String {
        format!("https://www.github.com/{}/{}", self.owner, self.name)
    }
}

impl ModEntry {
    /// The repository to poll, if both halves of it were declared.
    pub fn repo(&self) -> Option<RepoId> {
        match (&self.repo_owner, &self.repo_name) {
            (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => Some(RepoId {
                owner: owner.clone(),
                name: name.clone(),
            }),
            _ => None,
        }
    }
}
