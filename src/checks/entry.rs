use derive_more::Display;
use thiserror::Error;

use crate::config::catalog::{CatalogKind, ModEntry, PerGameArt};

#[derive(Debug, Error)]
pub enum EntryCheckError {
    #[error("{item}: missing {key}")]
    MissingKey { item: String, key: &'static str },
    #[error("{item} does not define '{art}' but lacks 'per_game_config'")]
    ArtWithoutPerGameConfig { item: String, art: ArtKind },
    #[error("{item} does not define '{art}' and it's missing in 'per_game_config.{game}'")]
    ArtMissingForGame {
        item: String,
        art: ArtKind,
        game: String,
    },
}

#[derive(Debug, Display, Copy, Clone, Eq, PartialEq)]
pub enum ArtKind {
    #[display("cover_art_url")]
    Cover,
    #[display("thumbnail_art_url")]
    Thumbnail,
}

impl ArtKind {
    /// Art an entry of `kind` must resolve. Texture packs only show a thumbnail.
    pub fn required_for(kind: CatalogKind) -> &'static [ArtKind] {
        match kind {
            CatalogKind::Mods => &[ArtKind::Cover, ArtKind::Thumbnail],
            CatalogKind::TexturePacks => &[ArtKind::Thumbnail],
        }
    }

    fn top_level(self, entry: &ModEntry) -> Option<&String> {
        match self {
            ArtKind::Cover => entry.cover_art_url.as_ref(),
            ArtKind::Thumbnail => entry.thumbnail_art_url.as_ref(),
        }
    }

    fn per_game(self, art: &PerGameArt) -> Option<&String> {
        match self {
            ArtKind::Cover => art.cover_art_url.as_ref(),
            ArtKind::Thumbnail => art.thumbnail_art_url.as_ref(),
        }
    }
}

/// Display fields of an entry that passed [required_keys].
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFields {
    pub display_name: String,
    pub description: String,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub supported_games: Option<Vec<String>>,
}

/// Check that every key the index needs to describe `entry` was declared.
///
/// `supported_games` is only required where nothing else can supply it: texture packs, and mods
/// whose release metadata is being rewritten from the catalog.
pub fn required_keys(
    item: &str,
    entry: &ModEntry,
    kind: CatalogKind,
    rewriting_metadata: bool,
) -> Result<DisplayFields, EntryCheckError> {
    fn require<T: Clone>(item: &str, key: &'static str, v: &Option<T>) -> Result<T, EntryCheckError> {
        v.clone().ok_or_else(|| EntryCheckError::MissingKey {
            item: item.to_string(),
            key,
        })
    }

    let display_name = require(item, "display_name", &entry.display_name)?;
    let description = require(item, "description", &entry.description)?;
    let authors = require(item, "authors", &entry.authors)?;
    let tags = require(item, "tags", &entry.tags)?;
    let supported_games = if kind == CatalogKind::TexturePacks || rewriting_metadata {
        Some(require(item, "supported_games", &entry.supported_games)?)
    } else {
        entry.supported_games.clone()
    };
    Ok(DisplayFields {
        display_name,
        description,
        authors,
        tags,
        supported_games,
    })
}

/// Check that the art `kind` requires is resolvable for every game the entry supports, either
/// from the top-level URL or from `per_game_config`.
///
/// Entries that don't declare `supported_games` are checked against the games listed in
/// `per_game_config` instead.
pub fn art_completeness(
    item: &str,
    entry: &ModEntry,
    kind: CatalogKind,
) -> Result<(), EntryCheckError> {
    for &art in ArtKind::required_for(kind) {
        if art.top_level(entry).is_some() {
            continue;
        }
        let per_game = entry.per_game_config.as_ref().ok_or_else(|| {
            EntryCheckError::ArtWithoutPerGameConfig {
                item: item.to_string(),
                art,
            }
        })?;
        let games: Vec<&String> = match &entry.supported_games {
            Some(games) => games.iter().collect(),
            None => per_game.keys().collect(),
        };
        for game in games {
            if per_game.get(game).and_then(|c| art.per_game(c)).is_none() {
                return Err(EntryCheckError::ArtMissingForGame {
                    item: item.to_string(),
                    art,
                    game: game.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn described() -> ModEntry {
        ModEntry {
            display_name: Some("Foo".to_string()),
            description: Some("desc".to_string()),
            authors: Some(vec!["me".to_string()]),
            tags: Some(vec![]),
            ..Default::default()
        }
    }

    fn art(cover: Option<&str>, thumb: Option<&str>) -> PerGameArt {
        PerGameArt {
            cover_art_url: cover.map(str::to_string),
            thumbnail_art_url: thumb.map(str::to_string),
        }
    }

    #[test]
    fn required_keys_depend_on_kind() {
        let entry = described();
        assert!(required_keys("foo", &entry, CatalogKind::Mods, false).is_ok());

        let err = required_keys("foo", &entry, CatalogKind::TexturePacks, false).unwrap_err();
        assert_eq!(err.to_string(), "foo: missing supported_games");
        let err = required_keys("foo", &entry, CatalogKind::Mods, true).unwrap_err();
        assert_eq!(err.to_string(), "foo: missing supported_games");
    }

    #[test]
    fn texture_packs_only_need_a_thumbnail() {
        let entry = ModEntry {
            supported_games: Some(vec!["jak1".to_string()]),
            thumbnail_art_url: Some("t".to_string()),
            ..described()
        };
        assert!(required_keys("hd", &entry, CatalogKind::TexturePacks, false).is_ok());
        assert!(art_completeness("hd", &entry, CatalogKind::TexturePacks).is_ok());

        let err = art_completeness("hd", &entry, CatalogKind::Mods).unwrap_err();
        assert_eq!(
            err.to_string(),
            "hd does not define 'cover_art_url' but lacks 'per_game_config'"
        );

        let bare = ModEntry {
            thumbnail_art_url: None,
            ..entry
        };
        assert!(matches!(
            art_completeness("hd", &bare, CatalogKind::TexturePacks),
            Err(EntryCheckError::ArtWithoutPerGameConfig {
                art: ArtKind::Thumbnail,
                ..
            })
        ));
    }

    #[test]
    fn first_missing_key_is_reported() {
        let entry = ModEntry {
            tags: None,
            authors: None,
            ..described()
        };
        let err = required_keys("foo", &entry, CatalogKind::Mods, false).unwrap_err();
        assert_eq!(err.to_string(), "foo: missing authors");
    }

    #[test]
    fn missing_thumbnail_without_per_game_config() {
        let entry = ModEntry {
            cover_art_url: Some("https://example.com/cover.png".to_string()),
            ..described()
        };
        let err = art_completeness("foo", &entry, CatalogKind::Mods).unwrap_err();
        assert!(matches!(
            err,
            EntryCheckError::ArtWithoutPerGameConfig {
                art: ArtKind::Thumbnail,
                ..
            }
        ));
        let message = err.to_string();
        assert!(message.contains("foo"));
        assert!(message.contains("thumbnail_art_url"));
    }

    #[test]
    fn per_game_art_must_cover_every_supported_game() {
        let mut per_game = IndexMap::new();
        per_game.insert("jak1".to_string(), art(Some("c1"), Some("t1")));
        per_game.insert("jak2".to_string(), art(Some("c2"), None));
        let entry = ModEntry {
            supported_games: Some(vec!["jak1".to_string(), "jak2".to_string()]),
            per_game_config: Some(per_game),
            ..described()
        };
        let err = art_completeness("foo", &entry, CatalogKind::Mods).unwrap_err();
        assert_eq!(
            err.to_string(),
            "foo does not define 'thumbnail_art_url' and it's missing in 'per_game_config.jak2'"
        );

        let entry = ModEntry {
            thumbnail_art_url: Some("t".to_string()),
            ..entry
        };
        assert!(art_completeness("foo", &entry, CatalogKind::Mods).is_ok());
    }

    #[test]
    fn supported_game_absent_from_per_game_config() {
        let mut per_game = IndexMap::new();
        per_game.insert("jak1".to_string(), art(Some("c1"), Some("t1")));
        let entry = ModEntry {
            supported_games: Some(vec!["jak1".to_string(), "jak3".to_string()]),
            per_game_config: Some(per_game),
            ..described()
        };
        let err = art_completeness("foo", &entry, CatalogKind::Mods).unwrap_err();
        assert!(matches!(
            err,
            EntryCheckError::ArtMissingForGame { art: ArtKind::Cover, ref game, .. } if game == "jak3"
        ));
    }

    #[test]
    fn undeclared_games_fall_back_to_per_game_keys() {
        let mut per_game = IndexMap::new();
        per_game.insert("jak1".to_string(), art(Some("c1"), Some("t1")));
        per_game.insert("jak2".to_string(), art(None, Some("t2")));
        let entry = ModEntry {
            per_game_config: Some(per_game),
            ..described()
        };
        let err = art_completeness("foo", &entry, CatalogKind::Mods).unwrap_err();
        assert!(matches!(
            err,
            EntryCheckError::ArtMissingForGame { art: ArtKind::Cover, ref game, .. } if game == "jak2"
        ));
    }
}
