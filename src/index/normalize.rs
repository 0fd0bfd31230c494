use indexmap::IndexMap;
use thiserror::Error;

use crate::checks::entry::{art_completeness, required_keys, EntryCheckError};
use crate::checks::version_filter::{IgnoreRuleError, Verdict, VersionFilter};
use crate::config::catalog::{CatalogKind, ModEntry, RepoId};
use crate::index::document::{ItemRecord, PerGameArtRecord};
use crate::index::resolve::{resolve, MetadataMode, ReleaseContext, ResolveError};
use crate::release_site::{ReleaseSource, ReleaseSourceError};
use crate::uwu_colors::{ErrStyle, ITEM_STYLE, VERSION_STYLE};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Entry(#[from] EntryCheckError),
    #[error("'repo_owner' or 'repo_name' missing in: {0}")]
    MissingRepo(String),
    #[error("{item}: {source}")]
    IgnoreRule {
        item: String,
        #[source]
        source: IgnoreRuleError,
    },
    #[error("Couldn't list releases of {item} ({repo}): {source}")]
    Releases {
        item: String,
        repo: RepoId,
        #[source]
        source: ReleaseSourceError,
    },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Turn one catalog entry into its index record, polling its releases unless it only links
/// elsewhere.
pub async fn normalize(
    source: &dyn ReleaseSource,
    key: &str,
    entry: &ModEntry,
    kind: CatalogKind,
    mode: MetadataMode,
) -> Result<ItemRecord, NormalizeError> {
    let display = required_keys(key, entry, kind, mode == MetadataMode::Legacy)?;

    let website_url = match (&entry.website_url, &entry.external_link) {
        (Some(url), _) => Some(url.clone()),
        (None, None) => entry.repo().map(|repo| repo.website_url()),
        (None, Some(_)) => None,
    };
    let per_game_config: Option<IndexMap<_, _>> = entry.per_game_config.as_ref().map(|games| {
        games
            .iter()
            .map(|(game, art)| {
                (
                    game.clone(),
                    PerGameArtRecord {
                        cover_art_url: art.cover_art_url.clone(),
                        thumbnail_art_url: art.thumbnail_art_url.clone(),
                    },
                )
            })
            .collect()
    });
    let is_mod = kind == CatalogKind::Mods;
    let mut record = ItemRecord {
        display_name: display.display_name,
        description: display.description,
        authors: display.authors,
        tags: display.tags,
        supported_games: display.supported_games.clone().filter(|_| !is_mod),
        website_url,
        versions: Vec::new(),
        cover_art_url: entry.cover_art_url.clone().filter(|_| is_mod),
        thumbnail_art_url: entry.thumbnail_art_url.clone(),
        release_date: entry.release_date_override.clone(),
        per_game_config,
        external_link: is_mod.then_some(None),
    };

    art_completeness(key, entry, kind)?;

    if let Some(link) = &entry.external_link {
        log::debug!("{} links to {}, not polling releases", key, link);
        record.external_link = Some(Some(link.clone()));
        return Ok(record);
    }

    let repo = entry
        .repo()
        .ok_or_else(|| NormalizeError::MissingRepo(key.to_string()))?;
    let filter =
        VersionFilter::new(&entry.ignore_versions).map_err(|source| NormalizeError::IgnoreRule {
            item: key.to_string(),
            source,
        })?;

    let releases = source
        .list_releases(&repo)
        .await
        .map_err(|source| NormalizeError::Releases {
            item: key.to_string(),
            repo: repo.clone(),
            source,
        })?;
    if record.release_date.is_none() {
        record.release_date = releases.first().and_then(|r| r.published_at.clone());
    }

    let mut versions = Vec::new();
    {
        let ctx = ReleaseContext {
            item: key,
            repo: &repo,
            record: &record,
            supported_games: display.supported_games.as_deref(),
            shape: kind.asset_shape(),
            mode,
        };
        for release in &releases {
            let version = match filter.accept(&release.tag_name) {
                Verdict::Accepted(version) => version,
                Verdict::InvalidVersion(version) => {
                    log::warn!(
                        "{}:{} is not a valid semantic version, skipping",
                        key.errstyle(ITEM_STYLE),
                        version.errstyle(VERSION_STYLE)
                    );
                    continue;
                }
                Verdict::Ignored { version, rule } => {
                    log::info!(
                        "ignoring release - {}:{} (matches '{}')",
                        key.errstyle(ITEM_STYLE),
                        version.errstyle(VERSION_STYLE),
                        rule
                    );
                    continue;
                }
            };
            let resolved = resolve(source, &ctx, release, &version).await?;
            if !resolved.has_downloads() {
                log::info!(
                    "ignoring version, no assets found - {}:{}",
                    key.errstyle(ITEM_STYLE),
                    version.errstyle(VERSION_STYLE)
                );
                continue;
            }
            versions.push(resolved);
        }
    }
    record.versions = versions;

    log::debug!(
        "[{}] {} ({}): {} of {} releases indexed",
        source.name(),
        key,
        repo,
        record.versions.len(),
        releases.len()
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::catalog::PerGameArt;
    use crate::index::document::Downloads;
    use crate::release_site::fake::{asset, release, Call, FakeSource};

    fn entry() -> ModEntry {
        ModEntry {
            display_name: Some("Baz".to_string()),
            description: Some("desc".to_string()),
            authors: Some(vec!["someone".to_string()]),
            tags: Some(vec!["qol".to_string()]),
            cover_art_url: Some("https://example.com/cover.png".to_string()),
            thumbnail_art_url: Some("https://example.com/thumb.png".to_string()),
            repo_owner: Some("owner".to_string()),
            repo_name: Some("baz".to_string()),
            ..Default::default()
        }
    }

    fn baz_releases() -> Vec<crate::release_site::RemoteRelease> {
        vec![
            release(3, "v1.1.0", "2024-05-01T00:00:00Z", vec![asset(30, "windows-baz.zip", 1)]),
            release(2, "nightly", "2024-04-01T00:00:00Z", vec![asset(20, "windows-n.zip", 1)]),
            release(1, "v0.9.0", "2024-03-01T00:00:00Z", vec![asset(10, "windows-old.zip", 1)]),
        ]
    }

    #[tokio::test]
    async fn ignored_and_invalid_versions_are_skipped() {
        let source = FakeSource::default().with_releases("owner/baz", baz_releases());
        let entry = ModEntry {
            ignore_versions: vec!["<1.0.0".to_string()],
            ..entry()
        };
        let record = normalize(&source, "baz", &entry, CatalogKind::Mods, MetadataMode::Standard)
            .await
            .unwrap();
        let versions: Vec<_> = record.versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(versions, vec!["1.1.0"]);
        assert_eq!(record.release_date.as_deref(), Some("2024-05-01T00:00:00Z"));
        assert_eq!(
            record.website_url.as_deref(),
            Some("https://www.github.com/owner/baz")
        );
        assert_eq!(record.external_link, Some(None));
    }

    #[tokio::test]
    async fn versions_keep_release_order() {
        let source = FakeSource::default().with_releases("owner/baz", baz_releases());
        let record = normalize(&source, "baz", &entry(), CatalogKind::Mods, MetadataMode::Standard)
            .await
            .unwrap();
        let versions: Vec<_> = record.versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(versions, vec!["1.1.0", "0.9.0"]);
    }

    #[tokio::test]
    async fn release_date_override_wins() {
        let source = FakeSource::default().with_releases("owner/baz", baz_releases());
        let entry = ModEntry {
            release_date_override: Some("2020-01-01".to_string()),
            website_url: Some("https://baz.example.com".to_string()),
            ..entry()
        };
        let record = normalize(&source, "baz", &entry, CatalogKind::Mods, MetadataMode::Standard)
            .await
            .unwrap();
        assert_eq!(record.release_date.as_deref(), Some("2020-01-01"));
        assert_eq!(record.website_url.as_deref(), Some("https://baz.example.com"));
    }

    #[tokio::test]
    async fn releases_without_downloads_are_dropped() {
        let source = FakeSource::default().with_releases(
            "owner/baz",
            vec![
                release(2, "v2.0.0", "2024-05-01T00:00:00Z", vec![asset(1, "source.tar.gz", 1)]),
                release(1, "v1.0.0", "2024-04-01T00:00:00Z", vec![asset(2, "linux-x.zip", 1)]),
            ],
        );
        let record = normalize(&source, "baz", &entry(), CatalogKind::Mods, MetadataMode::Standard)
            .await
            .unwrap();
        assert_eq!(record.versions.len(), 1);
        assert_eq!(record.versions[0].version, "1.0.0");
        assert!(record.versions.iter().all(|v| v.has_downloads()));
        // The newest release still dates the item, downloadable or not.
        assert_eq!(record.release_date.as_deref(), Some("2024-05-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn external_links_never_list_releases() {
        let source = FakeSource::default().with_releases("owner/baz", baz_releases());
        let entry = ModEntry {
            external_link: Some("https://elsewhere.example.com".to_string()),
            ..entry()
        };
        let record = normalize(&source, "baz", &entry, CatalogKind::Mods, MetadataMode::Standard)
            .await
            .unwrap();
        assert!(source.calls().is_empty());
        assert!(record.versions.is_empty());
        assert_eq!(record.website_url, None);
        assert_eq!(record.release_date, None);
        assert_eq!(
            record.external_link,
            Some(Some("https://elsewhere.example.com".to_string()))
        );
    }

    #[tokio::test]
    async fn missing_thumbnail_is_fatal_before_polling() {
        let source = FakeSource::default().with_releases("owner/baz", baz_releases());
        let entry = ModEntry {
            thumbnail_art_url: None,
            ..entry()
        };
        let err = normalize(&source, "foo", &entry, CatalogKind::Mods, MetadataMode::Standard)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("foo"), "{}", message);
        assert!(message.contains("thumbnail_art_url"), "{}", message);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn per_game_art_is_renamed() {
        let source = FakeSource::default();
        let mut per_game = IndexMap::new();
        per_game.insert(
            "jak1".to_string(),
            PerGameArt {
                cover_art_url: None,
                thumbnail_art_url: Some("t1".to_string()),
            },
        );
        let entry = ModEntry {
            thumbnail_art_url: None,
            supported_games: Some(vec!["jak1".to_string()]),
            per_game_config: Some(per_game),
            ..entry()
        };
        let record = normalize(&source, "baz", &entry, CatalogKind::Mods, MetadataMode::Standard)
            .await
            .unwrap();
        assert_eq!(record.thumbnail_art_url, None);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value["perGameConfig"],
            serde_json::json!({"jak1": {"thumbnailArtUrl": "t1"}})
        );
        assert!(value.get("thumbnailArtUrl").is_none());
    }

    #[tokio::test]
    async fn missing_repo_is_fatal() {
        let source = FakeSource::default();
        let entry = ModEntry {
            repo_name: None,
            ..entry()
        };
        let err = normalize(&source, "baz", &entry, CatalogKind::Mods, MetadataMode::Standard)
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizeError::MissingRepo(ref k) if k == "baz"));
        assert_eq!(err.to_string(), "'repo_owner' or 'repo_name' missing in: baz");
    }

    #[tokio::test]
    async fn bad_ignore_rule_is_fatal() {
        let source = FakeSource::default();
        let entry = ModEntry {
            ignore_versions: vec!["<one".to_string()],
            ..entry()
        };
        let err = normalize(&source, "baz", &entry, CatalogKind::Mods, MetadataMode::Standard)
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizeError::IgnoreRule { .. }));
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn texture_packs_use_single_archive() {
        let source = FakeSource::default().with_releases(
            "owner/baz",
            vec![release(1, "v1.0.0", "2024-04-01T00:00:00Z", vec![asset(2, "assets.zip", 8)])],
        );
        let entry = ModEntry {
            supported_games: Some(vec!["jak1".to_string()]),
            ..entry()
        };
        let record = normalize(
            &source,
            "baz",
            &entry,
            CatalogKind::TexturePacks,
            MetadataMode::Standard,
        )
        .await
        .unwrap();
        assert_eq!(record.versions.len(), 1);
        assert!(matches!(
            record.versions[0].downloads,
            Downloads::SingleArchive(ref a) if a.download_count == 8
        ));
        assert_eq!(source.calls(), vec![Call::List("owner/baz".to_string())]);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["supportedGames"], serde_json::json!(["jak1"]));
        assert!(value.get("coverArtUrl").is_none());
        assert!(value.get("externalLink").is_none());
    }

    #[tokio::test]
    async fn texture_pack_without_cover_art() {
        let source = FakeSource::default();
        let entry = ModEntry {
            supported_games: Some(vec!["jak1".to_string()]),
            cover_art_url: None,
            ..entry()
        };
        let record = normalize(
            &source,
            "hd",
            &entry,
            CatalogKind::TexturePacks,
            MetadataMode::Standard,
        )
        .await
        .unwrap();
        assert_eq!(record.cover_art_url, None);
        assert_eq!(record.thumbnail_art_url.as_deref(), Some("https://example.com/thumb.png"));
    }

    #[tokio::test]
    async fn mod_games_stay_on_versions() {
        let source = FakeSource::default().with_releases("owner/baz", baz_releases());
        let entry = ModEntry {
            supported_games: Some(vec!["jak2".to_string()]),
            ..entry()
        };
        let record = normalize(&source, "baz", &entry, CatalogKind::Mods, MetadataMode::Standard)
            .await
            .unwrap();
        assert_eq!(record.supported_games, None);
        let Downloads::MultiPlatform(ref p) = record.versions[0].downloads else {
            panic!("expected platform downloads");
        };
        assert_eq!(p.supported_games, vec!["jak2".to_string()]);
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("supportedGames").is_none());
        assert_eq!(value["externalLink"], serde_json::Value::Null);
    }
}
