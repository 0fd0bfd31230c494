use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::config::catalog::{AssetShape, RepoId};
use crate::index::document::{
    default_settings, ArchiveDownload, Downloads, ItemRecord, PerPlatform, PlatformDownloads,
    VersionRecord,
};
use crate::release_site::{ReleaseSource, ReleaseSourceError, RemoteAsset, RemoteRelease};
use crate::uwu_colors::{ErrStyle, ITEM_STYLE, VERSION_STYLE};

pub const METADATA_ASSET: &str = "metadata.json";
pub const ARCHIVE_ASSET: &str = "assets.zip";
/// Schema of `metadata.json` files synthesized for releases that lack one.
const SYNTHESIZED_METADATA_SCHEMA: &str = "0.1.0";

/// How `metadata.json` assets are treated.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MetadataMode {
    /// Read them, and insist that they declare `supportedGames`.
    Standard,
    /// Rewrite them from the catalog, or upload one where it is missing.
    Legacy,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Couldn't fetch metadata file for release {item}:{version}: {source}")]
    MetadataFetch {
        item: String,
        version: String,
        #[source]
        source: ReleaseSourceError,
    },
    #[error("Hit non-200 status code ({status}) when fetching metadata file for release {item}:{version}")]
    MetadataStatus {
        item: String,
        version: String,
        status: u16,
    },
    #[error("Bad metadata.json, not valid JSON: {source} -- {item}:{version}")]
    MetadataParse {
        item: String,
        version: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Bad metadata.json, expected a JSON object -- {item}:{version}")]
    MetadataNotObject { item: String, version: String },
    #[error("metadata.json, for version: {item}:{version} does not include 'supportedGames'")]
    MissingSupportedGames { item: String, version: String },
    #[error("metadata.json, for version: {item}:{version} has a 'supportedGames' that isn't a list of game names")]
    SupportedGamesNotStrings { item: String, version: String },
}

#[derive(Debug, Error)]
enum MetadataSyncError {
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Remote(#[from] ReleaseSourceError),
}

/// Everything about the owning catalog entry that resolving one of its releases needs.
pub struct ReleaseContext<'a> {
    pub item: &'a str,
    pub repo: &'a RepoId,
    /// The entry's record, with its display fields already filled in.
    pub record: &'a ItemRecord,
    /// `supported_games` from the catalog, if declared.
    pub supported_games: Option<&'a [String]>,
    pub shape: AssetShape,
    pub mode: MetadataMode,
}

/// Build the version record for `release`, which has already passed the version filter as
/// `version`.
///
/// The returned record may have no downloads at all; dropping it is up to the caller.
pub async fn resolve(
    source: &dyn ReleaseSource,
    ctx: &ReleaseContext<'_>,
    release: &RemoteRelease,
    version: &str,
) -> Result<VersionRecord, ResolveError> {
    let downloads = match ctx.shape {
        AssetShape::SingleArchive => Downloads::SingleArchive(classify_archive(&release.assets)),
        AssetShape::MultiPlatform => {
            Downloads::MultiPlatform(resolve_platforms(source, ctx, release, version).await?)
        }
    };
    Ok(VersionRecord {
        version: version.to_string(),
        published_date: release.published_at.clone(),
        downloads,
    })
}

fn classify_archive(assets: &[RemoteAsset]) -> ArchiveDownload {
    let mut download = ArchiveDownload::default();
    for asset in assets {
        if asset.name.to_lowercase() == ARCHIVE_ASSET {
            download.download_url = Some(asset.download_url.clone());
            download.download_count = asset.download_count;
        }
    }
    download
}

/// Platform assets of a release, and its `metadata.json` if it has one.
#[derive(Debug, Default)]
struct PlatformAssets<'r> {
    urls: PerPlatform<Option<String>>,
    counts: PerPlatform<u64>,
    metadata: Option<&'r RemoteAsset>,
}

fn classify_platforms(assets: &[RemoteAsset]) -> PlatformAssets<'_> {
    let mut classified = PlatformAssets::default();
    for asset in assets {
        let name = asset.name.to_lowercase();
        let url = Some(asset.download_url.clone());
        if name.starts_with("windows-") {
            classified.urls.windows = url;
            classified.counts.windows = asset.download_count;
        } else if name.starts_with("linux-") {
            classified.urls.linux = url;
            classified.counts.linux = asset.download_count;
        } else if name.starts_with("macos-") {
            classified.urls.macos = url;
            classified.counts.macos = asset.download_count;
        } else if name == METADATA_ASSET {
            classified.metadata = Some(asset);
        }
    }
    classified
}

async fn resolve_platforms(
    source: &dyn ReleaseSource,
    ctx: &ReleaseContext<'_>,
    release: &RemoteRelease,
    version: &str,
) -> Result<PlatformDownloads, ResolveError> {
    let assets = classify_platforms(&release.assets);
    let mut downloads = PlatformDownloads {
        supported_games: ctx.supported_games.map(<[String]>::to_vec).unwrap_or_default(),
        settings: default_settings(),
        assets: assets.urls,
        asset_download_counts: assets.counts,
    };

    let Some(metadata_asset) = assets.metadata else {
        if ctx.mode == MetadataMode::Legacy {
            let synthesized = synthesize_metadata(ctx, release, version);
            log::info!(
                "Uploading missing {} for {}:{}",
                METADATA_ASSET,
                ctx.item.errstyle(ITEM_STYLE),
                version.errstyle(VERSION_STYLE)
            );
            if let Err(e) = replace_metadata(source, ctx, release, None, &synthesized).await {
                log::warn!(
                    "Couldn't upload {} for {}:{}: {}",
                    METADATA_ASSET,
                    ctx.item,
                    version,
                    e
                );
            }
        }
        return Ok(downloads);
    };

    let mut metadata = fetch_metadata(source, ctx.item, version, metadata_asset).await?;
    if let Some(settings) = metadata.get("settings") {
        downloads.settings = settings.clone();
    }
    match ctx.mode {
        MetadataMode::Standard => {
            let games = metadata
                .get("supportedGames")
                .ok_or_else(|| ResolveError::MissingSupportedGames {
                    item: ctx.item.to_string(),
                    version: version.to_string(),
                })?;
            downloads.supported_games = serde_json::from_value(games.clone()).map_err(|_| {
                ResolveError::SupportedGamesNotStrings {
                    item: ctx.item.to_string(),
                    version: version.to_string(),
                }
            })?;
        }
        MetadataMode::Legacy => {
            overwrite_from_catalog(&mut metadata, ctx);
            log::info!(
                "Rewriting {} for {}:{}",
                METADATA_ASSET,
                ctx.item.errstyle(ITEM_STYLE),
                version.errstyle(VERSION_STYLE)
            );
            let rewritten = Value::Object(metadata);
            if let Err(e) =
                replace_metadata(source, ctx, release, Some(metadata_asset.id), &rewritten).await
            {
                log::warn!(
                    "Couldn't rewrite {} for {}:{}: {}",
                    METADATA_ASSET,
                    ctx.item,
                    version,
                    e
                );
            }
        }
    }

    Ok(downloads)
}

async fn fetch_metadata(
    source: &dyn ReleaseSource,
    item: &str,
    version: &str,
    asset: &RemoteAsset,
) -> Result<Map<String, Value>, ResolveError> {
    let fetched = source
        .fetch_asset(&asset.download_url)
        .await
        .map_err(|source| ResolveError::MetadataFetch {
            item: item.to_string(),
            version: version.to_string(),
            source,
        })?;
    if fetched.status != 200 {
        return Err(ResolveError::MetadataStatus {
            item: item.to_string(),
            version: version.to_string(),
            status: fetched.status,
        });
    }
    let value: Value =
        serde_json::from_str(&fetched.body).map_err(|source| ResolveError::MetadataParse {
            item: item.to_string(),
            version: version.to_string(),
            source,
        })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ResolveError::MetadataNotObject {
            item: item.to_string(),
            version: version.to_string(),
        }),
    }
}

/// Copy the catalog's display fields over whatever the release's metadata says.
fn overwrite_from_catalog(metadata: &mut Map<String, Value>, ctx: &ReleaseContext<'_>) {
    let record = ctx.record;
    metadata.insert("name".to_string(), json!(record.display_name));
    metadata.insert("description".to_string(), json!(record.description));
    metadata.insert("supportedGames".to_string(), json!(ctx.supported_games));
    metadata.insert("authors".to_string(), json!(record.authors));
    metadata.insert("tags".to_string(), json!(record.tags));
    match &record.website_url {
        Some(url) => metadata.insert("websiteUrl".to_string(), json!(url)),
        None => metadata.remove("websiteUrl"),
    };
}

fn synthesize_metadata(ctx: &ReleaseContext<'_>, release: &RemoteRelease, version: &str) -> Value {
    json!({
        "schemaVersion": SYNTHESIZED_METADATA_SCHEMA,
        "version": version,
        "name": ctx.record.display_name,
        "description": ctx.record.description,
        "supportedGames": ctx.supported_games,
        "authors": ctx.record.authors,
        "tags": ctx.record.tags,
        "publishedDate": release.published_at,
        "websiteUrl": ctx.repo.website_url(),
    })
}

/// Swap the release's `metadata.json` for `metadata`. The old asset, if any, is deleted first,
/// since the service rejects duplicate asset names.
async fn replace_metadata(
    source: &dyn ReleaseSource,
    ctx: &ReleaseContext<'_>,
    release: &RemoteRelease,
    old_asset: Option<u64>,
    metadata: &Value,
) -> Result<(), MetadataSyncError> {
    let body = serde_json::to_vec(metadata)?;
    if let Some(asset_id) = old_asset {
        source.delete_asset(ctx.repo, asset_id).await?;
    }
    source
        .upload_asset(ctx.repo, release.id, METADATA_ASSET, body)
        .await?;
    Ok(())
}
