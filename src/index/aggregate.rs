use itertools::Itertools;
use thiserror::Error;

use crate::config::catalog::{CatalogConfig, CatalogError, CatalogKind};
use crate::index::document::IndexDocument;
use crate::index::normalize::{normalize, NormalizeError};
use crate::index::resolve::MetadataMode;
use crate::release_site::ReleaseSource;
use crate::uwu_colors::{ErrStyle, CATALOG_STYLE, ITEM_STYLE};

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Build the index for the whole catalog: mods first, then texture packs, each in declaration
/// order.
///
/// Legacy mode only deals with mods; texture packs are neither required nor visited.
pub async fn aggregate(
    catalog: &CatalogConfig,
    source: &dyn ReleaseSource,
    mode: MetadataMode,
) -> Result<IndexDocument, AggregateError> {
    let mut document = IndexDocument::new(catalog.source_name()?);

    let kinds: &[CatalogKind] = match mode {
        MetadataMode::Standard => &[CatalogKind::Mods, CatalogKind::TexturePacks],
        MetadataMode::Legacy => &[CatalogKind::Mods],
    };
    for &kind in kinds {
        let section = catalog.section(kind)?;
        let records = match kind {
            CatalogKind::Mods => &mut document.mods,
            CatalogKind::TexturePacks => &mut document.texture_packs,
        };
        for (key, entry) in section {
            log::debug!("[{}] Indexing {}", kind.errstyle(CATALOG_STYLE), key.errstyle(ITEM_STYLE));
            let record = normalize(source, key, entry, kind, mode).await?;
            records.insert(key.clone(), record);
        }
        log::info!(
            "[{}] Indexed {} entries: {}",
            kind.errstyle(CATALOG_STYLE),
            records.len(),
            records.keys().join(", ")
        );
    }

    Ok(document)
}
