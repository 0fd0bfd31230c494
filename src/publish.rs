use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::index::document::IndexDocument;
use crate::uwu_colors::{ErrStyle, FILE_STYLE, SUCCESS_STYLE};

const LAST_UPDATED: &str = "lastUpdated";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PublishOutcome {
    Written,
    Unchanged,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Previously published {} is not valid JSON: {source}", path.display())]
    PreviousUnreadable {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write `document` to `path`, unless the document already there says the same thing.
///
/// `lastUpdated` is ignored when comparing, and stamped with `now` when writing.
pub async fn publish(
    document: &IndexDocument,
    path: &Path,
    now: DateTime<Utc>,
) -> Result<PublishOutcome, PublishError> {
    let io_err = |source: std::io::Error| PublishError::Io {
        path: path.to_owned(),
        source,
    };

    let mut fresh = serde_json::to_value(document)?;
    strip_last_updated(&mut fresh);

    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let mut previous: Value =
                serde_json::from_str(&text).map_err(|source| PublishError::PreviousUnreadable {
                    path: path.to_owned(),
                    source,
                })?;
            strip_last_updated(&mut previous);
            if previous == fresh {
                log::info!(
                    "{} would be unchanged, not updating the file",
                    path.display().errstyle(FILE_STYLE)
                );
                return Ok(PublishOutcome::Unchanged);
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No previous index at {}", path.display());
        }
        Err(e) => return Err(io_err(e)),
    }

    if let Value::Object(fields) = &mut fresh {
        fields.insert(
            LAST_UPDATED.to_string(),
            Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }
    let text = serde_json::to_string_pretty(&fresh)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, text).await.map_err(io_err)?;
    log::info!(
        "{} {}",
        "Wrote".errstyle(SUCCESS_STYLE),
        path.display().errstyle(FILE_STYLE)
    );

    Ok(PublishOutcome::Written)
}

fn strip_last_updated(document: &mut Value) {
    if let Value::Object(fields) = document {
        fields.remove(LAST_UPDATED);
    }
}
