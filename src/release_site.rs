use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::config::catalog::RepoId;
use crate::config::global::GlobalConfig;
use crate::uwu_colors::{ErrStyle, FILE_STYLE};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const GITHUB_API: &str = "https://api.github.com";
const GITHUB_UPLOADS: &str = "https://uploads.github.com";
const RELEASES_PER_PAGE: usize = 100;
/// Retries on top of the first attempt when the request quota runs out.
const MAX_RATE_LIMIT_RETRIES: u32 = 2;
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// A release as listed by the hosting service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteRelease {
    pub id: u64,
    pub tag_name: String,
    pub published_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<RemoteAsset>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteAsset {
    pub id: u64,
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    #[serde(default)]
    pub download_count: u64,
}

/// Raw result of fetching an asset. Non-success statuses are returned, not raised, so callers
/// can decide how bad that is.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAsset {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum ReleaseSourceError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} responded with {status}")]
    Status { url: String, status: StatusCode },
    #[error("Request quota exhausted for {url}, gave up after {} retries", MAX_RATE_LIMIT_RETRIES)]
    RateLimited { url: String },
    #[error("Abuse detected for request {url}")]
    AbuseDetected { url: String },
    #[error("Network access is disabled in lint mode")]
    Offline,
}

/// Where releases, and the assets attached to them, come from.
#[async_trait::async_trait]
pub trait ReleaseSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Every release of `repo`, newest first.
    async fn list_releases(&self, repo: &RepoId) -> Result<Vec<RemoteRelease>, ReleaseSourceError>;

    async fn fetch_asset(&self, url: &str) -> Result<FetchedAsset, ReleaseSourceError>;

    async fn delete_asset(&self, repo: &RepoId, asset_id: u64) -> Result<(), ReleaseSourceError>;

    async fn upload_asset(
        &self,
        repo: &RepoId,
        release_id: u64,
        name: &str,
        body: Vec<u8>,
    ) -> Result<(), ReleaseSourceError>;
}

pub struct GitHub {
    client: reqwest::Client,
    token: String,
}

impl GitHub {
    pub fn new(config: &GlobalConfig) -> Result<Self, ReleaseSourceError> {
        Ok(GitHub {
            client: reqwest::Client::builder().user_agent(USER_AGENT).build()?,
            token: config.github_token.clone(),
        })
    }

    fn api(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
    }

    /// Send the request built by `build`, waiting out quota exhaustion a bounded number of times.
    async fn send<F>(&self, url: &str, build: F) -> Result<Response, ReleaseSourceError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut retries = 0;
        loop {
            let response = build().send().await?;
            let now = chrono::Utc::now().timestamp();
            let limit = classify_rate_limit(response.status(), response.headers(), now);
            match next_attempt(limit, retries) {
                Attempt::Done => return Ok(response),
                Attempt::RetryAfter(wait) => {
                    log::warn!("Request quota exhausted for request {}", url.errstyle(FILE_STYLE));
                    retries += 1;
                    log::info!("Retrying after {} seconds!", wait.as_secs());
                    tokio::time::sleep(wait).await;
                }
                Attempt::GiveUp => {
                    log::warn!("Request quota exhausted for request {}", url.errstyle(FILE_STYLE));
                    return Err(ReleaseSourceError::RateLimited {
                        url: url.to_string(),
                    });
                }
                Attempt::Abuse => {
                    log::warn!("Abuse detected for request {}", url.errstyle(FILE_STYLE));
                    return Err(ReleaseSourceError::AbuseDetected {
                        url: url.to_string(),
                    });
                }
            }
        }
    }

    async fn send_ok<F>(&self, url: &str, build: F) -> Result<Response, ReleaseSourceError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let response = self.send(url, build).await?;
        if !response.status().is_success() {
            return Err(ReleaseSourceError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl ReleaseSource for GitHub {
    fn name(&self) -> &'static str {
        "GitHub"
    }

    async fn list_releases(&self, repo: &RepoId) -> Result<Vec<RemoteRelease>, ReleaseSourceError> {
        let url = format!("{}/repos/{}/{}/releases", GITHUB_API, repo.owner, repo.name);
        let mut releases = Vec::new();
        for page in 1.. {
            let query = [
                ("per_page", RELEASES_PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            let batch: Vec<RemoteRelease> = self
                .send_ok(&url, || self.api(self.client.get(&url)).query(&query))
                .await?
                .json()
                .await?;
            log::trace!("[{}] Page {} of {}: {} releases", self.name(), page, repo, batch.len());
            let last_page = batch.len() < RELEASES_PER_PAGE;
            releases.extend(batch);
            if last_page {
                break;
            }
        }
        Ok(releases)
    }

    async fn fetch_asset(&self, url: &str) -> Result<FetchedAsset, ReleaseSourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchedAsset { status, body })
    }

    async fn delete_asset(&self, repo: &RepoId, asset_id: u64) -> Result<(), ReleaseSourceError> {
        let url = format!(
            "{}/repos/{}/{}/releases/assets/{}",
            GITHUB_API, repo.owner, repo.name, asset_id
        );
        self.send_ok(&url, || self.api(self.client.delete(&url)))
            .await?;
        Ok(())
    }

    async fn upload_asset(
        &self,
        repo: &RepoId,
        release_id: u64,
        name: &str,
        body: Vec<u8>,
    ) -> Result<(), ReleaseSourceError> {
        let url = format!(
            "{}/repos/{}/{}/releases/{}/assets",
            GITHUB_UPLOADS, repo.owner, repo.name, release_id
        );
        self.send_ok(&url, || {
            self.api(self.client.post(&url))
                .query(&[("name", name)])
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone())
        })
        .await?;
        Ok(())
    }
}

/// Stand-in used by lint mode: there is nothing to list, and nothing may be touched.
pub struct Offline;

#[async_trait::async_trait]
impl ReleaseSource for Offline {
    fn name(&self) -> &'static str {
        "Offline"
    }

    async fn list_releases(&self, _repo: &RepoId) -> Result<Vec<RemoteRelease>, ReleaseSourceError> {
        Ok(Vec::new())
    }

    async fn fetch_asset(&self, _url: &str) -> Result<FetchedAsset, ReleaseSourceError> {
        Err(ReleaseSourceError::Offline)
    }

    async fn delete_asset(&self, _repo: &RepoId, _asset_id: u64) -> Result<(), ReleaseSourceError> {
        Err(ReleaseSourceError::Offline)
    }

    async fn upload_asset(
        &self,
        _repo: &RepoId,
        _release_id: u64,
        _name: &str,
        _body: Vec<u8>,
    ) -> Result<(), ReleaseSourceError> {
        Err(ReleaseSourceError::Offline)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimit {
    QuotaExhausted { wait: Duration },
    Abuse,
}

/// Work out whether a response is GitHub telling us to slow down, and for how long.
pub fn classify_rate_limit(status: StatusCode, headers: &HeaderMap, now: i64) -> Option<RateLimit> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }
    let header_num = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };
    let retry_after = header_num("retry-after");
    if header_num("x-ratelimit-remaining") == Some(0) {
        let wait = retry_after
            .or_else(|| header_num("x-ratelimit-reset").map(|reset| reset - now))
            .map(|secs| Duration::from_secs(secs.max(0) as u64))
            .unwrap_or(DEFAULT_RATE_LIMIT_WAIT);
        return Some(RateLimit::QuotaExhausted { wait });
    }
    retry_after.map(|_| RateLimit::Abuse)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Done,
    RetryAfter(Duration),
    GiveUp,
    Abuse,
}

/// Decide what follows a response, given the retries already spent on this request.
fn next_attempt(limit: Option<RateLimit>, retries: u32) -> Attempt {
    match limit {
        None => Attempt::Done,
        Some(RateLimit::QuotaExhausted { .. }) if retries >= MAX_RATE_LIMIT_RETRIES => {
            Attempt::GiveUp
        }
        Some(RateLimit::QuotaExhausted { wait }) => Attempt::RetryAfter(wait),
        Some(RateLimit::Abuse) => Attempt::Abuse,
    }
}
