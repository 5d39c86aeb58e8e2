// Only NotFound may be cached; anything uncertain is TransientError.
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found,
    NotFound,
    TransientError,
}

impl ProbeOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, ProbeOutcome::Found)
    }
}

/// Query parameter appended to asset URLs so that stale "missing" answers
/// are not served from an intermediate cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBust {
    /// Changes once per minute; used for normal display of today's asset.
    Coarse,
    /// Changes on every request; used for probing.
    Fine,
    Token(String),
}

impl CacheBust {
    /// A one-off token for forced refreshes.
    pub fn fresh_token() -> Self {
        CacheBust::Token(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn value(&self) -> String {
        match self {
            CacheBust::Coarse => (Utc::now().timestamp() / 60).to_string(),
            CacheBust::Fine => Utc::now().timestamp_millis().to_string(),
            CacheBust::Token(token) => token.clone(),
        }
    }
}

/// `{base}/{filename}?t={bust}` with the filename percent-encoded.
pub fn asset_url(base: &Url, filename: &str, bust: &CacheBust) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let mut url = base.join(&urlencoding::encode(filename))?;
    url.query_pairs_mut().append_pair("t", &bust.value());
    Ok(url)
}

#[async_trait]
pub trait ExistenceProber: Send + Sync {
    async fn probe(&self, filename: &str) -> ProbeOutcome;

    fn name(&self) -> &str;
}

/// Runs `prober` with an upper bound; running out of time counts as a
/// transient failure, never as absence.
pub async fn probe_with_timeout(
    prober: &dyn ExistenceProber,
    filename: &str,
    timeout: Duration,
) -> ProbeOutcome {
    match tokio::time::timeout(timeout, prober.probe(filename)).await {
        Ok(outcome) => {
            trace!(filename, ?outcome, "probe finished");
            outcome
        }
        Err(_) => {
            debug!(filename, timeout_ms = timeout.as_millis() as u64, "probe timed out");
            ProbeOutcome::TransientError
        }
    }
}

/// Probes assets on a web server by fetching them.
pub struct HttpProber {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpProber {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl ExistenceProber for HttpProber {
    async fn probe(&self, filename: &str) -> ProbeOutcome {
        let url = match asset_url(&self.base_url, filename, &CacheBust::Fine) {
            Ok(url) => url,
            Err(e) => {
                debug!("Cannot build asset URL for {}: {}", filename, e);
                return ProbeOutcome::NotFound;
            }
        };

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Probe request for {} failed: {}", filename, e);
                return ProbeOutcome::TransientError;
            }
        };

        let status = response.status();
        if status.is_success() {
            let is_image = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|h| h.to_str().ok())
                .map(|ct| ct.starts_with("image/"))
                .unwrap_or(true);
            // A soft-404 page is not an image
            if is_image {
                ProbeOutcome::Found
            } else {
                ProbeOutcome::TransientError
            }
        } else if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            ProbeOutcome::NotFound
        } else {
            debug!("Probe for {} returned {}", filename, status);
            ProbeOutcome::TransientError
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Probes assets in a local directory, e.g. a mirror of the asset store.
pub struct DirectoryProber {
    directory: PathBuf,
}

impl DirectoryProber {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl ExistenceProber for DirectoryProber {
    async fn probe(&self, filename: &str) -> ProbeOutcome {
        if filename.contains('/') || filename.contains('\\') || filename.starts_with('.') {
            return ProbeOutcome::NotFound;
        }

        match tokio::fs::metadata(self.directory.join(filename)).await {
            Ok(metadata) if metadata.is_file() => ProbeOutcome::Found,
            Ok(_) => ProbeOutcome::NotFound,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ProbeOutcome::NotFound,
            Err(e) => {
                debug!("Cannot stat {}: {}", filename, e);
                ProbeOutcome::TransientError
            }
        }
    }

    fn name(&self) -> &str {
        "directory"
    }
}
