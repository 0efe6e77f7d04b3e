use async_std::task;
use futures::io::{AsyncReadExt, AsyncWriteExt};
use log::{debug, info, warn};
use snatcher_core::{FetchConfig, SnatchError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use surf::middleware::{Middleware, Next};
use surf::{Client, Request, Response, StatusCode, Url};
use uuid::Uuid;

const CHUNK_SIZE: usize = 256 * 1024;

/// Per-call knobs for [`ContentFetcher::fetch_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Store as `<name>.<ext>` instead of `<md5>.<ext>`.
    pub name: Option<String>,
    pub error_if_exists: bool,
    /// Overrides the fetcher-wide attempt count.
    pub max_retries: Option<u32>,
}

impl FetchOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn error_if_exists(mut self) -> Self {
        self.error_if_exists = true;
        self
    }

    pub fn with_max_retries(mut self, attempts: u32) -> Self {
        self.max_retries = Some(attempts);
        self
    }
}

enum AttemptError {
    Retry(String),
    Fatal(SnatchError),
}

/// Downloads single resources into folders, naming them explicitly or by
/// the MD5 of their content.
///
/// Cloning is cheap: clones share the HTTP client and the memo of
/// already-fetched URLs.
#[derive(Clone)]
pub struct ContentFetcher {
    client: Client,
    config: FetchConfig,
    memo: Arc<Mutex<HashMap<(PathBuf, String), String>>>,
}

impl ContentFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let client = Client::new().with(FollowRedirects {
            limit: config.redirect_limit,
        });
        Self {
            client,
            config,
            memo: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches `url` into `dest` and returns the stored file name.
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        name: Option<&str>,
    ) -> Result<String, SnatchError> {
        let options = FetchOptions {
            name: name.map(str::to_string),
            ..FetchOptions::default()
        };
        self.fetch_with(url, dest, &options).await
    }

    pub async fn fetch_with(
        &self,
        url: &str,
        dest: &Path,
        options: &FetchOptions,
    ) -> Result<String, SnatchError> {
        let parsed = Url::parse(url).map_err(|e| SnatchError::DownloadFailed {
            url: url.to_string(),
            attempts: 0,
            reason: format!("invalid url: {}", e),
        })?;

        async_std::fs::create_dir_all(dest).await?;
        let ext = extension_from_url(&parsed);

        if let Some(name) = &options.name {
            let file_name = format!("{}{}", name, ext);
            let target = dest.join(&file_name);
            if target.exists() {
                if options.error_if_exists {
                    return Err(SnatchError::AlreadyExists(target));
                }
                debug!("{} already present, skipping download", target.display());
                return Ok(file_name);
            }
        } else if let Some(known) = self.memoized(dest, url) {
            let target = dest.join(&known);
            if target.exists() {
                if options.error_if_exists {
                    return Err(SnatchError::AlreadyExists(target));
                }
                debug!("{} already fetched as {}", url, known);
                return Ok(known);
            }
        }

        let attempts = options.max_retries.unwrap_or(self.config.max_retries).max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.attempt(&parsed, dest, &ext, options).await {
                Ok(file_name) => {
                    self.remember(dest, url, &file_name);
                    return Ok(file_name);
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retry(reason)) => {
                    warn!(
                        "Download of {} failed ({}/{}): {}",
                        url, attempt, attempts, reason
                    );
                    last_error = reason;
                    if attempt < attempts {
                        task::sleep(self.config.backoff * attempt).await;
                    }
                }
            }
        }

        Err(SnatchError::DownloadFailed {
            url: url.to_string(),
            attempts,
            reason: last_error,
        })
    }

    async fn attempt(
        &self,
        url: &Url,
        dest: &Path,
        ext: &str,
        options: &FetchOptions,
    ) -> Result<String, AttemptError> {
        let temp = dest.join(format!(".{}.part", Uuid::new_v4()));

        let digest = match self.stream_to(url, &temp).await {
            Ok(digest) => digest,
            Err(reason) => {
                discard(&temp).await;
                return Err(AttemptError::Retry(reason));
            }
        };

        let file_name = match &options.name {
            Some(name) => format!("{}{}", name, ext),
            None => format!("{}{}", digest, ext),
        };
        let target = dest.join(&file_name);

        if target.exists() {
            discard(&temp).await;
            if options.error_if_exists {
                return Err(AttemptError::Fatal(SnatchError::AlreadyExists(target)));
            }
            info!("{} already exists, keeping the stored copy", file_name);
            return Ok(file_name);
        }

        if let Err(e) = async_std::fs::rename(&temp, &target).await {
            discard(&temp).await;
            return Err(AttemptError::Retry(format!(
                "could not move into {}: {}",
                target.display(),
                e
            )));
        }

        Ok(file_name)
    }

    /// Streams the body into `temp`, hashing it on the way. Returns the
    /// lowercase hex MD5 of the content.
    async fn stream_to(&self, url: &Url, temp: &Path) -> Result<String, String> {
        let mut response = self
            .client
            .get(url.as_str())
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("server answered {}", status));
        }

        if let Some(len) = response.len() {
            debug!("Downloading {} ({} KiB)", url, len / 1024);
        }

        let mut file = async_std::fs::File::create(temp)
            .await
            .map_err(|e| format!("could not create {}: {}", temp.display(), e))?;

        let mut hasher = md5::Context::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = response
                .read(&mut buf)
                .await
                .map_err(|e| format!("stream interrupted: {}", e))?;
            if n == 0 {
                break;
            }
            hasher.consume(&buf[..n]);
            file.write_all(&buf[..n])
                .await
                .map_err(|e| format!("write failed: {}", e))?;
        }
        file.flush()
            .await
            .map_err(|e| format!("flush failed: {}", e))?;

        Ok(format!("{:x}", hasher.compute()))
    }

    fn memoized(&self, dest: &Path, url: &str) -> Option<String> {
        let memo = self.memo.lock().ok()?;
        memo.get(&(dest.to_path_buf(), url.to_string())).cloned()
    }

    fn remember(&self, dest: &Path, url: &str, file_name: &str) {
        if let Ok(mut memo) = self.memo.lock() {
            memo.insert((dest.to_path_buf(), url.to_string()), file_name.to_string());
        }
    }
}

async fn discard(path: &Path) {
    if let Err(e) = async_std::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove partial file {}: {}", path.display(), e);
        }
    }
}

/// `.ext` of the URL's last path segment, or an empty string.
pub fn extension_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|segment| Path::new(segment).extension())
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Follows `Location` headers, at most `limit` hops per request.
struct FollowRedirects {
    limit: u8,
}

#[surf::utils::async_trait]
impl Middleware for FollowRedirects {
    async fn handle(&self, req: Request, client: Client, next: Next<'_>) -> surf::Result<Response> {
        let mut req = req;
        let mut hops = 0u8;
        loop {
            let response = next.run(req.clone(), client.clone()).await?;
            if !response.status().is_redirection() {
                return Ok(response);
            }
            let Some(location) = response
                .header("Location")
                .map(|values| values.last().as_str().to_string())
            else {
                return Ok(response);
            };
            if hops >= self.limit {
                return Err(surf::Error::from_str(
                    StatusCode::LoopDetected,
                    format!("more than {} redirects", self.limit),
                ));
            }

            let target = resolve_location(req.url(), &location).ok_or_else(|| {
                surf::Error::from_str(
                    StatusCode::BadGateway,
                    format!("invalid redirect location {:?}", location),
                )
            })?;
            hops += 1;
            debug!("Redirect {}/{} to {}", hops, self.limit, target);
            req = Request::new(req.method(), target);
        }
    }
}

/// CDNs answer with both absolute and path-only locations.
fn resolve_location(current: &Url, location: &str) -> Option<Url> {
    Url::parse(location).or_else(|_| current.join(location)).ok()
}
