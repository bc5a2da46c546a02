// HLS Asset Fetcher: downloads segments, keys and ad-pod assets into the
// mirror directory, at most once per destination file.

use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;

use crate::hls::config::AssetRouting;
use crate::{HttpFetch, MirrorError};

/// How an asset URL maps to a local file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRoute {
    /// Slate content on the ad host, stored as `slate_<sha1>.ts`
    Slate,
    /// Any other ad host content, stored as `adpod_<sha1>.ts`
    AdPod,
    /// Key server response, stored as `serve_<sha1>.key`
    KeyServer,
    /// Stored under the last path segment of the URL
    Named,
}

impl AssetRoute {
    pub fn for_url(url: &Url, routing: &AssetRouting) -> Self {
        let path = url.path();
        let on_ad_host = url
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(&routing.ad_host));

        if on_ad_host && path.contains(&routing.slate_marker) {
            AssetRoute::Slate
        } else if on_ad_host {
            AssetRoute::AdPod
        } else if path.contains(&routing.key_marker) {
            AssetRoute::KeyServer
        } else {
            AssetRoute::Named
        }
    }

    pub fn is_content_addressed(self) -> bool {
        !matches!(self, AssetRoute::Named)
    }

    fn hashed_file_name(self, digest: &str) -> Option<String> {
        match self {
            AssetRoute::Slate => Some(format!("slate_{digest}.ts")),
            AssetRoute::AdPod => Some(format!("adpod_{digest}.ts")),
            AssetRoute::KeyServer => Some(format!("serve_{digest}.key")),
            AssetRoute::Named => None,
        }
    }
}

/// Result of a single asset request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Bytes were fetched and written to a new file.
    Downloaded(PathBuf),
    /// Bytes were fetched but a file with the same content hash already existed.
    Deduplicated(PathBuf),
    /// A file with the URL's name already existed; nothing was fetched.
    AlreadyPresent(PathBuf),
}

impl FetchOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FetchOutcome::Downloaded(path)
            | FetchOutcome::Deduplicated(path)
            | FetchOutcome::AlreadyPresent(path) => path,
        }
    }

    /// Path to reference from the mirrored playlist for a segment.
    ///
    /// A named asset that was already on disk was mirrored by an earlier
    /// cycle, so it yields no path.
    pub fn mirrored_path(&self) -> Option<&Path> {
        match self {
            FetchOutcome::Downloaded(path) | FetchOutcome::Deduplicated(path) => Some(path),
            FetchOutcome::AlreadyPresent(_) => None,
        }
    }
}

pub struct AssetDownloader {
    fetcher: Arc<dyn HttpFetch>,
    routing: AssetRouting,
    timeout: Duration,
}

impl AssetDownloader {
    pub fn new(fetcher: Arc<dyn HttpFetch>, routing: AssetRouting, timeout: Duration) -> Self {
        Self {
            fetcher,
            routing,
            timeout,
        }
    }

    /// Fetch `url` into `dest_dir`.
    ///
    /// Content-addressed routes always hit the network and only skip the
    /// write; named routes skip the request entirely when the file exists.
    pub async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<FetchOutcome, MirrorError> {
        let parsed = Url::parse(url).map_err(|e| MirrorError::invalid_url(url, e.to_string()))?;
        let route = AssetRoute::for_url(&parsed, &self.routing);
        debug!(%url, ?route, "Routing asset");

        if route.is_content_addressed() {
            self.fetch_hashed(route, &parsed, dest_dir).await
        } else {
            self.fetch_named(&parsed, dest_dir).await
        }
    }

    async fn fetch_hashed(
        &self,
        route: AssetRoute,
        url: &Url,
        dest_dir: &Path,
    ) -> Result<FetchOutcome, MirrorError> {
        let bytes = self.fetcher.fetch(url, self.timeout).await?;
        let digest = hex::encode(Sha1::digest(&bytes));
        let file_name = route
            .hashed_file_name(&digest)
            .ok_or_else(|| MirrorError::invalid_url(url.as_str(), "route has no hashed name"))?;
        let target = dest_dir.join(file_name);

        info!(%url, target = %target.display(), "Fetched content-addressed asset");

        if fs::try_exists(&target).await? {
            warn!(target = %target.display(), "Ad-pod/key file already exists, skipping write");
            return Ok(FetchOutcome::Deduplicated(target));
        }

        write_atomically(&target, &bytes).await?;
        Ok(FetchOutcome::Downloaded(target))
    }

    async fn fetch_named(&self, url: &Url, dest_dir: &Path) -> Result<FetchOutcome, MirrorError> {
        let file_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| MirrorError::invalid_url(url.as_str(), "URL has no file name"))?;
        let target = dest_dir.join(file_name);

        if fs::try_exists(&target).await? {
            warn!(%url, target = %target.display(), "File already exists, skipping download");
            return Ok(FetchOutcome::AlreadyPresent(target));
        }

        info!(%url, target = %target.display(), "Downloading asset");
        let bytes = self.fetcher.fetch(url, self.timeout).await?;
        write_atomically(&target, &bytes).await?;
        Ok(FetchOutcome::Downloaded(target))
    }
}

// Write through a `.part` file so an interrupted write never leaves a
// truncated file under the final name.
async fn write_atomically(target: &Path, bytes: &Bytes) -> Result<(), MirrorError> {
    let mut partial = target.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    fs::write(&partial, bytes).await?;
    fs::rename(&partial, target).await?;
    debug!(bytes = bytes.len(), target = %target.display(), "Wrote asset");
    Ok(())
}
