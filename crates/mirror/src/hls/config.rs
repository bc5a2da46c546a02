use std::time::Duration;

use crate::DownloaderConfig;

pub const DEFAULT_MANIFEST_FILE_NAME: &str = "manifest.m3u8";

// --- Top-Level Configuration ---
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Base downloader configuration
    pub base: DownloaderConfig,
    /// Name of the mirrored playlist inside the save directory
    pub manifest_file_name: String,
    /// Delay between the end of one cycle and the start of the next
    pub poll_interval: Duration,
    pub manifest_timeout: Duration,
    pub asset_timeout: Duration,
    /// Base joined to relative URIs of a local manifest. Remote manifests use
    /// the origin of their own URL.
    pub base_url_override: Option<String>,
    pub routing: AssetRouting,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            base: DownloaderConfig::default(),
            manifest_file_name: DEFAULT_MANIFEST_FILE_NAME.to_string(),
            poll_interval: Duration::from_secs(30),
            manifest_timeout: Duration::from_secs(10),
            asset_timeout: Duration::from_secs(30),
            base_url_override: None,
            routing: AssetRouting::default(),
        }
    }
}

// --- Asset Routing ---
/// Which URLs are stored under a content hash instead of their own name.
#[derive(Debug, Clone)]
pub struct AssetRouting {
    /// Host serving dynamically inserted ads (Google DAI)
    pub ad_host: String,
    /// Path fragment marking slate (filler) content on the ad host
    pub slate_marker: String,
    /// Path fragment marking a key-serving endpoint
    pub key_marker: String,
}

impl Default for AssetRouting {
    fn default() -> Self {
        Self {
            ad_host: "dai.google.com".to_string(),
            slate_marker: "slate".to_string(),
            key_marker: "serve.key".to_string(),
        }
    }
}
