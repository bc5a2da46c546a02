// HLS Mirror Coordinator: the poll loop tying together playlist loading,
// tokenizing, asset downloads and the mirror file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::hls::config::MirrorConfig;
use crate::hls::events::CycleReport;
use crate::hls::fetcher::AssetDownloader;
use crate::hls::output::MirrorWriter;
use crate::hls::playlist::parse_manifest;
use crate::hls::scheduler::PollSchedule;
use crate::hls::timeline::TimelineState;
use crate::{HttpFetch, MirrorError};

/// Where the playlist is read from on every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Remote(Url),
    /// A local file, re-read each cycle so it can be updated externally.
    Local(PathBuf),
}

impl ManifestSource {
    pub fn parse(input: &str) -> Result<Self, MirrorError> {
        let lower = input.trim().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(input.trim())
                .map_err(|e| MirrorError::invalid_url(input, e.to_string()))?;
            Ok(ManifestSource::Remote(url))
        } else {
            Ok(ManifestSource::Local(PathBuf::from(input)))
        }
    }

    /// `scheme://host[:port]` of a remote playlist.
    pub fn host_base(&self) -> Option<String> {
        match self {
            ManifestSource::Remote(url) => Some(url.origin().ascii_serialization()),
            ManifestSource::Local(_) => None,
        }
    }
}

impl fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestSource::Remote(url) => write!(f, "{url}"),
            ManifestSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Mirrors one live playlist into a directory.
///
/// Owns the timeline for the lifetime of the mirror, so the sliding windows
/// returned by successive refreshes are stitched into one sequence.
pub struct ManifestMirror {
    source: ManifestSource,
    host_base: String,
    config: MirrorConfig,
    fetcher: Arc<dyn HttpFetch>,
    downloader: AssetDownloader,
    writer: MirrorWriter,
    timeline: TimelineState,
    cycles: u64,
}

impl ManifestMirror {
    pub fn new(
        source: ManifestSource,
        save_dir: impl Into<PathBuf>,
        config: MirrorConfig,
        fetcher: Arc<dyn HttpFetch>,
    ) -> Self {
        let host_base = match config.base_url_override.clone().or_else(|| source.host_base()) {
            Some(base) => base,
            None => {
                warn!(
                    source = %source,
                    "No base URL for local manifest, relative URIs will not resolve"
                );
                String::new()
            }
        };

        let downloader = AssetDownloader::new(
            fetcher.clone(),
            config.routing.clone(),
            config.asset_timeout,
        );
        let writer = MirrorWriter::new(save_dir, &config.manifest_file_name);

        Self {
            source,
            host_base,
            config,
            fetcher,
            downloader,
            writer,
            timeline: TimelineState::new(),
            cycles: 0,
        }
    }

    pub fn timeline(&self) -> &TimelineState {
        &self.timeline
    }

    pub fn manifest_path(&self) -> &Path {
        self.writer.manifest_path()
    }

    pub fn host_base(&self) -> &str {
        &self.host_base
    }

    async fn load_manifest(&self) -> Result<String, MirrorError> {
        match &self.source {
            ManifestSource::Remote(url) => {
                info!(%url, "Reading manifest");
                let bytes = self.fetcher.fetch(url, self.config.manifest_timeout).await?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            ManifestSource::Local(path) => {
                info!(path = %path.display(), "Reading local manifest");
                Ok(tokio::fs::read_to_string(path).await?)
            }
        }
    }

    /// One fetch → parse → download → append pass.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, MirrorError> {
        let raw = self.load_manifest().await?;
        debug!(manifest = %raw, "Fetched manifest");

        let parsed = parse_manifest(&self.host_base, &raw, &mut self.timeline)?;

        let mut report = CycleReport {
            header_written: self.writer.write_header_if_new(&parsed.header).await?,
            ..CycleReport::default()
        };
        for entry in &parsed.body {
            let action = self.writer.append_entry(entry, &self.downloader).await?;
            report.record(&action);
        }
        report.segment_counter = self.timeline.segment_counter();
        self.cycles += 1;

        info!(
            cycle = self.cycles,
            total_lines = parsed.body.len(),
            mirrored = report.segments_mirrored,
            skipped = report.segments_skipped,
            keys = report.keys_mirrored,
            segment_counter = report.segment_counter,
            program_time = %self.timeline.current_timestamp(),
            "Cycle complete"
        );
        Ok(report)
    }

    /// Run cycles until the schedule says stop. Any error ends the loop.
    pub async fn run<S>(&mut self, schedule: &mut S) -> Result<(), MirrorError>
    where
        S: PollSchedule + ?Sized,
    {
        info!(
            source = %self.source,
            mirror = %self.writer.manifest_path().display(),
            "Starting mirror"
        );
        loop {
            self.run_cycle().await?;
            if !schedule.wait_next().await {
                info!(cycles = self.cycles, "Mirror stopped");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::testing::StaticFetcher;
    use crate::hls::scheduler::FixedDelay;
    use chrono::{DateTime, TimeDelta, Utc};
    use std::time::Duration;

    const WINDOW_1: &str = "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:1\n#EXTINF:6.0,\nseg1.ts\n#EXTINF:6.0,\nseg2.ts\n";
    const WINDOW_2: &str = "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:2\n#EXTINF:6.0,\nseg2.ts\n#EXTINF:6.0,\nseg3.ts\n";

    fn serve_segments(fetcher: &StaticFetcher) {
        for name in ["seg1.ts", "seg2.ts", "seg3.ts"] {
            fetcher.serve(&format!("http://example.com/{name}"), name.to_string());
        }
    }

    #[test]
    fn test_manifest_source_parse() {
        let remote = ManifestSource::parse("https://example.com:8443/live/index.m3u8?t=1").unwrap();
        assert_eq!(
            remote.host_base().as_deref(),
            Some("https://example.com:8443")
        );

        let local = ManifestSource::parse("/tmp/live.m3u8").unwrap();
        assert_eq!(local, ManifestSource::Local(PathBuf::from("/tmp/live.m3u8")));
        assert_eq!(local.host_base(), None);

        assert!(matches!(
            ManifestSource::parse("http://"),
            Err(MirrorError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_sliding_window_is_stitched() {
        let source_dir = tempfile::tempdir().unwrap();
        let save_dir = tempfile::tempdir().unwrap();
        let manifest = source_dir.path().join("live.m3u8");
        std::fs::write(&manifest, WINDOW_1).unwrap();

        let fetcher = Arc::new(StaticFetcher::new());
        serve_segments(&fetcher);
        let config = MirrorConfig {
            base_url_override: Some("http://example.com".to_string()),
            ..MirrorConfig::default()
        };
        let mut mirror = ManifestMirror::new(
            ManifestSource::Local(manifest.clone()),
            save_dir.path(),
            config,
            fetcher.clone(),
        );

        let first = mirror.run_cycle().await.unwrap();
        assert!(first.header_written);
        assert_eq!(first.segments_mirrored, 2);
        assert_eq!(mirror.timeline().segment_counter(), 3);

        std::fs::write(&manifest, WINDOW_2).unwrap();
        let second = mirror.run_cycle().await.unwrap();
        assert!(!second.header_written);
        assert_eq!(second.segments_mirrored, 1);
        assert_eq!(second.segments_skipped, 1);
        assert_eq!(second.segment_counter, 4);
        assert_eq!(
            mirror.timeline().current_timestamp(),
            DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(24)
        );

        let mirrored = std::fs::read_to_string(mirror.manifest_path()).unwrap();
        assert_eq!(
            mirrored,
            "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:1\n\
             #EXTINF:6.0,\nseg1.ts\n#EXTINF:6.0,\nseg2.ts\n#EXTINF:6.0,\nseg3.ts\n"
        );
        assert_eq!(fetcher.request_count("http://example.com/seg2.ts"), 1);
    }

    #[tokio::test]
    async fn test_remote_manifest_polled_until_schedule_stops() {
        let save_dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StaticFetcher::new());
        let manifest_url = "http://example.com/live/index.m3u8";
        fetcher.serve(manifest_url, WINDOW_1);
        serve_segments(&fetcher);

        let mut mirror = ManifestMirror::new(
            ManifestSource::parse(manifest_url).unwrap(),
            save_dir.path(),
            MirrorConfig::default(),
            fetcher.clone(),
        );
        assert_eq!(mirror.host_base(), "http://example.com");

        let mut schedule = FixedDelay::new(Duration::ZERO).with_max_cycles(3);
        mirror.run(&mut schedule).await.unwrap();

        assert_eq!(fetcher.request_count(manifest_url), 3);
        assert_eq!(fetcher.request_count("http://example.com/seg1.ts"), 1);
        let mirrored = std::fs::read_to_string(mirror.manifest_path()).unwrap();
        assert_eq!(mirrored.matches("#EXTM3U").count(), 1);
        assert_eq!(mirrored.matches("#EXT-X-MEDIA-SEQUENCE").count(), 1);
        assert_eq!(mirrored.matches("seg1.ts").count(), 1);
    }

    #[tokio::test]
    async fn test_manifest_http_error_ends_run() {
        let save_dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StaticFetcher::new());

        let mut mirror = ManifestMirror::new(
            ManifestSource::parse("http://example.com/gone.m3u8").unwrap(),
            save_dir.path(),
            MirrorConfig::default(),
            fetcher,
        );
        let err = mirror
            .run(&mut FixedDelay::new(Duration::ZERO))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 404);
        assert!(!mirror.manifest_path().exists());
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_not_a_transport_error() {
        let save_dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StaticFetcher::new());
        let manifest_url = "http://example.com/broken.m3u8";
        fetcher.serve(manifest_url, "#EXTM3U\n#EXTINF:6.0,\n");

        let mut mirror = ManifestMirror::new(
            ManifestSource::parse(manifest_url).unwrap(),
            save_dir.path(),
            MirrorConfig::default(),
            fetcher,
        );
        let err = mirror.run_cycle().await.unwrap_err();
        assert!(matches!(err, MirrorError::Playlist(_)));
        assert!(!err.is_transport());
    }
}
