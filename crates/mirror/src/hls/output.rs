// HLS Mirror Writer: appends parsed entries to the local, ever-growing copy
// of the playlist.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::MirrorError;
use crate::hls::events::EntryAction;
use crate::hls::fetcher::AssetDownloader;
use crate::hls::playlist::{BodyEntry, KeyDirective, ManifestHeader};

/// Append-only writer for `<save_dir>/<manifest_file_name>`.
///
/// The file's existence is the only record that the header was written.
/// Body entries are not indexed; repeated segments are filtered by the asset
/// downloader reporting that their file already exists.
pub struct MirrorWriter {
    dir: PathBuf,
    manifest_path: PathBuf,
}

impl MirrorWriter {
    pub fn new(dir: impl Into<PathBuf>, manifest_file_name: &str) -> Self {
        let dir = dir.into();
        let manifest_path = dir.join(manifest_file_name);
        Self { dir, manifest_path }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Create the mirror file with `header` unless it already exists.
    ///
    /// Returns whether the header was written.
    pub async fn write_header_if_new(&self, header: &ManifestHeader) -> Result<bool, MirrorError> {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.manifest_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        file.write_all(join_lines(header.lines()).as_bytes()).await?;
        file.flush().await?;
        info!(
            path = %self.manifest_path.display(),
            lines = header.lines().len(),
            "Created mirror manifest"
        );
        Ok(true)
    }

    /// Mirror one body entry, downloading whatever it references.
    pub async fn append_entry(
        &self,
        entry: &BodyEntry,
        downloader: &AssetDownloader,
    ) -> Result<EntryAction, MirrorError> {
        match entry {
            BodyEntry::Segment(segment) => {
                let outcome = downloader.fetch(&segment.url, &self.dir).await?;
                let Some(path) = outcome.mirrored_path() else {
                    debug!(url = %segment.url, "Segment already mirrored");
                    return Ok(EntryAction::SegmentSkipped {
                        url: segment.url.clone(),
                    });
                };

                let mut lines = segment.directive_lines.clone();
                let mut keys = Vec::with_capacity(segment.keys.len());
                for (index, key) in &segment.keys {
                    let (line, key_path) = self.mirror_key(key, downloader).await?;
                    if let Some(slot) = lines.get_mut(*index) {
                        *slot = line;
                    }
                    keys.push(key_path);
                }
                lines.push(self.local_reference(path));
                self.append_lines(lines.as_slice()).await?;
                debug!(
                    index = segment.segment_index,
                    timestamp = %segment.program_timestamp,
                    keys = keys.len(),
                    "Mirrored segment"
                );
                Ok(EntryAction::SegmentMirrored {
                    path: path.to_path_buf(),
                    keys,
                })
            }
            BodyEntry::Key(key) => {
                let (line, path) = self.mirror_key(key, downloader).await?;
                self.append_lines(&[line]).await?;
                Ok(EntryAction::KeyMirrored { path })
            }
            BodyEntry::Timestamp(ts) => {
                self.append_lines(&[ts.raw_line.as_str()]).await?;
                Ok(EntryAction::LineCopied)
            }
            BodyEntry::Opaque(line) => {
                self.append_lines(&[line.as_str()]).await?;
                Ok(EntryAction::LineCopied)
            }
            BodyEntry::Blank => {
                self.append_lines(&[""]).await?;
                Ok(EntryAction::BlankLine)
            }
        }
    }

    // Download the key and point its URI attribute at the local copy.
    async fn mirror_key(
        &self,
        key: &KeyDirective,
        downloader: &AssetDownloader,
    ) -> Result<(String, PathBuf), MirrorError> {
        let outcome = downloader.fetch(&key.url, &self.dir).await?;
        let line = format!(
            "{}\"{}\"{}",
            key.prefix,
            self.local_reference(outcome.path()),
            key.suffix
        );
        Ok((line, outcome.path().to_path_buf()))
    }

    // Assets live next to the manifest, so reference them by relative name.
    fn local_reference(&self, path: &Path) -> String {
        path.strip_prefix(&self.dir)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    async fn append_lines<S: AsRef<str>>(&self, lines: &[S]) -> Result<(), MirrorError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.manifest_path)
            .await?;
        file.write_all(join_lines(lines).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut buf = String::new();
    for line in lines {
        buf.push_str(line.as_ref());
        buf.push('\n');
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::testing::StaticFetcher;
    use crate::hls::config::AssetRouting;
    use crate::hls::playlist::parse_manifest;
    use crate::hls::timeline::TimelineState;
    use std::sync::Arc;
    use std::time::Duration;

    const HOST: &str = "http://example.com";

    fn setup() -> (tempfile::TempDir, Arc<StaticFetcher>, AssetDownloader) {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StaticFetcher::new());
        let downloader = AssetDownloader::new(
            fetcher.clone(),
            AssetRouting::default(),
            Duration::from_secs(5),
        );
        (dir, fetcher, downloader)
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let (dir, _fetcher, _downloader) = setup();
        let writer = MirrorWriter::new(dir.path(), "manifest.m3u8");
        let mut timeline = TimelineState::new();
        let parsed = parse_manifest(HOST, "#EXTM3U\n#EXT-X-VERSION:3\n", &mut timeline).unwrap();

        assert!(writer.write_header_if_new(&parsed.header).await.unwrap());
        for _ in 0..3 {
            assert!(!writer.write_header_if_new(&parsed.header).await.unwrap());
        }
        assert_eq!(read(writer.manifest_path()), "#EXTM3U\n#EXT-X-VERSION:3\n");
    }

    #[tokio::test]
    async fn test_segment_mirrored_then_skipped() {
        let (dir, fetcher, downloader) = setup();
        fetcher.serve("http://example.com/seg1.ts", "ts");
        let writer = MirrorWriter::new(dir.path(), "manifest.m3u8");
        let mut timeline = TimelineState::new();
        let parsed = parse_manifest(HOST, "#EXTINF:6.0,\nseg1.ts\n", &mut timeline).unwrap();

        let action = writer.append_entry(&parsed.body[0], &downloader).await.unwrap();
        assert_eq!(
            action,
            EntryAction::SegmentMirrored {
                path: dir.path().join("seg1.ts"),
                keys: Vec::new(),
            }
        );

        let action = writer.append_entry(&parsed.body[0], &downloader).await.unwrap();
        assert_eq!(
            action,
            EntryAction::SegmentSkipped {
                url: "http://example.com/seg1.ts".to_string()
            }
        );
        assert_eq!(read(writer.manifest_path()), "#EXTINF:6.0,\nseg1.ts\n");
    }

    #[tokio::test]
    async fn test_key_always_appended() {
        let (dir, fetcher, downloader) = setup();
        fetcher.serve("https://x.com/k.key", "0123456789abcdef");
        let writer = MirrorWriter::new(dir.path(), "manifest.m3u8");
        let mut timeline = TimelineState::new();
        let parsed = parse_manifest(
            HOST,
            "#EXT-X-KEY:METHOD=AES-128,URI=\"https://x.com/k.key\",IV=0x01",
            &mut timeline,
        )
        .unwrap();

        for _ in 0..2 {
            let action = writer.append_entry(&parsed.body[0], &downloader).await.unwrap();
            assert_eq!(
                action,
                EntryAction::KeyMirrored {
                    path: dir.path().join("k.key")
                }
            );
        }
        let line = "#EXT-X-KEY:METHOD=AES-128,URI=\"k.key\",IV=0x01\n";
        assert_eq!(read(writer.manifest_path()), format!("{line}{line}"));
        assert_eq!(fetcher.request_count("https://x.com/k.key"), 1);
    }

    #[tokio::test]
    async fn test_key_inside_segment_group_is_mirrored() {
        let (dir, fetcher, downloader) = setup();
        fetcher.serve("https://x.com/k.key", "0123456789abcdef");
        fetcher.serve("http://example.com/seg1.ts", "ts");
        let writer = MirrorWriter::new(dir.path(), "manifest.m3u8");
        let mut timeline = TimelineState::new();
        let raw = "#EXT-X-DISCONTINUITY\n\
                   #EXT-X-KEY:METHOD=AES-128,URI=\"https://x.com/k.key\",IV=0x01\n\
                   #EXTINF:6.0,\n\
                   seg1.ts\n";
        let parsed = parse_manifest(HOST, raw, &mut timeline).unwrap();

        let action = writer.append_entry(&parsed.body[0], &downloader).await.unwrap();
        assert_eq!(
            action,
            EntryAction::SegmentMirrored {
                path: dir.path().join("seg1.ts"),
                keys: vec![dir.path().join("k.key")],
            }
        );
        assert_eq!(
            fetcher.requests(),
            ["http://example.com/seg1.ts", "https://x.com/k.key"]
        );
        assert_eq!(
            read(writer.manifest_path()),
            "#EXT-X-DISCONTINUITY\n\
             #EXT-X-KEY:METHOD=AES-128,URI=\"k.key\",IV=0x01\n\
             #EXTINF:6.0,\n\
             seg1.ts\n"
        );
        assert_eq!(std::fs::read(dir.path().join("k.key")).unwrap(), b"0123456789abcdef");
    }

    #[tokio::test]
    async fn test_pass_through_entries() {
        let (dir, fetcher, downloader) = setup();
        let writer = MirrorWriter::new(dir.path(), "manifest.m3u8");
        let mut timeline = TimelineState::new();
        let raw = "#EXT-X-PROGRAM-DATE-TIME:2024-05-01T12:00:00Z\n\ncomment\n#EXT-X-ENDLIST\n";
        let parsed = parse_manifest(HOST, raw, &mut timeline).unwrap();

        let mut actions = Vec::new();
        for entry in &parsed.body {
            actions.push(writer.append_entry(entry, &downloader).await.unwrap());
        }

        assert_eq!(
            actions,
            [
                EntryAction::LineCopied,
                EntryAction::BlankLine,
                EntryAction::LineCopied,
                EntryAction::LineCopied,
            ]
        );
        assert_eq!(read(writer.manifest_path()), raw);
        assert!(fetcher.requests().is_empty());
    }
}
