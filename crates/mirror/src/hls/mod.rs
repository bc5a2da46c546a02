// Live playlist mirroring: tokenizer, timeline, asset fetcher, mirror writer
// and the poll loop that drives them.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod output;
pub mod playlist;
pub mod scheduler;
pub mod timeline;

// Re-exports for easier access
pub use config::{AssetRouting, DEFAULT_MANIFEST_FILE_NAME, MirrorConfig};
pub use coordinator::{ManifestMirror, ManifestSource};
pub use error::PlaylistError;
pub use events::{CycleReport, EntryAction};
pub use fetcher::{AssetDownloader, AssetRoute, FetchOutcome};
pub use output::MirrorWriter;
pub use playlist::{BodyEntry, ManifestHeader, ParsedManifest, SegmentEntry, parse_manifest};
pub use scheduler::{FixedDelay, PollSchedule};
pub use timeline::TimelineState;
