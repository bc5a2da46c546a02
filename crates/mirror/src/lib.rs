//! # HLS Mirror Engine
//!
//! A library for mirroring live HLS media playlists to local storage.
//! Each poll cycle fetches the playlist, tokenizes it into a header and
//! body entries, downloads every referenced segment and key, and appends
//! the rewritten entries to an ever-growing local copy.
//!
//! ## Features
//!
//! - Sliding playlist windows stitched into one continuous playlist
//! - Segment sequence and program-time tracking across refreshes
//! - Content-addressed storage for ad-pod, slate and key-server assets
//! - Remote or local playlist sources

pub mod builder;
pub mod config;
pub mod downloader;
pub mod error;
pub mod hls;

pub use builder::DownloaderConfigBuilder;
pub use config::DownloaderConfig;
pub use error::MirrorError;

// Re-export downloader utilities
pub use downloader::{HttpFetch, HttpFetcher, create_client};
