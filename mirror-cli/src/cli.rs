use clap::Parser;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser, Debug)]
#[command(
    author = "hua0512 <https://github.com/hua0512>",
    version,
    about = "Live HLS playlist mirroring tool",
    long_about = "Continuously mirrors a live HLS media playlist to a local directory.\n\
                  \n\
                  Every poll cycle the playlist is fetched, each referenced segment and key\n\
                  is downloaded once, and the new entries are appended to a local playlist\n\
                  that keeps growing for as long as the stream is live. Ad-pod, slate and\n\
                  key-server assets are stored under the SHA-1 of their content.\n\
                  \n\
                  With a single argument naming an existing file, that file is read as a job:\n\
                  line 1 is the save directory, line 2 the playlist URL or path."
)]
pub struct CliArgs {
    /// Playlist URL, local playlist path, or job file
    #[arg(
        required = true,
        help = "Playlist URL or local playlist path (or a two-line job file when SAVE_DIR is omitted)"
    )]
    pub source: String,

    /// Directory receiving the mirrored playlist and assets
    #[arg(help = "Directory where the mirrored playlist and assets are saved")]
    pub save_dir: Option<PathBuf>,

    /// Delay between poll cycles in seconds
    #[arg(
        short,
        long,
        default_value = "30",
        help = "Seconds to wait after a cycle before fetching the playlist again"
    )]
    pub interval: u64,

    /// Stop after this many cycles
    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Stop after the given number of poll cycles (default: run until interrupted)"
    )]
    pub max_cycles: Option<u64>,

    /// Playlist request timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Timeout in seconds for each playlist request"
    )]
    pub timeout: u64,

    /// Asset request timeout in seconds
    #[arg(
        long,
        default_value = "30",
        help = "Timeout in seconds for each segment or key request"
    )]
    pub asset_timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// Custom HTTP headers for download requests
    #[arg(
        long = "header",
        short = 'H',
        help = "Add custom HTTP header to requests (can be used multiple times). Format: 'Name: Value'",
        value_name = "HEADER"
    )]
    pub headers: Vec<String>,

    #[arg(long, help = "Override the User-Agent sent with every request")]
    pub user_agent: Option<String>,

    /// Base for relative URIs in a local playlist
    #[arg(
        long,
        help = "Base URL joined to relative URIs (required to resolve them for local playlists)"
    )]
    pub base_url: Option<String>,

    /// File name of the mirrored playlist
    #[arg(
        long,
        default_value = "manifest.m3u8",
        help = "File name of the mirrored playlist inside the save directory"
    )]
    pub manifest_name: String,

    /// Log file, truncated on start
    #[arg(
        long,
        default_value = "hls-mirror.log",
        help = "File receiving a copy of the log output (truncated on start)"
    )]
    pub log_file: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,

    #[arg(long, help = "Do not follow HTTP redirects for playlist and asset requests")]
    pub no_redirects: bool,

    /// Disable all proxy settings for downloads
    #[arg(
        long,
        help = "Disable all proxy settings (including system proxy) for downloads"
    )]
    pub no_proxy: bool,
}
