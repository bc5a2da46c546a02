use reqwest::StatusCode;

use crate::hls::PlaylistError;

// Error type for every mirroring operation
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned status code {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("Invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed playlist: {0}")]
    Playlist(#[from] PlaylistError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl MirrorError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// Whether the error came from the network side rather than from the
    /// playlist content or the local filesystem.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::HttpStatus { .. })
    }

    /// Process exit code used when this error terminates the mirror.
    ///
    /// A non-success HTTP status exits with the status code itself, everything
    /// else exits with `1`. Unix keeps only the low 8 bits, so the status a
    /// shell sees is the HTTP status modulo 256 (404 is reported as 148).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::HttpStatus { status, .. } => i32::from(status.as_u16()),
            Self::Network(e) => e.status().map_or(1, |s| i32::from(s.as_u16())),
            _ => 1,
        }
    }
}
