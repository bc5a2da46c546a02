use hls_mirror_engine::MirrorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mirror error: {0}")]
    Mirror(#[from] MirrorError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),
}

impl AppError {
    /// Exit code for the process when this error ends the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Mirror(e) => e.exit_code(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_exit_code_follows_http_status() {
        let err: AppError =
            MirrorError::http_status(StatusCode::FORBIDDEN, "https://example.com/live.m3u8").into();
        assert_eq!(err.exit_code(), 403);

        let err = AppError::InvalidInput("missing save directory".to_string());
        assert_eq!(err.exit_code(), 1);

        let err: AppError = std::io::Error::other("disk full").into();
        assert_eq!(err.exit_code(), 1);
    }
}
