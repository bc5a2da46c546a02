use std::path::{Path, PathBuf};
use std::time::Duration;

use hls_mirror_engine::DownloaderConfig;
use hls_mirror_engine::hls::{ManifestSource, MirrorConfig};

use crate::cli::CliArgs;
use crate::error::AppError;
use crate::utils::parse_headers;

/// What to mirror and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorJob {
    pub save_dir: PathBuf,
    pub source: ManifestSource,
}

impl MirrorJob {
    /// Resolve the positional arguments.
    ///
    /// With a save directory, `source` is the playlist itself. Without one,
    /// `source` must name a job file.
    pub async fn resolve(source: &str, save_dir: Option<&Path>) -> Result<Self, AppError> {
        if let Some(save_dir) = save_dir {
            return Ok(Self {
                save_dir: save_dir.to_path_buf(),
                source: ManifestSource::parse(source)?,
            });
        }

        let is_file = tokio::fs::metadata(source)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(AppError::InvalidInput(format!(
                "'{source}' is not a job file; pass SAVE_DIR to mirror a playlist directly"
            )));
        }

        let contents = tokio::fs::read_to_string(source).await?;
        Self::from_job_file(&contents)
    }

    /// Parse a job file: save directory on line 1, playlist source on line 2.
    pub fn from_job_file(contents: &str) -> Result<Self, AppError> {
        let mut lines = contents.lines().map(str::trim);

        let save_dir = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| AppError::InvalidInput("job file has no save directory".to_string()))?;
        let source = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| AppError::InvalidInput("job file has no playlist source".to_string()))?;

        Ok(Self {
            save_dir: PathBuf::from(save_dir),
            source: ManifestSource::parse(source)?,
        })
    }
}

/// Build the engine configuration from the command line.
pub fn mirror_config(args: &CliArgs) -> Result<MirrorConfig, AppError> {
    let manifest_name = args.manifest_name.trim();
    if manifest_name.is_empty() || manifest_name.contains(['/', '\\']) {
        return Err(AppError::InvalidInput(format!(
            "Invalid manifest name: '{}'",
            args.manifest_name
        )));
    }

    let mut builder = DownloaderConfig::builder()
        .with_connect_timeout(Duration::from_secs(args.connect_timeout))
        .with_headers(parse_headers(&args.headers))
        .with_follow_redirects(!args.no_redirects)
        .with_system_proxy(!args.no_proxy);
    if let Some(user_agent) = &args.user_agent {
        builder = builder.with_user_agent(user_agent.clone());
    }

    Ok(MirrorConfig {
        base: builder.build(),
        manifest_file_name: manifest_name.to_string(),
        poll_interval: Duration::from_secs(args.interval),
        manifest_timeout: Duration::from_secs(args.timeout),
        asset_timeout: Duration::from_secs(args.asset_timeout),
        base_url_override: args
            .base_url
            .as_deref()
            .map(|base| base.trim_end_matches('/').to_string()),
        ..MirrorConfig::default()
    })
}
