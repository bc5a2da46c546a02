use std::path::Path;

use crate::error::AppError;

/// Creates all directories in the given path, including parent directories if they don't exist.
#[inline]
pub async fn create_dirs(path: &Path) -> Result<(), AppError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(AppError::Io)?;
    Ok(())
}

/// Make sure the save directory exists.
///
/// A directory created by this call gets a `.gitignore` ignoring all of its
/// contents; an existing directory is left untouched. Returns whether the
/// directory was created.
pub async fn prepare_save_dir(path: &Path) -> Result<bool, AppError> {
    if tokio::fs::try_exists(path).await? {
        if !tokio::fs::metadata(path).await?.is_dir() {
            return Err(AppError::InvalidInput(format!(
                "Save path '{}' exists and is not a directory",
                path.display()
            )));
        }
        return Ok(false);
    }

    create_dirs(path).await?;
    tokio::fs::write(path.join(".gitignore"), "*").await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_dir_gets_gitignore() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("show");

        assert!(prepare_save_dir(&dir).await.unwrap());
        assert_eq!(std::fs::read_to_string(dir.join(".gitignore")).unwrap(), "*");
    }

    #[tokio::test]
    async fn test_existing_dir_untouched() {
        let dir = tempfile::tempdir().unwrap();

        assert!(!prepare_save_dir(dir.path()).await.unwrap());
        assert!(!dir.path().join(".gitignore").exists());
    }

    #[tokio::test]
    async fn test_file_in_the_way() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("taken");
        std::fs::write(&file, "x").unwrap();

        assert!(matches!(
            prepare_save_dir(&file).await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
