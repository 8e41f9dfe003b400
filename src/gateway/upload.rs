//! Uploaded audio staged on disk for the duration of one request.

use crate::constants::server::{DEFAULT_UPLOAD_EXTENSION, UPLOAD_FILE_PREFIX};
use crate::error::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};

const MAX_EXTENSION_LEN: usize = 8;

/// A uniquely named temp file holding one upload. The file is removed
/// when the value is dropped.
#[derive(Debug)]
pub struct StagedAudio {
    path: Option<TempPath>,
}

impl StagedAudio {
    /// Write `data` to a new file in `dir` (system temp dir when `None`).
    ///
    /// The extension is taken from the client's file name when it looks
    /// like a plain audio extension, so decoders can use it as a format hint.
    pub async fn write(dir: Option<&Path>, file_name: Option<&str>, data: Vec<u8>) -> Result<Self> {
        let dir = dir.map_or_else(std::env::temp_dir, Path::to_path_buf);
        let suffix = format!(".{}", upload_extension(file_name));

        let path = tokio::task::spawn_blocking(move || -> Result<TempPath> {
            let mut file = tempfile::Builder::new()
                .prefix(UPLOAD_FILE_PREFIX)
                .suffix(&suffix)
                .tempfile_in(&dir)?;
            file.write_all(&data)?;
            file.flush()?;
            Ok(file.into_temp_path())
        })
        .await
        .map_err(|e| Error::Internal {
            message: format!("staging task failed: {e}"),
        })??;

        debug!("Staged upload at {}", path.display());
        Ok(Self { path: Some(path) })
    }

    /// Location of the staged file.
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for StagedAudio {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        let display_path: PathBuf = path.to_path_buf();
        match path.close() {
            Ok(()) => debug!("Removed staged upload {}", display_path.display()),
            Err(e) => warn!("Failed to remove staged upload {}: {e}", display_path.display()),
        }
    }
}

fn upload_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map_or_else(
            || DEFAULT_UPLOAD_EXTENSION.to_string(),
            str::to_ascii_lowercase,
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_extension() {
        assert_eq!(upload_extension(Some("recording.MP3")), "mp3");
        assert_eq!(upload_extension(Some("clip.flac")), "flac");
        assert_eq!(upload_extension(Some("blob")), "wav");
        assert_eq!(upload_extension(Some("../../etc/passwd")), "wav");
        assert_eq!(upload_extension(Some("x.a b")), "wav");
        assert_eq!(upload_extension(None), "wav");
    }

    #[tokio::test]
    async fn test_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedAudio::write(Some(dir.path()), Some("clip.webm"), b"audio".to_vec())
            .await
            .unwrap();

        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"audio");
        assert_eq!(path.extension().unwrap(), "webm");
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(UPLOAD_FILE_PREFIX)
        );

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = StagedAudio::write(Some(dir.path()), None, Vec::new()).await.unwrap();
        let b = StagedAudio::write(Some(dir.path()), None, Vec::new()).await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_missing_dir_is_io_error() {
        let missing = Path::new("/nonexistent/uploads");
        let result = StagedAudio::write(Some(missing), None, Vec::new()).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
