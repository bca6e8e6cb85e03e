mod types;

pub use types::*;

use crate::{Error, Result, artifacts};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

/// Writes validated uploads into the private staging directory.
#[derive(Debug, Clone)]
pub struct UploadStager {
    dir: PathBuf,
}

impl UploadStager {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = artifacts::ensure_dir(dir.as_ref()).await?;
        info!("Staging directory ready: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists the upload as `<staging>/<run id>_<safe name>`.
    pub async fn stage(&self, run_id: Uuid, request: &UploadRequest) -> Result<StagedFile> {
        // Idempotent; the directory may have been removed since startup
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::stage_write(format!("{}: {}", self.dir.display(), e)))?;

        let path = self
            .dir
            .join(artifacts::namespaced(run_id, &request.safe_name));

        debug!(
            "Staging {} ({} bytes) at {}",
            request.file_name,
            request.file_bytes.len(),
            path.display()
        );

        write_file(&path, &request.file_bytes)
            .await
            .map_err(|e| Error::stage_write(format!("{}: {}", path.display(), e)))?;

        info!("File staged successfully. Path: {}", path.display());

        Ok(StagedFile {
            absolute_path: path,
            original_name: request.file_name.clone(),
        })
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}
