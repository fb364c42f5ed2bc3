//! Filesystem artifact store.
//!
//! Artifacts are written as `<job_id>.<ext>` directly under a base
//! directory. Each write goes to its own temporary file in the same
//! directory and is renamed into place, so a reader never observes a
//! half-written artifact and overlapping deliveries of one job each
//! replace the file whole.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sepal_core::capability::{ArtifactStore, CapabilityError};
use sepal_core::types::{ArtifactRef, JobId};

#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    base_dir: PathBuf,
}

impl LocalArtifactStore {
    /// The directory is created on first write if it does not exist.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve a reference to a path inside the base directory.
    ///
    /// Only bare file names are accepted.
    fn resolve(&self, artifact: &ArtifactRef) -> Result<PathBuf, CapabilityError> {
        let name = artifact.as_str();
        let is_bare_name = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.starts_with('.');
        if !is_bare_name {
            return Err(CapabilityError::InvalidInput(format!(
                "Invalid artifact reference '{name}'"
            )));
        }
        Ok(self.base_dir.join(name))
    }
}

/// Write into a uniquely named temp file and rename it over `target`.
/// Temp names are dot-prefixed so `resolve` never hands one out; the file
/// is removed if anything fails before the rename.
fn write_atomically(dir: &Path, target: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".artifact-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

fn valid_extension(extension: &str) -> bool {
    !extension.is_empty() && extension.chars().all(|c| c.is_ascii_alphanumeric())
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn persist(
        &self,
        id: JobId,
        extension: &str,
        bytes: &[u8],
    ) -> Result<ArtifactRef, CapabilityError> {
        if !valid_extension(extension) {
            return Err(CapabilityError::InvalidInput(format!(
                "Invalid artifact extension '{extension}'"
            )));
        }

        tokio::fs::create_dir_all(&self.base_dir).await?;

        let reference = ArtifactRef::new(format!("{id}.{extension}"));
        let final_path = self.resolve(&reference)?;

        let dir = self.base_dir.clone();
        let target = final_path.clone();
        let contents = bytes.to_vec();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &contents))
            .await
            .map_err(std::io::Error::other)??;

        tracing::debug!(
            job_id = %id,
            path = %final_path.display(),
            size = bytes.len(),
            "Artifact written",
        );
        Ok(reference)
    }

    async fn load(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, CapabilityError> {
        let path = self.resolve(artifact)?;
        Ok(tokio::fs::read(path).await?)
    }
}
