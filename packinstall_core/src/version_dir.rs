use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{loader::ClientDescriptor, Result};

/// Writes `{versions}/{id}/{id}.json` and its placeholder `{id}.jar`.
///
/// The directory is always rebuilt from scratch; nothing from a previous
/// install of the same id survives.
pub struct VersionDirWriter {
    versions_root: PathBuf,
}

impl VersionDirWriter {
    pub fn new<P: Into<PathBuf>>(versions_root: P) -> Self {
        VersionDirWriter {
            versions_root: versions_root.into(),
        }
    }

    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.versions_root.join(version_id)
    }

    pub async fn write(&self, version_id: &str, descriptor: &ClientDescriptor) -> Result<()> {
        self.recreate(version_id).await?;
        self.write_descriptor(version_id, descriptor).await?;
        self.write_placeholder(version_id).await
    }

    pub async fn recreate(&self, version_id: &str) -> Result<PathBuf> {
        let dir = self.version_dir(version_id);
        remove_dir_all_if_exists(&dir).await?;
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    pub async fn write_descriptor(
        &self,
        version_id: &str,
        descriptor: &ClientDescriptor,
    ) -> Result<()> {
        let path = self
            .version_dir(version_id)
            .join(format!("{}.json", version_id));
        let data = serde_json::to_vec_pretty(descriptor).map_err(std::io::Error::from)?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    /// The launcher swaps in the real client jar on first run; it only has to exist.
    pub async fn write_placeholder(&self, version_id: &str) -> Result<()> {
        let path = self
            .version_dir(version_id)
            .join(format!("{}.jar", version_id));
        tokio::fs::File::create(path).await?;
        Ok(())
    }
}

pub(crate) async fn remove_dir_all_if_exists(dir: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}
