use std::{
    io::{Cursor, Read},
    sync::Arc,
};

use zip::{result::ZipError, ZipArchive};

use crate::{
    manifest::{PackManifest, MANIFEST_NAME},
    InstallError, Result,
};

pub const OVERRIDES_PREFIX: &str = "overrides/";

/// Random path-based access into a pack archive held in memory.
///
/// The archive shares the staged bytes rather than owning the stage, so it can
/// be dropped before or after the stage it was opened from.
pub struct PackArchive {
    zip: ZipArchive<Cursor<Arc<[u8]>>>,
}

impl PackArchive {
    pub fn open(data: Arc<[u8]>) -> Result<Self> {
        let zip = ZipArchive::new(Cursor::new(data))?;
        Ok(PackArchive { zip })
    }

    pub fn read_manifest(&mut self) -> Result<PackManifest> {
        let entry = match self.zip.by_name(MANIFEST_NAME) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(InstallError::ManifestMissing(MANIFEST_NAME.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_reader(entry).map_err(InstallError::ManifestMalformed)
    }

    /// Paths of every file under `overrides/`, relative to that directory.
    pub fn overrides(&self) -> Vec<String> {
        let mut overrides: Vec<String> = self
            .zip
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .filter_map(|name| name.strip_prefix(OVERRIDES_PREFIX))
            .filter(|relative| !relative.is_empty())
            .map(str::to_string)
            .collect();
        overrides.sort();
        overrides
    }

    pub fn read_override(&mut self, relative: &str) -> Result<Vec<u8>> {
        self.read(&format!("{}{}", OVERRIDES_PREFIX, relative))
    }

    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut entry = self.zip.by_name(name)?;
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        Ok(data)
    }
}
