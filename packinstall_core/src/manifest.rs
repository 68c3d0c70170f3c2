//! Types for the index file shipped inside a pack archive.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ClientEnv, InstallError, Loader, Result, StrConversion};

pub const MANIFEST_NAME: &str = "modrinth.index.json";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PackManifest {
    #[serde(default)]
    pub format_version: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version_id: Option<String>,
    pub dependencies: Dependencies,
    #[serde(default)]
    pub files: Vec<ManifestFile>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Dependencies {
    /// Game version the pack was built against.
    pub minecraft: String,
    /// Loader pins, keyed by dependency name (`fabric-loader`, `quilt-loader`, ...).
    #[serde(flatten)]
    pub loaders: HashMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
    pub path: String,
    pub hashes: Hashes,
    #[serde(default)]
    pub env: Option<FileEnv>,
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Hashes {
    pub sha512: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FileEnv {
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
}

impl PackManifest {
    pub fn game_version(&self) -> &str {
        &self.dependencies.minecraft
    }

    pub fn loader_version(&self, loader: Loader) -> Result<&str> {
        self.dependencies
            .loaders
            .get(loader.dependency_name())
            .map(String::as_str)
            .ok_or_else(|| InstallError::MissingLoaderVersion(loader.dependency_name().to_string()))
    }
}

impl ManifestFile {
    /// Files without an `env.client` key are always installed.
    pub fn client_env(&self) -> ClientEnv {
        match self.env.as_ref().and_then(|env| env.client.as_deref()) {
            Some(client) => <ClientEnv as StrConversion>::from_str(client),
            None => ClientEnv::Required,
        }
    }

    pub fn primary_download(&self) -> Result<&str> {
        self.downloads
            .first()
            .map(String::as_str)
            .ok_or_else(|| InstallError::MissingDownloadUrl(self.path.clone()))
    }

    /// Project id embedded in a CDN url such as
    /// `https://cdn.modrinth.com/data/{project}/versions/{version}/{file}`.
    pub fn project_id(&self) -> Option<&str> {
        self.downloads
            .first()
            .and_then(|url| url.split('/').nth(4))
            .filter(|id| !id.is_empty())
    }
}
