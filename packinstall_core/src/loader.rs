use std::{path::Path, str::FromStr};

use reqwest::Client;
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{InstallError, Result};

/// Supported mod loaders.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Fabric,
    Quilt,
}

impl Loader {
    /// Root of the meta API serving loader profile descriptors.
    pub fn api_root(&self) -> &'static str {
        match self {
            Self::Fabric => "https://meta.fabricmc.net/v2",
            Self::Quilt => "https://meta.quiltmc.org/v3",
        }
    }

    /// Key pinning this loader's version in a pack manifest's dependencies.
    pub fn dependency_name(&self) -> &'static str {
        match self {
            Self::Fabric => "fabric-loader",
            Self::Quilt => "quilt-loader",
        }
    }

    /// System property (and value suffix) the loader reads extra mod paths from.
    pub fn add_mods(&self, loader_version: &Version) -> (&'static str, &'static str) {
        match self {
            Self::Fabric => ("fabric.addMods", ""),
            // Directory globs are only understood from 0.18 on.
            Self::Quilt if *loader_version >= Version::new(0, 18, 0) => ("loader.addMods", "/*"),
            Self::Quilt => ("loader.addMods", ""),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fabric => "fabric",
            Self::Quilt => "quilt",
        }
    }
}

impl std::fmt::Display for Loader {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.as_str())
    }
}

impl FromStr for Loader {
    type Err = InstallError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "fabric" => Ok(Self::Fabric),
            "quilt" => Ok(Self::Quilt),
            _ => Err(InstallError::UnknownLoader(value.to_string())),
        }
    }
}

/// Forces a Java runtime on descriptors of packs at or above `from_pack_version`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JavaRuntimePolicy {
    pub from_pack_version: String,
    pub component: String,
    pub major_version: u32,
}

impl JavaRuntimePolicy {
    pub fn applies_to(&self, pack_version: &str) -> bool {
        match (
            lenient_version(pack_version),
            lenient_version(&self.from_pack_version),
        ) {
            (Some(pack), Some(threshold)) => pack >= threshold,
            _ => false,
        }
    }
}

/// Client descriptor served by a loader's meta API.
///
/// Only the fields the installer touches are typed; everything else is kept
/// verbatim in `extra`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClientDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_version: Option<JavaVersion>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Arguments {
    #[serde(default)]
    pub jvm: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersion {
    pub component: String,
    pub major_version: u32,
}

pub async fn fetch_descriptor(
    client: &Client,
    api_root: &str,
    game_version: &str,
    loader_version: &str,
) -> Result<ClientDescriptor> {
    let url = format!(
        "{}/versions/loader/{}/{}/profile/json",
        api_root.trim_end_matches('/'),
        game_version,
        loader_version
    );
    let fetch_failed = |source| InstallError::LoaderFetchFailed {
        url: url.clone(),
        source,
    };
    client
        .get(&url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(fetch_failed)?
        .json()
        .await
        .map_err(fetch_failed)
}

/// Retargets a fetched descriptor at `version_id` and points the loader at `mods_dir`.
pub fn patch_descriptor(
    descriptor: &mut ClientDescriptor,
    version_id: &str,
    loader: Loader,
    loader_version: &str,
    mods_dir: &Path,
    pack_version: &str,
    java_policy: Option<&JavaRuntimePolicy>,
) -> Result<()> {
    let parsed = lenient_version(loader_version)
        .ok_or_else(|| InstallError::InvalidVersionNumber(loader_version.to_string()))?;

    descriptor.id = version_id.to_string();
    let (prefix, suffix) = loader.add_mods(&parsed);
    descriptor
        .arguments
        .get_or_insert_with(Arguments::default)
        .jvm
        .push(Value::String(format!(
            "-D{}={}{}",
            prefix,
            mods_dir.display(),
            suffix
        )));

    if let Some(policy) = java_policy.filter(|policy| policy.applies_to(pack_version)) {
        descriptor.java_version = Some(JavaVersion {
            component: policy.component.clone(),
            major_version: policy.major_version,
        });
    }
    Ok(())
}

/// Parses `raw` as semver, falling back to its leading numeric `x[.y[.z]]` part.
pub(crate) fn lenient_version(raw: &str) -> Option<Version> {
    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }
    let core = raw.split(['-', '+']).next()?;
    let mut parts = core.split('.').map(str::parse::<u64>);
    let major = parts.next()?.ok()?;
    let minor = parts.next().unwrap_or(Ok(0)).ok()?;
    let patch = parts.next().unwrap_or(Ok(0)).ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Version::new(major, minor, patch))
}
