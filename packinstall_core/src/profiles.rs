//! Read-modify-write access to the launcher's `launcher_profiles.json`.
//!
//! There is no locking: two installs patching the same store concurrently
//! race, and the last writer wins.

use std::{collections::BTreeMap, path::PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{InstallError, Result};

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct LauncherProfileStore {
    #[serde(default)]
    pub profiles: BTreeMap<String, LauncherProfile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LauncherProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_version_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub profile_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Values merged into a profile record.
#[derive(Debug, Clone)]
pub struct ProfilePatch {
    pub game_dir: Option<String>,
    pub icon: Option<String>,
    pub name: String,
    pub last_version_id: String,
    pub timestamp: String,
}

impl ProfilePatch {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, last_version_id: V) -> Self {
        ProfilePatch {
            game_dir: None,
            icon: None,
            name: name.into(),
            last_version_id: last_version_id.into(),
            timestamp: iso_now(),
        }
    }
}

impl LauncherProfile {
    /// Fills fields that are still unset. `lastUsed` and `lastVersionId` are
    /// always overwritten.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        self.created.get_or_insert_with(|| patch.timestamp.clone());
        if self.game_dir.is_none() {
            self.game_dir = patch.game_dir.clone();
        }
        if self.icon.is_none() {
            self.icon = patch.icon.clone();
        }
        self.last_used = Some(patch.timestamp.clone());
        self.name.get_or_insert_with(|| patch.name.clone());
        self.last_version_id = Some(patch.last_version_id.clone());
        self.profile_type
            .get_or_insert_with(|| "custom".to_string());
    }
}

pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        ProfileStore { path: path.into() }
    }

    pub async fn read(&self) -> Result<LauncherProfileStore> {
        let unreadable = |source: std::io::Error| InstallError::ProfileStoreUnreadable {
            path: self.path.clone(),
            source,
        };
        let data = tokio::fs::read(&self.path).await.map_err(unreadable)?;
        serde_json::from_slice(&data).map_err(|err| unreadable(err.into()))
    }

    pub async fn write(&self, store: &LauncherProfileStore) -> Result<()> {
        let unwritable = |source: std::io::Error| InstallError::ProfileStoreUnwritable {
            path: self.path.clone(),
            source,
        };
        let data = serde_json::to_vec_pretty(store).map_err(|err| unwritable(err.into()))?;
        tokio::fs::write(&self.path, data).await.map_err(unwritable)
    }

    /// Merges `patch` into `profiles[profile_id]`, creating the record if needed,
    /// and rewrites the whole document.
    pub async fn patch(&self, profile_id: &str, patch: &ProfilePatch) -> Result<LauncherProfile> {
        let mut store = self.read().await?;
        let profile = patch_store(&mut store, profile_id, patch);
        self.write(&store).await?;
        Ok(profile)
    }
}

pub fn patch_store(
    store: &mut LauncherProfileStore,
    profile_id: &str,
    patch: &ProfilePatch,
) -> LauncherProfile {
    let profile = store.profiles.entry(profile_id.to_string()).or_default();
    profile.apply(patch);
    profile.clone()
}

pub fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE: &str = r#"{
        "profiles": {
            "other": { "name": "Other", "type": "latest-release", "lastVersionId": "latest-release" }
        },
        "settings": { "enableSnapshots": false },
        "version": 3
    }"#;

    fn patch(timestamp: &str) -> ProfilePatch {
        ProfilePatch {
            game_dir: Some("/games/pack".to_string()),
            icon: Some("data:image/png;base64,AA==".to_string()),
            name: "Pack 1.20.1".to_string(),
            last_version_id: "pack-1.2.0-1.20.1".to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    #[tokio::test]
    async fn patching_twice_only_refreshes_usage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launcher_profiles.json");
        std::fs::write(&path, STORE).unwrap();
        let store = ProfileStore::new(&path);

        let first = store
            .patch("pack-1.20.1", &patch("2024-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        let mut second_patch = patch("2024-02-02T00:00:00.000Z");
        second_patch.name = "Renamed".to_string();
        second_patch.last_version_id = "pack-1.3.0-1.20.1".to_string();
        let second = store.patch("pack-1.20.1", &second_patch).await.unwrap();

        assert_eq!(second.created.as_deref(), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(second.last_used.as_deref(), Some("2024-02-02T00:00:00.000Z"));
        assert_eq!(second.last_version_id.as_deref(), Some("pack-1.3.0-1.20.1"));
        assert_eq!(second.name, first.name);
        assert_eq!(second.icon, first.icon);
        assert_eq!(second.profile_type.as_deref(), Some("custom"));
        assert_eq!(second.game_dir.as_deref(), Some("/games/pack"));

        let json: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["settings"]["enableSnapshots"], false);
        assert_eq!(json["profiles"]["other"]["type"], "latest-release");
        assert_eq!(json["profiles"]["pack-1.20.1"]["lastVersionId"], "pack-1.3.0-1.20.1");
    }

    #[test]
    fn missing_profiles_key_is_created() {
        let mut store: LauncherProfileStore = serde_json::from_str("{}").unwrap();
        let mut patch = patch("2024-01-01T00:00:00.000Z");
        patch.game_dir = None;
        let profile = patch_store(&mut store, "pack-1.20.1", &patch);

        assert!(profile.game_dir.is_none());
        assert_eq!(store.profiles.len(), 1);
        let json = serde_json::to_value(&store).unwrap();
        assert!(json["profiles"]["pack-1.20.1"].get("gameDir").is_none());
    }

    #[tokio::test]
    async fn unreadable_store() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ProfileStore::new(dir.path().join("launcher_profiles.json"));
        assert!(matches!(
            missing.read().await,
            Err(InstallError::ProfileStoreUnreadable { .. })
        ));

        std::fs::write(dir.path().join("launcher_profiles.json"), b"{ not json").unwrap();
        assert!(matches!(
            missing.read().await,
            Err(InstallError::ProfileStoreUnreadable { .. })
        ));
    }
}
