use std::{
    collections::HashMap,
    env::var,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{loader::JavaRuntimePolicy, modpack::VersionScheme, Loader, Result};

pub const DEFAULT_MODRINTH_API: &str = "https://api.modrinth.com/v2";
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 4;

/// On-disk shape of `packinstall.toml`. Every key is optional.
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct InstallerConfigFile {
    pub minecraft_dir: Option<String>,
    pub modrinth_api: Option<String>,
    pub download_concurrency: Option<usize>,
    pub version_scheme: Option<VersionScheme>,
    pub java_policy: Option<JavaRuntimePolicy>,
    #[serde(default)]
    pub loader_mirrors: HashMap<Loader, String>,
}

#[derive(Clone, Debug)]
pub struct InstallerConfig {
    /// Game root, the directory holding `versions/` and `launcher_profiles.json`.
    pub minecraft_dir: PathBuf,
    pub installer_name: String,
    pub installer_version: String,
    pub modrinth_api: String,
    pub download_concurrency: usize,
    pub version_scheme: VersionScheme,
    pub java_policy: Option<JavaRuntimePolicy>,
    /// Meta API roots replacing [`Loader::api_root`].
    pub loader_mirrors: HashMap<Loader, String>,
}

impl InstallerConfig {
    pub fn new<P: Into<PathBuf>>(minecraft_dir: P) -> Self {
        InstallerConfig {
            minecraft_dir: minecraft_dir.into(),
            installer_name: "packinstall".to_string(),
            installer_version: env!("CARGO_PKG_VERSION").to_string(),
            modrinth_api: DEFAULT_MODRINTH_API.to_string(),
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
            version_scheme: VersionScheme::default(),
            java_policy: None,
            loader_mirrors: HashMap::new(),
        }
    }

    /// Reads the config file at `path` (a missing file is not an error) and
    /// applies `PACKINSTALL_*` environment overrides on top.
    pub fn load<P: AsRef<Path>>(path: P, default_minecraft_dir: PathBuf) -> Result<Self> {
        let file = match std::fs::read_to_string(path.as_ref()) {
            Ok(text) => Some(toml::from_str::<InstallerConfigFile>(&text)?),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };
        Ok(Self::resolve(default_minecraft_dir, file, |key| var(key).ok()))
    }

    pub fn resolve<F>(
        default_minecraft_dir: PathBuf,
        file: Option<InstallerConfigFile>,
        env: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file.unwrap_or_default();
        let minecraft_dir = env("PACKINSTALL_MINECRAFT_DIR")
            .or(file.minecraft_dir)
            .map(PathBuf::from)
            .unwrap_or(default_minecraft_dir);

        let mut config = InstallerConfig::new(minecraft_dir);
        if let Some(api) = env("PACKINSTALL_MODRINTH_API").or(file.modrinth_api) {
            config.modrinth_api = api.trim_end_matches('/').to_string();
        }
        if let Some(concurrency) = file.download_concurrency {
            config.download_concurrency = concurrency.max(1);
        }
        if let Some(scheme) = file.version_scheme {
            config.version_scheme = scheme;
        }
        config.java_policy = file.java_policy;
        config.loader_mirrors = file.loader_mirrors;
        config
    }

    pub fn with_installer<N: Into<String>, V: Into<String>>(mut self, name: N, version: V) -> Self {
        self.installer_name = name.into();
        self.installer_version = version.into();
        self
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.minecraft_dir.join("versions")
    }

    pub fn launcher_profiles_path(&self) -> PathBuf {
        self.minecraft_dir.join("launcher_profiles.json")
    }

    pub fn loader_api_root(&self, loader: Loader) -> &str {
        self.loader_mirrors
            .get(&loader)
            .map(String::as_str)
            .unwrap_or(loader.api_root())
    }

    pub fn user_agent(&self) -> String {
        format!("{}/{}", self.installer_name, self.installer_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_file() {
        let file: InstallerConfigFile = toml::from_str(
            r#"
            minecraft_dir = "/from/file"
            modrinth_api = "https://file.example/v2/"
            download_concurrency = 0
            version_scheme = "game-versions"

            [java_policy]
            from_pack_version = "1.15.9"
            component = "java-runtime-gamma"
            major_version = 17

            [loader_mirrors]
            fabric = "https://mirror.example/fabric-meta/v2"
            "#,
        )
        .unwrap();
        let config = InstallerConfig::resolve("/default".into(), Some(file), |key| {
            (key == "PACKINSTALL_MINECRAFT_DIR").then(|| "/from/env".to_string())
        });

        assert_eq!(config.minecraft_dir, PathBuf::from("/from/env"));
        assert_eq!(config.modrinth_api, "https://file.example/v2");
        assert_eq!(config.download_concurrency, 1);
        assert_eq!(config.version_scheme, VersionScheme::GameVersions);
        assert_eq!(config.java_policy.as_ref().unwrap().major_version, 17);
        assert_eq!(config.versions_dir(), PathBuf::from("/from/env/versions"));
        assert_eq!(
            config.loader_api_root(Loader::Fabric),
            "https://mirror.example/fabric-meta/v2"
        );
        assert_eq!(config.loader_api_root(Loader::Quilt), Loader::Quilt.api_root());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            InstallerConfig::load(dir.path().join("packinstall.toml"), "/default".into()).unwrap();
        assert_eq!(config.modrinth_api, DEFAULT_MODRINTH_API);
        assert_eq!(config.download_concurrency, DEFAULT_DOWNLOAD_CONCURRENCY);
        assert!(config.java_policy.is_none());
    }

    #[test]
    fn user_agent_embeds_version() {
        let config = InstallerConfig::new("/mc").with_installer("installer", "9.9.9");
        assert_eq!(config.user_agent(), "installer/9.9.9");
    }
}
