use std::{collections::BTreeMap, path::Path, sync::Arc};

use base64::Engine;
use log::{info, warn};
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};

use crate::{
    http::get_json, loader::lenient_version, InstallError, InstallerConfig, Loader,
    OptionalFileSelector, PackInstaller, ProgressHandler, Result,
};

/// How a version record encodes its game version and loader.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VersionScheme {
    /// Everything is packed into `version_number`, e.g. `1.2.0-quilt-1.20.1`
    /// or `1.2.0+1.20.1.quilt`.
    #[default]
    Embedded,
    /// `version_number` is the pack version alone, the game version is the
    /// first of `game_versions` and the loader is always Fabric.
    GameVersions,
}

/// A version record as served by the pack host.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VersionRecord {
    pub version_number: String,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub files: Vec<VersionFile>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VersionFile {
    #[serde(default)]
    pub primary: bool,
    pub filename: String,
    pub url: String,
    pub hashes: FileHashes,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileHashes {
    pub sha512: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ProjectRecord {
    title: String,
    #[serde(default)]
    icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModpackMeta {
    pub id: String,
    pub name: String,
    /// Launcher profile icon as a `data:` url.
    pub icon: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PackVersion {
    modpack: Arc<ModpackMeta>,
    pub pack_version: String,
    pub game_version: String,
    pub loader: Loader,
    pub record: VersionRecord,
}

impl PackVersion {
    pub fn parse(
        modpack: Arc<ModpackMeta>,
        record: VersionRecord,
        scheme: VersionScheme,
    ) -> Result<Self> {
        let (pack_version, game_version, loader) = match scheme {
            VersionScheme::Embedded => split_version_number(&record.version_number)?,
            VersionScheme::GameVersions => {
                let game_version = record
                    .game_versions
                    .first()
                    .filter(|version| !version.is_empty())
                    .ok_or_else(|| {
                        InstallError::InvalidVersionNumber(record.version_number.clone())
                    })?;
                (
                    record.version_number.clone(),
                    game_version.clone(),
                    Loader::Fabric,
                )
            }
        };
        Ok(PackVersion {
            modpack,
            pack_version,
            game_version,
            loader,
            record,
        })
    }

    pub fn modpack(&self) -> &ModpackMeta {
        &self.modpack
    }

    pub fn launcher_version_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.modpack.id, self.pack_version, self.game_version
        )
    }

    pub fn launcher_profile_id(&self) -> String {
        format!("{}-{}", self.modpack.id, self.game_version)
    }

    /// Mods directory of this version, relative to the game root.
    pub fn launcher_folder_path(&self) -> String {
        format!(
            "{}/{}-{}",
            self.modpack.id, self.pack_version, self.game_version
        )
    }

    /// The pack archive itself: the `primary` file, else the first one.
    pub fn pack_file(&self) -> Result<&VersionFile> {
        self.record
            .files
            .iter()
            .find(|file| file.primary)
            .or_else(|| self.record.files.first())
            .ok_or_else(|| InstallError::NoPackFile(self.record.version_number.clone()))
    }

    /// Runs a full install and releases the installer whatever the outcome.
    pub async fn install<P: AsRef<Path>>(
        &self,
        config: &InstallerConfig,
        client: Client,
        destination: P,
        progress: Arc<dyn ProgressHandler>,
        selector: Arc<dyn OptionalFileSelector>,
    ) -> Result<()> {
        let mut installer = PackInstaller::new(
            self.clone(),
            config.clone(),
            client,
            destination.as_ref().to_path_buf(),
            progress,
            selector,
        );
        let result = installer.install().await;
        installer.close();
        result
    }
}

/// Splits a `version_number` into (pack version, game version, loader).
///
/// Dash form: `{pack}-{game}` or `{pack}-{loader}-{game}`, loader defaulting
/// to Fabric. Plus form: `{pack}+{game}.{loader}`.
pub fn split_version_number(raw: &str) -> Result<(String, String, Loader)> {
    let invalid = || InstallError::InvalidVersionNumber(raw.to_string());
    let (pack, game, loader) = if raw.contains('-') && !raw.contains('+') {
        let (pack, rest) = raw.split_once('-').ok_or_else(invalid)?;
        match rest.rsplit_once('-') {
            Some((loader, game)) => (pack, game, loader),
            None => (pack, rest, Loader::Fabric.as_str()),
        }
    } else {
        let (pack, rest) = raw.split_once('+').ok_or_else(invalid)?;
        let (game, loader) = rest.rsplit_once('.').ok_or_else(invalid)?;
        (pack, game, loader)
    };
    if pack.is_empty() || game.is_empty() || loader.is_empty() {
        return Err(invalid());
    }
    Ok((pack.to_string(), game.to_string(), loader.parse()?))
}

/// A pack and its installable versions, grouped game version → pack version.
#[derive(Debug, Clone)]
pub struct Modpack {
    meta: Arc<ModpackMeta>,
    versions: BTreeMap<String, BTreeMap<String, PackVersion>>,
}

impl Modpack {
    pub fn from_records<I>(meta: ModpackMeta, records: I, scheme: VersionScheme) -> Self
    where
        I: IntoIterator<Item = VersionRecord>,
    {
        let meta = Arc::new(meta);
        let mut versions: BTreeMap<String, BTreeMap<String, PackVersion>> = BTreeMap::new();
        for record in records {
            let version_number = record.version_number.clone();
            match PackVersion::parse(meta.clone(), record, scheme) {
                Ok(version) => {
                    versions
                        .entry(version.game_version.clone())
                        .or_default()
                        .insert(version.pack_version.clone(), version);
                }
                Err(err) => warn!("Skipping version {}: {}", version_number, err),
            }
        }
        Modpack { meta, versions }
    }

    /// Loads a project and all of its versions from the pack host.
    ///
    /// `id` is kept as the modpack id as given, so a slug names the launcher
    /// version, profile and mods folder rather than the host's opaque id.
    pub async fn fetch(client: &Client, config: &InstallerConfig, id: &str) -> Result<Self> {
        let project: ProjectRecord =
            get_json(client, &format!("{}/project/{}", config.modrinth_api, id)).await?;
        let records: Vec<VersionRecord> = get_json(
            client,
            &format!("{}/project/{}/version", config.modrinth_api, id),
        )
        .await?;
        info!("Loaded {} versions of {}", records.len(), project.title);

        let icon = match project.icon_url.as_deref() {
            Some(url) => fetch_icon(client, url).await.unwrap_or_else(|err| {
                warn!("Could not load icon of {}: {}", project.title, err);
                None
            }),
            None => None,
        };
        let meta = ModpackMeta {
            id: id.to_string(),
            name: project.title,
            icon,
        };
        Ok(Self::from_records(meta, records, config.version_scheme))
    }

    pub fn meta(&self) -> &ModpackMeta {
        &self.meta
    }

    pub fn game_versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// Newest game version with at least one pack version.
    pub fn latest_game_version(&self) -> Option<&str> {
        self.versions
            .keys()
            .max_by_key(|version| lenient_version(version))
            .map(String::as_str)
    }

    pub fn versions(&self, game_version: &str) -> Option<&BTreeMap<String, PackVersion>> {
        self.versions.get(game_version)
    }

    pub fn get(&self, game_version: &str, pack_version: &str) -> Option<&PackVersion> {
        self.versions.get(game_version)?.get(pack_version)
    }

    pub fn featured_version(&self, game_version: &str) -> Option<&PackVersion> {
        self.versions
            .get(game_version)?
            .values()
            .find(|version| version.record.featured)
    }

    /// Highest pack version for `game_version`, by semver where it parses.
    pub fn newest_version(&self, game_version: &str) -> Option<&PackVersion> {
        self.versions
            .get(game_version)?
            .values()
            .max_by_key(|version| lenient_version(&version.pack_version))
    }
}

async fn fetch_icon(client: &Client, url: &str) -> reqwest::Result<Option<String>> {
    let response = client.get(url).send().await?.error_for_status()?;
    let mime = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .filter(|value| value.starts_with("image/"))
        .unwrap_or("image/png")
        .to_string();
    let data = response.bytes().await?;
    Ok(Some(format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(&data)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestServer;

    fn meta() -> Arc<ModpackMeta> {
        Arc::new(ModpackMeta {
            id: "pack".to_string(),
            name: "Pack".to_string(),
            icon: None,
        })
    }

    fn record(version_number: &str) -> VersionRecord {
        VersionRecord {
            version_number: version_number.to_string(),
            game_versions: vec!["1.20.1".to_string()],
            featured: false,
            files: Vec::new(),
        }
    }

    #[test]
    fn parses_embedded_version_numbers() {
        let parse = |raw| split_version_number(raw).unwrap();
        assert_eq!(
            parse("1.2.0-fabric-1.20.1"),
            ("1.2.0".to_string(), "1.20.1".to_string(), Loader::Fabric)
        );
        assert_eq!(
            parse("1.2.0-1.20.1"),
            ("1.2.0".to_string(), "1.20.1".to_string(), Loader::Fabric)
        );
        assert_eq!(
            parse("1.2.0+1.20.1.quilt"),
            ("1.2.0".to_string(), "1.20.1".to_string(), Loader::Quilt)
        );
        assert_eq!(
            parse("1.2.0-quilt-1.20.1"),
            ("1.2.0".to_string(), "1.20.1".to_string(), Loader::Quilt)
        );
    }

    #[test]
    fn rejects_malformed_version_numbers() {
        for raw in ["1.2.0", "1.2.0+1.20.1.", "-1.20.1", "1.2.0-", "1.2.0+.quilt"] {
            assert!(
                matches!(
                    split_version_number(raw),
                    Err(InstallError::InvalidVersionNumber(_))
                ),
                "{} should not parse",
                raw
            );
        }
        assert!(matches!(
            split_version_number("1.2.0-forge-1.20.1"),
            Err(InstallError::UnknownLoader(_))
        ));
    }

    #[test]
    fn derived_identifiers() {
        let version = PackVersion::parse(meta(), record("1.2.0-1.20.1"), VersionScheme::Embedded)
            .unwrap();
        assert_eq!(version.launcher_version_id(), "pack-1.2.0-1.20.1");
        assert_eq!(version.launcher_profile_id(), "pack-1.20.1");
        assert_eq!(version.launcher_folder_path(), "pack/1.2.0-1.20.1");
        assert!(matches!(version.pack_file(), Err(InstallError::NoPackFile(_))));
    }

    #[test]
    fn game_versions_scheme() {
        let version =
            PackVersion::parse(meta(), record("3.1.4"), VersionScheme::GameVersions).unwrap();
        assert_eq!(version.pack_version, "3.1.4");
        assert_eq!(version.game_version, "1.20.1");
        assert_eq!(version.loader, Loader::Fabric);
    }

    #[test]
    fn pack_file_prefers_primary() {
        let file = |name: &str, primary| VersionFile {
            primary,
            filename: name.to_string(),
            url: format!("https://cdn.example/{}", name),
            hashes: FileHashes {
                sha512: "00".to_string(),
                sha1: None,
            },
        };
        let mut record = record("1.0.0-1.20.1");
        record.files = vec![file("sources.zip", false), file("pack.mrpack", true)];
        let version = PackVersion::parse(meta(), record.clone(), VersionScheme::Embedded).unwrap();
        assert_eq!(version.pack_file().unwrap().filename, "pack.mrpack");

        record.files.iter_mut().for_each(|file| file.primary = false);
        let version = PackVersion::parse(meta(), record, VersionScheme::Embedded).unwrap();
        assert_eq!(version.pack_file().unwrap().filename, "sources.zip");
    }

    #[test]
    fn groups_versions_and_finds_featured() {
        let mut featured = record("1.1.0-1.20.1");
        featured.featured = true;
        let modpack = Modpack::from_records(
            (*meta()).clone(),
            vec![
                record("1.2.0-1.20.1"),
                featured,
                record("1.0.0-1.19.4"),
                record("not a version"),
            ],
            VersionScheme::Embedded,
        );

        assert_eq!(
            modpack.game_versions().collect::<Vec<_>>(),
            vec!["1.19.4", "1.20.1"]
        );
        assert_eq!(modpack.latest_game_version(), Some("1.20.1"));
        assert_eq!(modpack.versions("1.20.1").unwrap().len(), 2);
        assert_eq!(
            modpack.featured_version("1.20.1").unwrap().pack_version,
            "1.1.0"
        );
        assert!(modpack.featured_version("1.19.4").is_none());
        assert_eq!(
            modpack.newest_version("1.20.1").unwrap().pack_version,
            "1.2.0"
        );
        assert!(modpack.get("1.19.4", "1.0.0").is_some());
    }

    #[tokio::test]
    async fn fetches_project_with_icon() {
        let server = TestServer::start().await;
        let icon_url = server.insert("/icon.png", &b"\x89PNG"[..]);
        server.insert(
            "/v2/project/herobrine.fr-modpack",
            format!(
                r#"{{ "id": "AbCdEf", "title": "Example Pack", "icon_url": "{}" }}"#,
                icon_url
            ),
        );
        server.insert(
            "/v2/project/herobrine.fr-modpack/version",
            r#"[
                { "version_number": "1.2.0-1.20.1", "game_versions": ["1.20.1"], "featured": true, "files": [] },
                { "version_number": "1.3.0+1.20.1.quilt", "game_versions": ["1.20.1"], "featured": false, "files": [] }
            ]"#,
        );

        let mut config = InstallerConfig::new("/mc");
        config.modrinth_api = server.url("/v2");
        let modpack = Modpack::fetch(&Client::new(), &config, "herobrine.fr-modpack")
            .await
            .unwrap();

        assert_eq!(modpack.meta().id, "herobrine.fr-modpack");
        assert_eq!(modpack.meta().name, "Example Pack");
        assert!(modpack
            .meta()
            .icon
            .as_deref()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        let version = modpack.featured_version("1.20.1").unwrap();
        assert_eq!(version.modpack().name, "Example Pack");
        assert_eq!(version.loader, Loader::Fabric);
        assert_eq!(
            version.launcher_version_id(),
            "herobrine.fr-modpack-1.2.0-1.20.1"
        );
        assert_eq!(
            version.launcher_folder_path(),
            "herobrine.fr-modpack/1.2.0-1.20.1"
        );
    }

    #[tokio::test]
    async fn missing_icon_leaves_icon_unset() {
        let server = TestServer::start().await;
        server.insert(
            "/v2/project/pack",
            format!(
                r#"{{ "id": "AbCdEf", "title": "Example Pack", "icon_url": "{}" }}"#,
                server.url("/gone.png")
            ),
        );
        server.insert(
            "/v2/project/pack/version",
            r#"[{ "version_number": "1.2.0-1.20.1", "files": [] }]"#,
        );

        let mut config = InstallerConfig::new("/mc");
        config.modrinth_api = server.url("/v2");
        let modpack = Modpack::fetch(&Client::new(), &config, "pack").await.unwrap();

        assert!(modpack.meta().icon.is_none());
        assert!(modpack.get("1.20.1", "1.2.0").is_some());
    }
}
