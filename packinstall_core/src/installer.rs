use std::{
    collections::HashSet,
    ffi::OsStr,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use futures_util::{stream, StreamExt, TryStreamExt};
use log::info;
use reqwest::Client;

use crate::{
    archive::PackArchive,
    download::Downloader,
    loader::{fetch_descriptor, patch_descriptor, ClientDescriptor},
    manifest::{ManifestFile, PackManifest},
    profiles::{patch_store, ProfilePatch, ProfileStore},
    selector::optional_candidates,
    stage::Stage,
    version_dir::{remove_dir_all_if_exists, VersionDirWriter},
    ClientEnv, InstallError, InstallerConfig, OptionalFileSelector, PackVersion, ProgressHandler,
    Result,
};

const MODS_PREFIX: &str = "mods/";

/// Where an install stands. Stages only move forward; any failing step
/// ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Idle,
    PackDownloaded,
    LoaderInstalled,
    PackInstalled,
    Done,
    Failed,
}

/// Installs one pack version into a game directory.
///
/// The downloaded pack archive only ever lives in memory. It is released by
/// [`PackInstaller::close`] or on drop, whichever comes first.
///
/// A failed install is not rolled back; every step overwrites rather than
/// appends, so rerunning the install from scratch is always safe.
pub struct PackInstaller {
    ctx: InstallContext,
    stage: Stage,
    archive: Option<PackArchive>,
    state: InstallStage,
}

struct InstallContext {
    version: PackVersion,
    config: InstallerConfig,
    client: Client,
    downloader: Downloader,
    destination: PathBuf,
    mods_dir: PathBuf,
    progress: Arc<dyn ProgressHandler>,
    selector: Arc<dyn OptionalFileSelector>,
}

impl PackInstaller {
    pub fn new(
        version: PackVersion,
        config: InstallerConfig,
        client: Client,
        destination: PathBuf,
        progress: Arc<dyn ProgressHandler>,
        selector: Arc<dyn OptionalFileSelector>,
    ) -> Self {
        let mods_dir = config.minecraft_dir.join(version.launcher_folder_path());
        PackInstaller {
            ctx: InstallContext {
                version,
                config,
                downloader: Downloader::new(client.clone()),
                client,
                destination,
                mods_dir,
                progress,
                selector,
            },
            stage: Stage::new(),
            archive: None,
            state: InstallStage::Idle,
        }
    }

    pub fn state(&self) -> InstallStage {
        self.state
    }

    pub fn mods_dir(&self) -> &Path {
        &self.ctx.mods_dir
    }

    pub async fn install(&mut self) -> Result<()> {
        let result = self.run().await;
        if result.is_err() {
            self.state = InstallStage::Failed;
        }
        result
    }

    async fn run(&mut self) -> Result<()> {
        let (archive, manifest) = self.ctx.download_pack(&mut self.stage).await?;
        let archive = self.archive.insert(archive);
        self.state = InstallStage::PackDownloaded;

        self.ctx.install_loader(&manifest).await?;
        self.state = InstallStage::LoaderInstalled;

        self.ctx.install_pack(&manifest, archive).await?;
        self.state = InstallStage::PackInstalled;

        self.ctx.progress.done();
        self.state = InstallStage::Done;
        Ok(())
    }

    /// Drops the open archive and everything staged in memory.
    pub fn close(&mut self) {
        self.archive = None;
        self.stage.clear();
    }
}

impl Drop for PackInstaller {
    fn drop(&mut self) {
        self.close();
    }
}

impl InstallContext {
    async fn download_pack(&self, stage: &mut Stage) -> Result<(PackArchive, PackManifest)> {
        info!("Downloading {}", self.version.launcher_version_id());
        self.progress.new_task_set(3);

        self.progress.new_task("Downloading pack");
        let file = self.version.pack_file()?;
        let data = self
            .downloader
            .download_to_memory(&file.hashes.sha512, &file.url, &file.filename)
            .await?;
        let data = stage.put(&file.filename, data);

        self.progress.new_task("Opening pack");
        let mut archive = PackArchive::open(data)?;

        self.progress.new_task("Reading index");
        let manifest = archive.read_manifest()?;
        if manifest.game_version() != self.version.game_version {
            return Err(InstallError::GameVersionMismatch {
                expected: self.version.game_version.clone(),
                found: manifest.game_version().to_string(),
            });
        }
        Ok((archive, manifest))
    }

    async fn install_loader(&self, manifest: &PackManifest) -> Result<()> {
        info!("Installing loader for {}", self.version.game_version);
        self.progress.new_task_set(8);

        let loader = self.version.loader;
        let loader_version = manifest.loader_version(loader)?;
        info!("Using {} {}", loader.dependency_name(), loader_version);

        self.progress.new_task("Downloading client json");
        let mut descriptor = fetch_descriptor(
            &self.client,
            self.config.loader_api_root(loader),
            &self.version.game_version,
            loader_version,
        )
        .await?;

        self.progress.new_task("Patching client json");
        patch_descriptor(
            &mut descriptor,
            &self.version.launcher_version_id(),
            loader,
            loader_version,
            &self.mods_dir,
            &self.version.pack_version,
            self.config.java_policy.as_ref(),
        )?;

        self.write_version_dir(&descriptor).await?;
        self.update_launcher_profiles().await
    }

    async fn write_version_dir(&self, descriptor: &ClientDescriptor) -> Result<()> {
        let version_id = self.version.launcher_version_id();
        let writer = VersionDirWriter::new(self.config.versions_dir());

        self.progress.new_task("Creating version folder");
        writer.recreate(&version_id).await?;

        self.progress.new_task("Writing client json");
        writer.write_descriptor(&version_id, descriptor).await?;

        self.progress.new_task("Writing placeholder client jar");
        writer.write_placeholder(&version_id).await
    }

    async fn update_launcher_profiles(&self) -> Result<()> {
        let store = ProfileStore::new(self.config.launcher_profiles_path());

        self.progress.new_task("Reading launcher profiles");
        let mut profiles = store.read().await?;

        self.progress.new_task("Patching launcher profiles");
        let modpack = self.version.modpack();
        let mut patch = ProfilePatch::new(
            format!("{} {}", modpack.name, self.version.game_version),
            self.version.launcher_version_id(),
        );
        patch.icon = modpack.icon.clone();
        if self.destination != self.config.minecraft_dir {
            patch.game_dir = Some(self.destination.to_string_lossy().into_owned());
        }
        patch_store(&mut profiles, &self.version.launcher_profile_id(), &patch);

        self.progress.new_task("Writing launcher profiles");
        store.write(&profiles).await
    }

    async fn install_pack(&self, manifest: &PackManifest, archive: &mut PackArchive) -> Result<()> {
        info!("Installing pack files into {}", self.destination.display());
        self.progress.prepare_new_task_set("Downloading mods");
        remove_dir_all_if_exists(&self.mods_dir).await?;
        create_dir_tolerant(&self.mods_dir).await?;

        let selected = self.select_optional(manifest).await?;
        // Destinations are resolved up front so an escaping path fails the
        // install before anything is fetched.
        let jobs = manifest
            .files
            .iter()
            .filter(|file| match file.client_env() {
                ClientEnv::Required => true,
                ClientEnv::Optional => selected.contains(&file.path),
                ClientEnv::Unsupported => false,
            })
            .map(|file| {
                self.resolve_destination(&file.path)
                    .map(|dest| (file, dest))
            })
            .collect::<Result<Vec<_>>>()?;

        let jobs_len = jobs.len();
        self.progress.new_task_set(jobs_len);
        stream::iter(jobs)
            .map(|(file, dest)| self.download_file(file, dest))
            .buffer_unordered(self.config.download_concurrency.max(1))
            .try_collect::<Vec<()>>()
            .await?;

        self.extract_overrides(archive).await?;
        info!("Installed {} files", jobs_len);
        Ok(())
    }

    /// Selectors may block on user input, so they run on the blocking pool.
    async fn select_optional(&self, manifest: &PackManifest) -> Result<HashSet<String>> {
        let candidates =
            optional_candidates(&self.client, &self.config.modrinth_api, &manifest.files).await;
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }
        let selector = self.selector.clone();
        tokio::task::spawn_blocking(move || selector.select(&candidates))
            .await
            .map_err(|err| std::io::Error::new(ErrorKind::Other, err).into())
    }

    async fn download_file(&self, file: &ManifestFile, dest: PathBuf) -> Result<()> {
        self.progress.new_task(&format!("Downloading {}", file.path));
        if let Some(parent) = dest.parent() {
            create_dir_tolerant(parent).await?;
        }
        self.downloader
            .download(&file.hashes.sha512, file.primary_download()?, &dest)
            .await
    }

    async fn extract_overrides(&self, archive: &mut PackArchive) -> Result<()> {
        self.progress.prepare_new_task_set("Extracting overrides");
        let overrides = archive.overrides();

        self.progress.new_task_set(overrides.len());
        for relative in overrides {
            self.progress.new_task(&format!("Extracting {}", relative));
            let dest = self.resolve_destination(&relative)?;
            let data = archive.read_override(&relative)?;
            if let Some(parent) = dest.parent() {
                create_dir_tolerant(parent).await?;
            }
            tokio::fs::write(&dest, data).await?;
        }
        Ok(())
    }

    /// `mods/` paths land in the mods directory with the prefix stripped,
    /// everything else under the destination.
    fn resolve_destination(&self, path: &str) -> Result<PathBuf> {
        let (root, relative) = match path.strip_prefix(MODS_PREFIX) {
            Some(relative) => (&self.mods_dir, relative),
            None => (&self.destination, path),
        };
        contained_join(root, relative).ok_or_else(|| InstallError::PathEscape(path.to_string()))
    }
}

/// Joins `relative` onto `root`, or `None` if it would leave `root` once
/// `.` and `..` are folded away lexically.
fn contained_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut parts: Vec<&OsStr> = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    let mut joined = root.to_path_buf();
    joined.extend(parts);
    Some(joined)
}

/// `create_dir_all` that tolerates losing a creation race to another writer.
async fn create_dir_tolerant(dir: &Path) -> std::io::Result<()> {
    match tokio::fs::create_dir_all(dir).await {
        Err(err) if err.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        result => result,
    }
}
