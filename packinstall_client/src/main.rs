use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{ArgGroup, Parser};
use colored::Colorize;
use log::{error, info, warn};
use packinstall_core::{
    http::build_client,
    platform::{default_minecraft_dir, OperatingSystem},
    selector::{SelectAll, SelectNone},
    InstallerConfig, Modpack, OptionalFileSelector, PackVersion,
};
use progress::BarProgress;
use prompt::PromptSelector;

mod progress;
mod prompt;

/// Install a modpack into your Minecraft launcher!
#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("optional").args(["all_optional", "no_optional"])))]
struct Args {
    /// Modpack project id or slug
    modpack_id: String,

    /// Game version to install for, defaults to the newest one available
    #[arg(short, long)]
    game_version: Option<String>,

    /// Pack version to install, defaults to the featured one
    #[arg(short, long)]
    pack_version: Option<String>,

    /// Instance directory, defaults to a folder named after the pack in the game root
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Install every optional file without asking
    #[arg(long)]
    all_optional: bool,

    /// Skip every optional file without asking
    #[arg(long)]
    no_optional: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    pretty_env_logger::init();
    let args = Args::parse();

    info!(
        "{}",
        format!("Packinstall v{}", env!("CARGO_PKG_VERSION")).green()
    );

    if let Err(err) = run(args).await {
        error!("{} {:#}", "Error:".bright_red(), err);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config_path =
        std::env::var("PACKINSTALL_CONFIG").unwrap_or_else(|_| "packinstall.toml".to_string());
    let config = InstallerConfig::load(&config_path, minecraft_dir()?)?
        .with_installer("packinstall", env!("CARGO_PKG_VERSION"));
    info!(
        "Installing into {}",
        config.minecraft_dir.display().to_string().italic()
    );

    let client = build_client(&config)?;
    let modpack = Modpack::fetch(&client, &config, &args.modpack_id).await?;
    let version = pick_version(&modpack, &args)?;
    info!(
        "{}",
        format!(
            "{} {} for Minecraft {} ({})",
            modpack.meta().name,
            version.pack_version,
            version.game_version,
            version.loader
        )
        .italic()
    );

    let destination = match args.destination {
        Some(destination) => destination,
        None => config.minecraft_dir.join(&modpack.meta().id),
    };
    prepare_destination(&destination).await?;

    let progress = Arc::new(BarProgress::new());
    let selector: Arc<dyn OptionalFileSelector> = if args.all_optional {
        Arc::new(SelectAll)
    } else if args.no_optional {
        Arc::new(SelectNone)
    } else {
        Arc::new(PromptSelector::new(progress.bar()))
    };

    version
        .install(&config, client, &destination, progress, selector)
        .await?;

    info!(
        "{}",
        format!(
            "{} is ready! Pick the \"{} {}\" profile in your launcher.",
            modpack.meta().name,
            modpack.meta().name,
            version.game_version
        )
        .green()
    );
    Ok(())
}

fn minecraft_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("No home directory found!"))?;
    let appdata = dirs::config_dir();
    Ok(default_minecraft_dir(
        OperatingSystem::current(),
        &home,
        appdata.as_deref(),
    ))
}

fn pick_version<'a>(modpack: &'a Modpack, args: &Args) -> anyhow::Result<&'a PackVersion> {
    let game_version = match args.game_version.as_deref() {
        Some(game_version) => game_version,
        None => modpack
            .latest_game_version()
            .ok_or_else(|| anyhow::anyhow!("{} has no installable versions", modpack.meta().name))?,
    };
    let available = modpack.game_versions().collect::<Vec<_>>().join(", ");
    if modpack.versions(game_version).is_none() {
        anyhow::bail!(
            "{} is not available for Minecraft {} (available: {})",
            modpack.meta().name,
            game_version,
            available
        );
    }

    match args.pack_version.as_deref() {
        Some(pack_version) => modpack.get(game_version, pack_version).ok_or_else(|| {
            anyhow::anyhow!(
                "No version {} of {} for Minecraft {}",
                pack_version,
                modpack.meta().name,
                game_version
            )
        }),
        None => match modpack.featured_version(game_version) {
            Some(version) => Ok(version),
            None => {
                warn!("No featured version for {}, using the newest", game_version);
                modpack.newest_version(game_version).ok_or_else(|| {
                    anyhow::anyhow!("No versions for Minecraft {}", game_version)
                })
            }
        },
    }
}

async fn prepare_destination(destination: &Path) -> anyhow::Result<()> {
    match tokio::fs::metadata(destination).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => anyhow::bail!("{} exists and is not a directory", destination.display()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(destination).await?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
