use std::path::{Path, PathBuf};

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum OperatingSystem {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl OperatingSystem {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }
}

/// Where the official launcher keeps its game root on `os`.
///
/// `appdata` is only consulted on Windows; without it the home directory is
/// used in its place.
pub fn default_minecraft_dir(os: OperatingSystem, home: &Path, appdata: Option<&Path>) -> PathBuf {
    match os {
        OperatingSystem::Windows => appdata.unwrap_or(home).join(".minecraft"),
        OperatingSystem::MacOs => home
            .join("Library")
            .join("Application Support")
            .join("minecraft"),
        OperatingSystem::Linux | OperatingSystem::Other => home.join(".minecraft"),
    }
}
