use serde::{Deserialize, Serialize};

pub mod archive;
pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod installer;
pub mod loader;
pub mod manifest;
pub mod modpack;
pub mod platform;
pub mod profiles;
pub mod progress;
pub mod selector;
pub mod stage;
pub mod version_dir;

#[cfg(test)]
pub(crate) mod testing;

pub use config::InstallerConfig;
pub use error::{InstallError, Result};
pub use installer::{InstallStage, PackInstaller};
pub use loader::Loader;
pub use modpack::{Modpack, PackVersion};
pub use progress::ProgressHandler;
pub use selector::OptionalFileSelector;

pub trait StrConversion {
    fn from_str(value: &str) -> Self;
    fn as_str(&self) -> &'static str;
}

/// How a manifest file applies to the client side, from its `env.client` key.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub enum ClientEnv {
    Required,
    Optional,
    Unsupported,
}

impl std::fmt::Display for ClientEnv {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.as_str())
    }
}
impl StrConversion for ClientEnv {
    fn from_str(value: &str) -> Self {
        match value {
            "required" => Self::Required,
            "optional" => Self::Optional,
            _ => Self::Unsupported,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Optional => "optional",
            Self::Unsupported => "unsupported",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_client_env_is_unsupported() {
        assert_eq!(<ClientEnv as StrConversion>::from_str("optional"), ClientEnv::Optional);
        assert_eq!(<ClientEnv as StrConversion>::from_str("required"), ClientEnv::Required);
        assert_eq!(<ClientEnv as StrConversion>::from_str("unsupported"), ClientEnv::Unsupported);
        assert_eq!(<ClientEnv as StrConversion>::from_str("whatever"), ClientEnv::Unsupported);
    }
}
