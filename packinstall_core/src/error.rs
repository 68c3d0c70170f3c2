use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum InstallError {
    #[error("download of {url} failed: {source}")]
    DownloadFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("hash mismatch for {file}: expected {expected}, got {actual}")]
    HashMismatch {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("pack archive has no {0}")]
    ManifestMissing(String),
    #[error("pack manifest is malformed: {0}")]
    ManifestMalformed(#[source] serde_json::Error),
    #[error("pack archive is unreadable: {0}")]
    ArchiveUnreadable(#[from] zip::result::ZipError),
    #[error("game version mismatch: pack targets {found}, expected {expected}")]
    GameVersionMismatch { expected: String, found: String },
    #[error("pack manifest does not pin a {0} version")]
    MissingLoaderVersion(String),
    #[error("fetching loader profile from {url} failed: {source}")]
    LoaderFetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("path {0} escapes the install directory")]
    PathEscape(String),
    #[error("launcher profiles at {path:?} are unreadable: {source}")]
    ProfileStoreUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("launcher profiles at {path:?} are unwritable: {source}")]
    ProfileStoreUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid version number: {0}")]
    InvalidVersionNumber(String),
    #[error("unknown mod loader: {0}")]
    UnknownLoader(String),
    #[error("version {0} has no files")]
    NoPackFile(String),
    #[error("manifest file {0} has no download url")]
    MissingDownloadUrl(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = InstallError> = std::result::Result<T, E>;
