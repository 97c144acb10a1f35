use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification shared by every error in the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network, transport or non-success HTTP response
    Fetch,
    /// Filesystem create, list or write failure
    Storage,
    /// Malformed feed document
    Parse,
    /// Feed snapshot archive without any entry
    EmptyArchive,
    /// Malformed episode media URL
    InvalidUrl,
    NotFound,
    AlreadyExists,
    ReservedName,
}

/// Errors that can occur when touching a podcast's local store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open file {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    CreateFileFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to access feed snapshot {path}: {source}")]
    SnapshotFailed {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}

/// Errors that can occur when fetching, caching or parsing feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for feed {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Stream error while fetching feed {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),

    #[error("Feed contains an item without a title")]
    MissingTitle,

    #[error("Episode '{title}' has no enclosure (media file)")]
    MissingEnclosure { title: String },

    #[error("Feed snapshot {0} contains no entries")]
    EmptyArchive(PathBuf),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl FeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FetchFailed { .. } | Self::HttpStatus { .. } | Self::StreamFailed { .. } => {
                ErrorKind::Fetch
            }
            Self::ParseFailed(_) | Self::MissingTitle | Self::MissingEnclosure { .. } => {
                ErrorKind::Parse
            }
            Self::EmptyArchive(_) => ErrorKind::EmptyArchive,
            Self::Storage(e) => e.kind(),
        }
    }
}

/// Errors that can occur during episode downloads
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Invalid media URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::HttpFailed { .. } | Self::HttpStatus { .. } | Self::StreamFailed { .. } => {
                ErrorKind::Fetch
            }
            Self::FileCreateFailed { .. } | Self::FileWriteFailed { .. } => ErrorKind::Storage,
        }
    }
}

/// Errors that can occur when reading or changing the podcast registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("No podcast named '{0}' is managed")]
    NotFound(String),

    #[error("A podcast named '{0}' is already managed")]
    AlreadyExists(String),

    #[error("'{0}' is reserved and cannot be used as a podcast name")]
    ReservedName(String),

    #[error("Failed to read registry file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write registry file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse registry JSON in {path}: {source}")]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize registry: {0}")]
    JsonSerializeFailed(#[from] serde_json::Error),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::ReservedName(_) => ErrorKind::ReservedName,
            Self::ReadFailed { .. } | Self::WriteFailed { .. } => ErrorKind::Storage,
            Self::JsonParseFailed { .. } | Self::JsonSerializeFailed(_) => ErrorKind::Parse,
        }
    }
}

/// Top-level errors for registration and batch updates
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl UpdateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Feed(e) => e.kind(),
            Self::Storage(e) => e.kind(),
            Self::Download(e) => e.kind(),
            Self::Registry(e) => e.kind(),
        }
    }
}
