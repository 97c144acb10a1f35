pub mod confirm;
pub mod episode;
pub mod error;
pub mod feed;
pub mod http;
pub mod podcast;
pub mod progress;
pub mod registry;
pub mod state;
pub mod update;

// Re-export main types for convenience
pub use confirm::{AssumeYes, Confirm};
pub use episode::{DownloadContext, download_episode, episode_filename, strip_extension};
pub use error::{DownloadError, ErrorKind, FeedError, RegistryError, StorageError, UpdateError};
pub use feed::{
    Episode, PARTIAL_SNAPSHOT_FILENAME, SNAPSHOT_FILENAME, parse_feed, read_snapshot, refresh_feed,
};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use podcast::{Podcast, RESERVED_NAME};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use registry::{FileRegistry, Registry};
pub use state::{EpisodeDiff, create_diff, diff_podcast, scan_local_store};
pub use update::{UpdateSummary, add_podcast, resolve_targets, update_podcasts};
