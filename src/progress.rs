use std::sync::Arc;

/// Events emitted while registering and updating podcasts
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A podcast's feed is being fetched
    FetchingFeed { podcast_name: String, url: String },

    /// The feed snapshot was stored and compared against the local store
    FeedDiffed {
        podcast_name: String,
        total_episodes: usize,
        new_episodes: usize,
    },

    /// New episodes awaiting approval for one podcast
    PendingEpisodes {
        podcast_name: String,
        titles: Vec<String>,
    },

    /// No podcast in the batch has anything new
    NothingToDo,

    /// The batch download was not approved
    Declined,

    /// A download is starting
    DownloadStarting {
        podcast_name: String,
        episode_title: String,
        /// Index of this episode in the whole batch
        episode_index: usize,
        /// Total number of episodes in the batch
        total_to_download: usize,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Download progress update
    DownloadProgress {
        episode_title: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// A download completed successfully
    DownloadCompleted {
        episode_title: String,
        bytes_downloaded: u64,
    },

    /// A download failed, the batch stops here
    DownloadFailed { episode_title: String, error: String },

    /// Every approved download finished
    UpdateCompleted {
        downloaded_count: usize,
        bytes_downloaded: u64,
    },
}

/// Trait for reporting progress events during an update.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}
