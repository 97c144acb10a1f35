use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::episode::strip_extension;
use crate::error::{StorageError, UpdateError};
use crate::feed::{Episode, PARTIAL_SNAPSHOT_FILENAME, SNAPSHOT_FILENAME, read_snapshot};
use crate::podcast::Podcast;

/// Difference between a feed and a local store
#[derive(Debug, Clone)]
pub struct EpisodeDiff {
    /// Episodes missing from the local store, in feed order
    pub to_download: Vec<Episode>,
    /// Episodes already present in the local store
    pub already_present: Vec<Episode>,
    /// Total number of episodes in the feed
    pub total_episodes: usize,
}

/// Scan a local store for the identities of already-downloaded episodes
///
/// Every entry except the feed snapshot (finished or partial) contributes its
/// name with the final extension removed. Subdirectories are not told apart from files.
pub fn scan_local_store(store: &Path) -> Result<HashSet<String>, StorageError> {
    let entries = std::fs::read_dir(store).map_err(|e| StorageError::ReadDirectoryFailed {
        path: store.to_path_buf(),
        source: e,
    })?;

    let mut stored = HashSet::new();

    for entry in entries {
        let entry = entry.map_err(|e| StorageError::ReadDirectoryFailed {
            path: store.to_path_buf(),
            source: e,
        })?;

        let filename = entry.file_name().to_string_lossy().into_owned();
        if filename == SNAPSHOT_FILENAME || filename == PARTIAL_SNAPSHOT_FILENAME {
            continue;
        }

        stored.insert(strip_extension(&filename).to_string());
    }

    Ok(stored)
}

/// Split feed episodes into those to download and those already stored
///
/// An episode counts as stored when its title equals one of the stored names.
pub fn create_diff(episodes: Vec<Episode>, stored: &HashSet<String>) -> EpisodeDiff {
    let total_episodes = episodes.len();
    let (already_present, to_download): (Vec<_>, Vec<_>) = episodes
        .into_iter()
        .partition(|episode| stored.contains(&episode.title));

    EpisodeDiff {
        to_download,
        already_present,
        total_episodes,
    }
}

/// Compare a podcast's cached feed snapshot against its local store
pub fn diff_podcast(podcast: &Podcast) -> Result<EpisodeDiff, UpdateError> {
    let stored = scan_local_store(podcast.store())?;
    let episodes = read_snapshot(podcast)?;
    let diff = create_diff(episodes, &stored);

    debug!(
        podcast = %podcast.name,
        total = diff.total_episodes,
        new = diff.to_download.len(),
        "Computed episode diff"
    );

    Ok(diff)
}
