// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use indicatif::HumanBytes;
use tracing::{info, warn};

use crate::confirm::Confirm;
use crate::episode::{DownloadContext, download_episode};
use crate::error::{RegistryError, UpdateError};
use crate::feed::{Episode, refresh_feed};
use crate::http::HttpClient;
use crate::podcast::{Podcast, is_reserved_name};
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::registry::Registry;
use crate::state::diff_podcast;

/// New episodes found for one podcast of a batch
#[derive(Debug, Clone)]
pub struct PodcastUpdate {
    pub podcast: Podcast,
    /// Episodes missing from the local store, in feed order
    pub new_episodes: Vec<Episode>,
}

/// Outcome of a batch update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Number of new episodes across all podcasts
    pub new_episodes: usize,
    /// Sum of the sizes advertised by the feeds for those episodes
    pub expected_bytes: u64,
    /// Whether the download was approved
    pub approved: bool,
    /// Number of episodes downloaded
    pub downloaded: usize,
    /// Bytes actually written to disk
    pub bytes_downloaded: u64,
}

/// Resolve podcast names given on the command line
///
/// The reserved name anywhere in the list selects every managed podcast.
/// Otherwise each name is looked up in order.
pub fn resolve_targets<R: Registry + ?Sized>(
    registry: &R,
    names: &[String],
) -> Result<Vec<Podcast>, RegistryError> {
    if names.iter().any(|name| is_reserved_name(name)) {
        return registry.list_all();
    }

    names
        .iter()
        .map(|name| registry.get_by_name(name))
        .collect()
}

/// Start managing a new podcast
///
/// Rejects the reserved name and names already in use before touching the
/// network, then fetches the first feed snapshot (creating the local store)
/// and finally persists the record.
pub async fn add_podcast<C: HttpClient, R: Registry + ?Sized>(
    client: &C,
    registry: &R,
    podcast: Podcast,
    reporter: &SharedProgressReporter,
) -> Result<(), UpdateError> {
    if is_reserved_name(&podcast.name) {
        return Err(RegistryError::ReservedName(podcast.name).into());
    }

    match registry.get_by_name(&podcast.name) {
        Ok(_) => return Err(RegistryError::AlreadyExists(podcast.name).into()),
        Err(RegistryError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    reporter.report(ProgressEvent::FetchingFeed {
        podcast_name: podcast.name.clone(),
        url: podcast.feed_url.clone(),
    });
    refresh_feed(client, &podcast).await?;

    info!(podcast = %podcast.name, "Podcast added");
    registry.register(podcast)?;
    Ok(())
}

/// Refresh and diff every podcast in order, stopping at the first failure
pub async fn collect_new_episodes<C: HttpClient>(
    client: &C,
    podcasts: &[Podcast],
    reporter: &SharedProgressReporter,
) -> Result<Vec<PodcastUpdate>, UpdateError> {
    let mut updates = Vec::with_capacity(podcasts.len());

    for podcast in podcasts {
        reporter.report(ProgressEvent::FetchingFeed {
            podcast_name: podcast.name.clone(),
            url: podcast.feed_url.clone(),
        });

        refresh_feed(client, podcast).await?;
        let diff = diff_podcast(podcast)?;

        reporter.report(ProgressEvent::FeedDiffed {
            podcast_name: podcast.name.clone(),
            total_episodes: diff.total_episodes,
            new_episodes: diff.to_download.len(),
        });

        updates.push(PodcastUpdate {
            podcast: podcast.clone(),
            new_episodes: diff.to_download,
        });
    }

    Ok(updates)
}

/// Question asked before downloading a batch
pub fn confirmation_message(episode_count: usize, expected_bytes: u64) -> String {
    format!(
        "Download {} episodes for {}?",
        episode_count,
        HumanBytes(expected_bytes)
    )
}

/// Update a batch of podcasts
///
/// This is the main entry point for the library. It:
/// 1. Refreshes and diffs every podcast, aborting on the first failure
/// 2. Stops early when nothing is new
/// 3. Lists the new episodes and asks once for the whole batch
/// 4. Downloads podcast by podcast, episode by episode, aborting on the
///    first failed download (finished files stay on disk)
pub async fn update_podcasts<C: HttpClient, F: Confirm + ?Sized>(
    client: &C,
    podcasts: &[Podcast],
    confirm: &F,
    reporter: &SharedProgressReporter,
) -> Result<UpdateSummary, UpdateError> {
    let mut updates = collect_new_episodes(client, podcasts, reporter).await?;

    let new_episodes: usize = updates.iter().map(|u| u.new_episodes.len()).sum();
    let expected_bytes: u64 = updates
        .iter()
        .flat_map(|u| &u.new_episodes)
        .map(|e| e.expected_size)
        .fold(0, u64::saturating_add);

    let mut summary = UpdateSummary {
        new_episodes,
        expected_bytes,
        ..Default::default()
    };

    if new_episodes == 0 {
        reporter.report(ProgressEvent::NothingToDo);
        return Ok(summary);
    }

    for update in updates.iter().filter(|u| !u.new_episodes.is_empty()) {
        reporter.report(ProgressEvent::PendingEpisodes {
            podcast_name: update.podcast.name.clone(),
            titles: update.new_episodes.iter().map(|e| e.title.clone()).collect(),
        });
    }

    if !confirm.confirm(&confirmation_message(new_episodes, expected_bytes)) {
        reporter.report(ProgressEvent::Declined);
        return Ok(summary);
    }
    summary.approved = true;

    let mut episode_index = 0;
    for update in &mut updates {
        let store = update.podcast.local_store.clone();

        for episode in &mut update.new_episodes {
            let context = DownloadContext {
                podcast_name: update.podcast.name.clone(),
                episode_index,
                total_to_download: new_episodes,
            };

            match download_episode(client, episode, &store, &context, reporter).await {
                Ok(bytes) => {
                    summary.downloaded += 1;
                    summary.bytes_downloaded += bytes;
                }
                Err(e) => {
                    warn!(
                        podcast = %update.podcast.name,
                        episode = %episode.title,
                        error = %e,
                        "Download failed, aborting batch"
                    );
                    reporter.report(ProgressEvent::DownloadFailed {
                        episode_title: episode.title.clone(),
                        error: e.to_string(),
                    });
                    return Err(e.into());
                }
            }

            episode_index += 1;
        }
    }

    reporter.report(ProgressEvent::UpdateCompleted {
        downloaded_count: summary.downloaded,
        bytes_downloaded: summary.bytes_downloaded,
    });

    Ok(summary)
}
