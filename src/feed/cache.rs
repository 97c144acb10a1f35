// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info};
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::{FeedError, StorageError};
use crate::http::{ByteStream, HttpClient};
use crate::podcast::Podcast;

use super::parse::{Episode, parse_feed};

/// Name of the zipped feed snapshot inside every local store
pub const SNAPSHOT_FILENAME: &str = "feed.zip";

/// Name of the snapshot while it is being written
pub const PARTIAL_SNAPSHOT_FILENAME: &str = "feed.zip.partial";

/// Chunks buffered between the feed stream and the archive writer
const CHUNK_BUFFER: usize = 16;

/// Full path of the feed snapshot for a local store
pub fn snapshot_path(store: &Path) -> PathBuf {
    store.join(SNAPSHOT_FILENAME)
}

fn partial_path(store: &Path) -> PathBuf {
    store.join(PARTIAL_SNAPSHOT_FILENAME)
}

/// Fetch a podcast's feed and replace its local snapshot
///
/// The store directory is only touched once the server has answered with a
/// success status. The body is streamed into the single archive entry (named
/// after the podcast) of a temporary file which is renamed over the previous
/// snapshot at the end, so a failed refresh never leaves a broken snapshot.
///
/// Returns the size of the raw feed document in bytes.
pub async fn refresh_feed<C: HttpClient>(client: &C, podcast: &Podcast) -> Result<u64, FeedError> {
    let url = podcast.feed_url.as_str();
    debug!(podcast = %podcast.name, url, "Fetching feed");

    let response = client
        .get_stream(url)
        .await
        .map_err(|e| FeedError::FetchFailed {
            url: url.to_string(),
            source: e,
        })?;

    if !response.is_success() {
        return Err(FeedError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let store = podcast.store();
    tokio::fs::create_dir_all(store)
        .await
        .map_err(|e| StorageError::CreateDirectoryFailed {
            path: store.to_path_buf(),
            source: e,
        })?;

    let snapshot = snapshot_path(store);
    let partial = partial_path(store);

    let bytes = match write_snapshot(&podcast.name, url, response.body, &partial).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
    };

    tokio::fs::rename(&partial, &snapshot)
        .await
        .map_err(|e| StorageError::WriteFailed {
            path: snapshot.clone(),
            source: e,
        })?;

    info!(podcast = %podcast.name, bytes, "Feed snapshot refreshed");
    Ok(bytes)
}

/// Stream `body` into a fresh archive at `path`
///
/// The zip writer only speaks blocking I/O, so it runs on the blocking pool
/// and receives the body chunk by chunk over a bounded channel.
async fn write_snapshot(
    entry_name: &str,
    url: &str,
    mut body: ByteStream,
    path: &Path,
) -> Result<u64, FeedError> {
    let (tx, rx) = mpsc::channel::<Bytes>(CHUNK_BUFFER);
    let writer = {
        let entry_name = entry_name.to_string();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || write_archive(&entry_name, &path, rx))
    };

    let mut streamed = Ok(());
    while let Some(chunk_result) = body.next().await {
        match chunk_result {
            Ok(chunk) => {
                // The writer hung up, its own error is reported below
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                streamed = Err(FeedError::StreamFailed {
                    url: url.to_string(),
                    source: e,
                });
                break;
            }
        }
    }
    drop(tx);

    let written = writer.await.map_err(|e| StorageError::WriteFailed {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    })?;

    streamed?;
    Ok(written?)
}

fn write_archive(
    entry_name: &str,
    path: &Path,
    mut chunks: mpsc::Receiver<Bytes>,
) -> Result<u64, StorageError> {
    let file = File::create(path).map_err(|e| StorageError::CreateFileFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut archive = ZipWriter::new(file);
    archive
        .start_file(entry_name, SimpleFileOptions::default())
        .map_err(|e| StorageError::SnapshotFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut bytes_written: u64 = 0;
    while let Some(chunk) = chunks.blocking_recv() {
        archive
            .write_all(&chunk)
            .map_err(|e| StorageError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        bytes_written += chunk.len() as u64;
    }

    archive.finish().map_err(|e| StorageError::SnapshotFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(bytes_written)
}

/// Parse the episodes out of a podcast's cached feed snapshot
pub fn read_snapshot(podcast: &Podcast) -> Result<Vec<Episode>, FeedError> {
    let path = snapshot_path(podcast.store());

    let file = File::open(&path).map_err(|e| StorageError::OpenFailed {
        path: path.clone(),
        source: e,
    })?;

    let mut archive = ZipArchive::new(file).map_err(|e| StorageError::SnapshotFailed {
        path: path.clone(),
        source: e,
    })?;

    if archive.len() == 0 {
        return Err(FeedError::EmptyArchive(path));
    }

    let entry = archive
        .by_index(0)
        .map_err(|e| StorageError::SnapshotFailed {
            path: path.clone(),
            source: e,
        })?;

    parse_feed(BufReader::new(entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Read;

    use crate::error::ErrorKind;
    use crate::http::mock::MockHttpClient;
    use tempfile::tempdir;

    const FEED_URL: &str = "https://example.com/feed.xml";

    const SAMPLE_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Test Podcast</title>
    <description>A test podcast</description>
    <item>
      <title>Episode 1</title>
      <enclosure url="https://example.com/ep1.mp3" length="100" type="audio/mpeg"/>
    </item>
  </channel>
</rss>"#;

    fn snapshot_entry(path: &Path) -> (String, String) {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        (entry.name().to_string(), content)
    }

    #[tokio::test]
    async fn refresh_creates_store_and_snapshot() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("nested").join("show");
        let podcast = Podcast::new("show", FEED_URL, &store);
        let client = MockHttpClient::new().with(FEED_URL, SAMPLE_FEED);

        let bytes = refresh_feed(&client, &podcast).await.unwrap();

        assert_eq!(bytes, SAMPLE_FEED.len() as u64);
        let (name, content) = snapshot_entry(&snapshot_path(&store));
        assert_eq!(name, "show");
        assert_eq!(content, SAMPLE_FEED);
        assert!(!partial_path(&store).exists());
    }

    #[tokio::test]
    async fn refresh_overwrites_previous_snapshot() {
        let dir = tempdir().unwrap();
        let podcast = Podcast::new("show", FEED_URL, dir.path());

        let first = MockHttpClient::new().with(FEED_URL, "old feed");
        refresh_feed(&first, &podcast).await.unwrap();

        let second = MockHttpClient::new().with(FEED_URL, SAMPLE_FEED);
        refresh_feed(&second, &podcast).await.unwrap();

        let (_, content) = snapshot_entry(&snapshot_path(dir.path()));
        assert_eq!(content, SAMPLE_FEED);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_snapshot_untouched() {
        let dir = tempdir().unwrap();
        let podcast = Podcast::new("show", FEED_URL, dir.path());

        let ok = MockHttpClient::new().with(FEED_URL, SAMPLE_FEED);
        refresh_feed(&ok, &podcast).await.unwrap();

        let failing = MockHttpClient::new().with_status(FEED_URL, 503);
        let err = refresh_feed(&failing, &podcast).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Fetch);
        let (_, content) = snapshot_entry(&snapshot_path(dir.path()));
        assert_eq!(content, SAMPLE_FEED);
    }

    #[tokio::test]
    async fn broken_stream_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let podcast = Podcast::new("show", FEED_URL, dir.path());

        let ok = MockHttpClient::new().with(FEED_URL, SAMPLE_FEED);
        refresh_feed(&ok, &podcast).await.unwrap();

        let broken = MockHttpClient::new().with_broken_body(FEED_URL, "<rss><chan");
        let err = refresh_feed(&broken, &podcast).await.unwrap_err();

        assert!(matches!(err, FeedError::StreamFailed { .. }), "got {err:?}");
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert!(!partial_path(dir.path()).exists());
        assert_eq!(read_snapshot(&podcast).unwrap()[0].title, "Episode 1");
    }

    #[tokio::test]
    async fn unwritable_partial_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let podcast = Podcast::new("show", FEED_URL, dir.path());

        let ok = MockHttpClient::new().with(FEED_URL, SAMPLE_FEED);
        refresh_feed(&ok, &podcast).await.unwrap();

        // A directory in the way makes creating the temporary file fail
        std::fs::create_dir(partial_path(dir.path())).unwrap();
        let second = MockHttpClient::new().with(FEED_URL, "new feed");
        let err = refresh_feed(&second, &podcast).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(!partial_path(dir.path()).is_file());
        assert_eq!(read_snapshot(&podcast).unwrap()[0].title, "Episode 1");
    }

    #[tokio::test]
    async fn store_below_a_file_is_a_storage_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let podcast = Podcast::new("show", FEED_URL, blocker.join("show"));

        let client = MockHttpClient::new().with(FEED_URL, SAMPLE_FEED);
        let err = refresh_feed(&client, &podcast).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(matches!(
            err,
            FeedError::Storage(StorageError::CreateDirectoryFailed { .. })
        ));
    }

    #[tokio::test]
    async fn failed_fetch_does_not_create_store() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("show");
        let podcast = Podcast::new("show", FEED_URL, &store);

        let client = MockHttpClient::new();
        let err = refresh_feed(&client, &podcast).await.unwrap_err();

        assert!(matches!(err, FeedError::HttpStatus { status: 404, .. }));
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn read_snapshot_parses_cached_feed() {
        let dir = tempdir().unwrap();
        let podcast = Podcast::new("show", FEED_URL, dir.path());
        let client = MockHttpClient::new().with(FEED_URL, SAMPLE_FEED);
        refresh_feed(&client, &podcast).await.unwrap();

        let episodes = read_snapshot(&podcast).unwrap();

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].title, "Episode 1");
        assert_eq!(episodes[0].expected_size, 100);
    }

    #[test]
    fn empty_archive_is_reported() {
        let dir = tempdir().unwrap();
        let podcast = Podcast::new("show", FEED_URL, dir.path());

        let file = File::create(snapshot_path(dir.path())).unwrap();
        ZipWriter::new(file).finish().unwrap();

        let err = read_snapshot(&podcast).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyArchive);
    }

    #[test]
    fn missing_snapshot_is_a_storage_error() {
        let dir = tempdir().unwrap();
        let podcast = Podcast::new("show", FEED_URL, dir.path());

        let err = read_snapshot(&podcast).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
