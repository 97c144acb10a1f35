use std::path::Path;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use crate::error::DownloadError;
use crate::feed::Episode;
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};

use super::filename::episode_filename;

/// Context for tracking a download within a batch
#[derive(Debug, Clone)]
pub struct DownloadContext {
    /// Podcast the episode belongs to
    pub podcast_name: String,
    /// Index of this episode in the download queue
    pub episode_index: usize,
    /// Total number of episodes to download
    pub total_to_download: usize,
}

/// Download an episode into `store_dir` as `<title><ext>`
///
/// The destination file is only created once the server has answered with a
/// success status. Streams the response body to disk, reporting progress
/// through the reporter, and records the number of bytes written in
/// `episode.transferred_bytes`.
pub async fn download_episode<C: HttpClient>(
    client: &C,
    episode: &mut Episode,
    store_dir: &Path,
    context: &DownloadContext,
    reporter: &SharedProgressReporter,
) -> Result<u64, DownloadError> {
    let media_url = Url::parse(&episode.media_url).map_err(|e| DownloadError::InvalidUrl {
        url: episode.media_url.clone(),
        source: e,
    })?;
    let url = media_url.as_str();

    // Get streaming response
    let response = client
        .get_stream(url)
        .await
        .map_err(|e| DownloadError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if !response.is_success() {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    reporter.report(ProgressEvent::DownloadStarting {
        podcast_name: context.podcast_name.clone(),
        episode_title: episode.title.clone(),
        episode_index: context.episode_index,
        total_to_download: context.total_to_download,
        content_length: response.content_length,
    });

    let output_path = store_dir.join(episode_filename(episode, &media_url));
    debug!(path = %output_path.display(), url, "Writing episode");

    let mut file =
        File::create(&output_path)
            .await
            .map_err(|e| DownloadError::FileCreateFailed {
                path: output_path.clone(),
                source: e,
            })?;

    // Stream body to file
    let mut bytes_downloaded: u64 = 0;
    let mut stream = response.body;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: output_path.clone(),
                source: e,
            })?;

        bytes_downloaded += chunk.len() as u64;

        reporter.report(ProgressEvent::DownloadProgress {
            episode_title: episode.title.clone(),
            bytes_downloaded,
            total_bytes: response.content_length,
        });
    }

    // Ensure all data is flushed to disk
    file.flush()
        .await
        .map_err(|e| DownloadError::FileWriteFailed {
            path: output_path.clone(),
            source: e,
        })?;

    episode.transferred_bytes = Some(bytes_downloaded);

    reporter.report(ProgressEvent::DownloadCompleted {
        episode_title: episode.title.clone(),
        bytes_downloaded,
    });

    Ok(bytes_downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::mock::MockHttpClient;
    use crate::progress::NoopReporter;
    use crate::state::scan_local_store;

    use tempfile::tempdir;

    const MEDIA_URL: &str = "https://example.com/media/episode.mp3";

    fn make_episode(media_url: &str) -> Episode {
        Episode::new("Test Episode", media_url, 1000)
    }

    fn context() -> DownloadContext {
        DownloadContext {
            podcast_name: "show".to_string(),
            episode_index: 0,
            total_to_download: 1,
        }
    }

    #[tokio::test]
    async fn download_writes_file() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new().with(MEDIA_URL, b"test audio content".to_vec());
        let mut episode = make_episode(MEDIA_URL);

        let bytes = download_episode(
            &client,
            &mut episode,
            dir.path(),
            &context(),
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(bytes, 18); // "test audio content".len()
        assert_eq!(episode.transferred_bytes, Some(18));

        let content = std::fs::read(dir.path().join("Test Episode.mp3")).unwrap();
        assert_eq!(content, b"test audio content");
    }

    #[tokio::test]
    async fn downloaded_episode_is_found_by_scan() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new().with(MEDIA_URL, b"audio".to_vec());
        let mut episode = make_episode(MEDIA_URL);

        download_episode(
            &client,
            &mut episode,
            dir.path(),
            &context(),
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        let stored = scan_local_store(dir.path()).unwrap();
        assert!(stored.contains(&episode.title));
    }

    #[tokio::test]
    async fn download_truncates_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Test Episode.mp3");
        std::fs::write(&path, b"a much longer stale payload").unwrap();

        let client = MockHttpClient::new().with(MEDIA_URL, b"fresh".to_vec());
        let mut episode = make_episode(MEDIA_URL);

        download_episode(
            &client,
            &mut episode,
            dir.path(),
            &context(),
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn download_fails_on_http_error() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new().with_status(MEDIA_URL, 404);
        let mut episode = make_episode(MEDIA_URL);

        let result = download_episode(
            &client,
            &mut episode,
            dir.path(),
            &context(),
            &NoopReporter::shared(),
        )
        .await;

        match result.unwrap_err() {
            DownloadError::HttpStatus { status, .. } => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got {other:?}"),
        }
        assert!(episode.transferred_bytes.is_none());
        assert!(!dir.path().join("Test Episode.mp3").exists());
    }

    #[tokio::test]
    async fn download_rejects_malformed_url() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new();
        let mut episode = make_episode("not a url");

        let err = download_episode(
            &client,
            &mut episode,
            dir.path(),
            &context(),
            &NoopReporter::shared(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
        assert!(client.requested().is_empty());
    }

    #[tokio::test]
    async fn download_without_extension_uses_bare_title() {
        let dir = tempdir().unwrap();
        let url = "https://example.com/stream/42";
        let client = MockHttpClient::new().with(url, b"audio".to_vec());
        let mut episode = make_episode(url);

        download_episode(
            &client,
            &mut episode,
            dir.path(),
            &context(),
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert!(dir.path().join("Test Episode").exists());
    }

    #[tokio::test]
    async fn dotted_title_without_extension_is_found_by_scan() {
        let dir = tempdir().unwrap();
        let url = "https://example.com/stream/42";
        let client = MockHttpClient::new().with(url, b"audio".to_vec());
        let mut episode = Episode::new("Ep. 2", url, 1);

        download_episode(
            &client,
            &mut episode,
            dir.path(),
            &context(),
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        let stored = scan_local_store(dir.path()).unwrap();
        assert!(stored.contains("Ep. 2"), "stored: {stored:?}");
    }
}
