use url::Url;

use crate::feed::Episode;

/// Remove the final extension (everything from the last `.`) from a name
///
/// Names without a dot are returned unchanged.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) => &name[..pos],
        None => name,
    }
}

/// Get the media file extension from the last segment of a URL path
///
/// The result includes the leading dot and keeps its original case. Returns
/// an empty string when the last segment carries no extension.
pub fn url_extension(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|segment| segment.rfind('.').map(|pos| segment[pos..].to_string()))
        .unwrap_or_default()
}

/// Generate the file name an episode is stored under: `<title><ext>`
///
/// The title is used verbatim so that stripping the extension again yields the
/// episode's title, which is what the local store scan relies on. A title
/// containing a dot without any URL extension gets a bare trailing `.` as its
/// extension for the same reason.
pub fn episode_filename(episode: &Episode, media_url: &Url) -> String {
    let ext = url_extension(media_url);
    if ext.is_empty() && episode.title.contains('.') {
        return format!("{}.", episode.title);
    }

    format!("{}{}", episode.title, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    // === Extension stripping ===

    #[test]
    fn strip_removes_final_extension() {
        assert_eq!(strip_extension("Ep1.mp3"), "Ep1");
    }

    #[test]
    fn strip_only_removes_last_extension() {
        assert_eq!(strip_extension("archive.tar.gz"), "archive.tar");
    }

    #[test]
    fn strip_keeps_names_without_dot() {
        assert_eq!(strip_extension("Ep1"), "Ep1");
    }

    #[test]
    fn strip_of_dotfile_is_empty() {
        assert_eq!(strip_extension(".hidden"), "");
    }

    // === URL extension ===

    #[test]
    fn extension_comes_from_last_segment() {
        assert_eq!(url_extension(&url("https://cdn.example.com/a/b/ep1.mp3")), ".mp3");
    }

    #[test]
    fn extension_ignores_query_string() {
        assert_eq!(
            url_extension(&url("https://example.com/ep1.m4a?token=abc.def")),
            ".m4a"
        );
    }

    #[test]
    fn extension_keeps_case() {
        assert_eq!(url_extension(&url("https://example.com/EP1.MP3")), ".MP3");
    }

    #[test]
    fn extension_ignores_dots_in_directories() {
        assert_eq!(url_extension(&url("https://example.com/v1.2/episode")), "");
    }

    #[test]
    fn extension_empty_for_root_path() {
        assert_eq!(url_extension(&url("https://example.com/")), "");
    }

    // === File names ===

    #[test]
    fn filename_is_title_plus_extension() {
        let episode = Episode::new("My Episode", "https://example.com/x/file.ogg", 0);
        let media_url = url(&episode.media_url);

        assert_eq!(episode_filename(&episode, &media_url), "My Episode.ogg");
    }

    #[test]
    fn filename_without_extension_keeps_plain_title() {
        let episode = Episode::new("Episode 42", "https://example.com/stream/42", 0);
        let media_url = url(&episode.media_url);

        assert_eq!(episode_filename(&episode, &media_url), "Episode 42");
    }

    #[test]
    fn dotted_title_without_extension_gets_trailing_dot() {
        let episode = Episode::new("Ep. 2", "https://example.com/stream/42", 0);
        let media_url = url(&episode.media_url);

        let filename = episode_filename(&episode, &media_url);
        assert_eq!(filename, "Ep. 2.");
        assert_eq!(strip_extension(&filename), "Ep. 2");
    }

    #[test]
    fn filename_round_trips_through_strip() {
        let episode = Episode::new("Ep. 12: The End", "https://example.com/12.mp3", 0);
        let media_url = url(&episode.media_url);

        let filename = episode_filename(&episode, &media_url);
        assert_eq!(strip_extension(&filename), episode.title);
    }
}
