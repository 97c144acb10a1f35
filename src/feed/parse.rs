// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::BufRead;

use crate::error::FeedError;

/// Represents a single podcast episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    /// Identity key used when diffing against the local store
    pub title: String,
    pub media_url: String,
    /// Size advertised by the feed, 0 when unknown
    pub expected_size: u64,
    /// Bytes written by a successful download
    pub transferred_bytes: Option<u64>,
}

impl Episode {
    pub fn new(title: impl Into<String>, media_url: impl Into<String>, expected_size: u64) -> Self {
        Self {
            title: title.into(),
            media_url: media_url.into(),
            expected_size,
            transferred_bytes: None,
        }
    }
}

/// Parse an RSS feed document into its episodes, in feed order
///
/// Either every item parses or the whole feed is rejected.
pub fn parse_feed<R: BufRead>(reader: R) -> Result<Vec<Episode>, FeedError> {
    let channel = rss::Channel::read_from(reader)?;

    channel.items().iter().map(parse_episode).collect()
}

fn parse_episode(item: &rss::Item) -> Result<Episode, FeedError> {
    let title = item.title().ok_or(FeedError::MissingTitle)?.to_string();

    let enclosure = item
        .enclosure()
        .ok_or_else(|| FeedError::MissingEnclosure {
            title: title.clone(),
        })?;

    Ok(Episode {
        expected_size: enclosure.length().trim().parse().unwrap_or(0),
        media_url: enclosure.url().to_string(),
        transferred_bytes: None,
        title,
    })
}
