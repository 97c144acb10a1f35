use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name that addresses every managed podcast in batch commands
pub const RESERVED_NAME: &str = "all";

/// A managed podcast subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Podcast {
    /// URL to retrieve the podcast feed from
    pub feed_url: String,
    /// The name under which this podcast is managed
    pub name: String,
    /// Directory holding the downloaded episodes and the feed snapshot
    pub local_store: PathBuf,
}

impl Podcast {
    pub fn new(
        name: impl Into<String>,
        feed_url: impl Into<String>,
        local_store: impl Into<PathBuf>,
    ) -> Self {
        Self {
            feed_url: feed_url.into(),
            name: name.into(),
            local_store: local_store.into(),
        }
    }

    pub fn store(&self) -> &Path {
        &self.local_store
    }
}

/// Whether `name` is the token meaning "all podcasts"
pub fn is_reserved_name(name: &str) -> bool {
    name == RESERVED_NAME
}
