mod cache;
mod parse;

pub use cache::{
    PARTIAL_SNAPSHOT_FILENAME, SNAPSHOT_FILENAME, read_snapshot, refresh_feed, snapshot_path,
};
pub use parse::{Episode, parse_feed};
