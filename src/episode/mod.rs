mod download;
mod filename;

pub use download::{DownloadContext, download_episode};
pub use filename::{episode_filename, strip_extension, url_extension};
