// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::RegistryError;
use crate::podcast::{Podcast, is_reserved_name};

/// Storage for the set of managed podcasts
pub trait Registry {
    /// All managed podcasts, ordered by name
    fn list_all(&self) -> Result<Vec<Podcast>, RegistryError>;

    fn get_by_name(&self, name: &str) -> Result<Podcast, RegistryError>;

    /// Add a podcast; fails for the reserved name or a name already in use
    fn register(&self, podcast: Podcast) -> Result<(), RegistryError>;

    /// Drop a podcast from management and return its record
    fn remove(&self, name: &str) -> Result<Podcast, RegistryError>;
}

/// Registry persisted as a JSON object keyed by podcast name
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, Podcast>, RegistryError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|e| RegistryError::ReadFailed {
                path: self.path.clone(),
                source: e,
            })?;

        serde_json::from_str(&content).map_err(|e| RegistryError::JsonParseFailed {
            path: self.path.clone(),
            source: e,
        })
    }

    fn write(&self, podcasts: &BTreeMap<String, Podcast>) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| RegistryError::WriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(podcasts)?;
        std::fs::write(&self.path, json).map_err(|e| RegistryError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl Registry for FileRegistry {
    fn list_all(&self) -> Result<Vec<Podcast>, RegistryError> {
        Ok(self.read()?.into_values().collect())
    }

    fn get_by_name(&self, name: &str) -> Result<Podcast, RegistryError> {
        self.read()?
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    fn register(&self, podcast: Podcast) -> Result<(), RegistryError> {
        if is_reserved_name(&podcast.name) {
            return Err(RegistryError::ReservedName(podcast.name));
        }

        let mut podcasts = self.read()?;
        if podcasts.contains_key(&podcast.name) {
            return Err(RegistryError::AlreadyExists(podcast.name));
        }

        debug!(podcast = %podcast.name, registry = %self.path.display(), "Registering podcast");
        podcasts.insert(podcast.name.clone(), podcast);
        self.write(&podcasts)
    }

    fn remove(&self, name: &str) -> Result<Podcast, RegistryError> {
        let mut podcasts = self.read()?;
        let podcast = podcasts
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        self.write(&podcasts)?;
        Ok(podcast)
    }
}
