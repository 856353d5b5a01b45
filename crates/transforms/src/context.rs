//! Persisted scrambler state, one JSON blob per category.

use crate::scrambler::{Category, Scrambler, ScramblerState, Scramblers, CONTEXT_VERSION};
use fescate_utils::errors::ContextError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory holding `<category>` context files.
#[derive(Debug, Clone)]
pub struct ContextStore {
    dir: PathBuf,
}

impl ContextStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, category: Category) -> PathBuf {
        self.dir.join(category.as_str())
    }

    /// The stored state of `category`, or `None` when nothing was persisted.
    ///
    /// The version tag is checked before the rest of the blob is decoded so an
    /// older layout is reported as a version mismatch rather than as garbage.
    pub fn load(&self, category: Category) -> Result<Option<ScramblerState>, ContextError> {
        let path = self.path(category);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|source| ContextError::Io {
            path: path.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| ContextError::Malformed {
            path: path.clone(),
            source,
        })?;
        let version = value.get(0).and_then(Value::as_str).unwrap_or_default();
        if version != CONTEXT_VERSION {
            return Err(ContextError::VersionMismatch {
                category: category.as_str(),
                found: version.to_string(),
                expected: CONTEXT_VERSION,
            });
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| ContextError::Malformed { path, source })
    }

    pub fn save(&self, scrambler: &Scrambler) -> Result<(), ContextError> {
        let path = self.path(scrambler.category());
        let io = |source| ContextError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io)?;
        let text = serde_json::to_string(&scrambler.state()).map_err(|source| {
            ContextError::Malformed {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, text).map_err(io)
    }

    /// Load every stored category into `scramblers`; returns how many were found.
    pub fn restore_all(&self, scramblers: &mut Scramblers) -> Result<usize, ContextError> {
        let mut restored = 0;
        for scrambler in scramblers.iter_mut() {
            if let Some(state) = self.load(scrambler.category())? {
                scrambler.restore(state)?;
                restored += 1;
            }
        }
        debug!("restored {} context file(s) from {}", restored, self.dir.display());
        Ok(restored)
    }

    pub fn save_all(&self, scramblers: &Scramblers) -> Result<(), ContextError> {
        for scrambler in scramblers.iter() {
            self.save(scrambler)?;
        }
        debug!("saved context to {}", self.dir.display());
        Ok(())
    }
}
