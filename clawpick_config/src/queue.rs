//! The pick queue handed over by the selection front-end.
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("pick queue file {0:?} not found")]
    Missing(PathBuf),
    #[error("pick queue file {path:?} contains invalid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("reading pick queue {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ordered target class names. Read once at start, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PickQueue(Vec<String>);

impl PickQueue {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a PickQueue {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

pub fn load_pick_queue(path: &Path) -> Result<PickQueue, QueueError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => QueueError::Missing(path.to_path_buf()),
        _ => QueueError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    serde_json::from_str::<PickQueue>(&text).map_err(|source| QueueError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}
