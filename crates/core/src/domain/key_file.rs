// Key File Domain Model

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reference to one downloaded diagnosis key file
///
/// Opaque to the gate: the path is never opened here, only handed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyFile(PathBuf);

impl KeyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// File name component, if the path has one
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|n| n.to_str())
    }

    pub fn into_path(self) -> PathBuf {
        self.0
    }
}

impl From<PathBuf> for KeyFile {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&str> for KeyFile {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

impl std::fmt::Display for KeyFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Key files for one provisioning attempt
///
/// Order is kept as given; duplicates are not rejected. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyFileBatch(Vec<KeyFile>);

impl KeyFileBatch {
    pub fn new(files: Vec<KeyFile>) -> Self {
        Self(files)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyFile> {
        self.0.iter()
    }

    pub fn files(&self) -> &[KeyFile] {
        &self.0
    }

    pub fn into_files(self) -> Vec<KeyFile> {
        self.0
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for KeyFileBatch {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self(iter.into_iter().map(KeyFile::new).collect())
    }
}

impl From<Vec<KeyFile>> for KeyFileBatch {
    fn from(files: Vec<KeyFile>) -> Self {
        Self(files)
    }
}

impl<'a> IntoIterator for &'a KeyFileBatch {
    type Item = &'a KeyFile;
    type IntoIter = std::slice::Iter<'a, KeyFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
