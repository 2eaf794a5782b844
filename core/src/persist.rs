use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

/// Bumped whenever a snapshot struct changes shape.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub version: u32,
    pub created_at: String,
}

impl SnapshotHeader {
    pub fn now() -> Self {
        let created_at = time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "".into());
        Self { version: SNAPSHOT_VERSION, created_at }
    }

    pub fn check(&self, what: &'static str) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(Error::Corrupt {
                what,
                reason: format!("snapshot version {} (expected {SNAPSHOT_VERSION})", self.version),
            });
        }
        Ok(())
    }
}

/// File layout of a data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn chunks(&self) -> PathBuf { self.root.join("chunks.jsonl") }
    pub fn lexical_index(&self) -> PathBuf { self.root.join("index.bin") }
    pub fn embeddings(&self) -> PathBuf { self.root.join("embeddings.bin") }
    pub fn embedding_meta(&self) -> PathBuf { self.root.join("emb_meta.bin") }
}

impl Default for DataPaths {
    fn default() -> Self { Self::new("./data") }
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            create_dir_all(dir)?;
        }
    }
    Ok(())
}

pub fn save_blob<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let mut f = File::create(path)?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_blob<T: DeserializeOwned>(path: &Path, what: &'static str) -> Result<T> {
    if !path.exists() {
        return Err(Error::not_found(what, path));
    }
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let value = bincode::deserialize(&buf)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn blob_roundtrip_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/blob.bin");
        save_blob(&path, &vec![1u32, 2, 3]).unwrap();
        let back: Vec<u32> = load_blob(&path, "blob").unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }

    #[test]
    fn missing_blob_is_not_found() {
        let dir = tempdir().unwrap();
        let err = load_blob::<Vec<u32>>(&dir.path().join("nope.bin"), "blob").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn header_rejects_other_versions() {
        let header = SnapshotHeader { version: SNAPSHOT_VERSION + 1, created_at: String::new() };
        assert!(matches!(header.check("index"), Err(Error::Corrupt { .. })));
        assert!(SnapshotHeader::now().check("index").is_ok());
    }
}
