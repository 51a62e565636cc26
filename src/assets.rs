use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::errors::{HairSegError, Result};
use crate::traits::AssetStore;

/// Asset store backed by a plain directory.
///
/// The simplest packaging there is: asset names resolve to files under the
/// root. Bundled or archived stores implement [`AssetStore`] the same way.
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetStore for DirAssetStore {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(name);
        fs::read(&path).map_err(|e| HairSegError::FileSystem {
            path,
            operation: "asset read".to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_asset_bytes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hairseg.bin"), b"weights").unwrap();

        let store = DirAssetStore::new(dir.path());
        assert_eq!(store.read("hairseg.bin").unwrap(), b"weights");
    }

    #[test]
    fn read_reports_missing_assets() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirAssetStore::new(dir.path());

        let err = store.read("absent.onnx").unwrap_err();
        match err {
            HairSegError::FileSystem { path, .. } => {
                assert_eq!(path, dir.path().join("absent.onnx"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
