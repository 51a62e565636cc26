use std::fs;

use tempfile::TempDir;

use hair_seg_rs::{AssetStore, DirAssetStore, HairSegError, Model, ModelConfig};

#[test]
fn loading_without_model_files_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let stem = dir.path().join("hairseg");

    let err = Model::load(&stem, ModelConfig::default()).unwrap_err();
    match err {
        HairSegError::FileSystem { path, .. } => {
            assert_eq!(path, dir.path().join("hairseg.onnx"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn loading_reports_a_missing_weight_companion() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("hairseg.onnx"), b"graph").unwrap();

    let err = Model::load(dir.path().join("hairseg"), ModelConfig::default()).unwrap_err();
    match err {
        HairSegError::FileSystem { path, .. } => {
            assert_eq!(path, dir.path().join("hairseg.bin"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn asset_store_serves_both_model_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("hairseg.onnx"), b"graph").unwrap();
    fs::write(dir.path().join("hairseg.bin"), b"weights").unwrap();

    let store = DirAssetStore::new(dir.path());
    assert_eq!(store.read("hairseg.onnx").unwrap(), b"graph");
    assert_eq!(store.read("hairseg.bin").unwrap(), b"weights");
}

#[test]
fn asset_backed_load_requires_both_assets() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("hairseg.onnx"), b"graph").unwrap();

    let store = DirAssetStore::new(dir.path());
    let err = Model::load_from_assets(&store, "hairseg", ModelConfig::default()).unwrap_err();
    match err {
        HairSegError::FileSystem { path, .. } => {
            assert_eq!(path, dir.path().join("hairseg.bin"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn default_model_config_is_cpu_bound() {
    let config = ModelConfig::default();
    assert!(!config.use_gpu);
    assert!(!config.reduced_memory);
    assert!(config.num_threads >= 1);
}
