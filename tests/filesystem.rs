use std::{error::Error, path::Path, sync::Arc};

use ome_zarr_tiles::{
    axes::AxisLayout,
    chunk_loader::{ChunkLoader, ChunkLoaderOptions},
    dataset::ZarrV2DatasetReader,
    storage::{store::FilesystemStore, ReadableStorageTraits, StorageError, StoreKey},
};

// y, x with "." separated chunk keys
const ZARRAY: &str = r#"{
    "zarr_format": 2,
    "shape": [10, 7],
    "chunks": [4, 4],
    "dtype": "<f4",
    "compressor": null,
    "fill_value": "NaN",
    "order": "C",
    "filters": null
}"#;

fn write_image(root: &Path) -> Result<(), Box<dyn Error>> {
    let array = root.join("plate").join("0");
    std::fs::create_dir_all(&array)?;
    std::fs::write(array.join(".zarray"), ZARRAY)?;
    // chunk (y = 2, x = 1) holds the last two rows and columns of the image
    let chunk: Vec<u8> = (0..16u8)
        .flat_map(|i| f32::from(i).to_le_bytes())
        .collect();
    std::fs::write(array.join("2.1"), chunk)?;
    Ok(())
}

#[test]
fn filesystem_chunk_loader() -> Result<(), Box<dyn Error>> {
    let root = tempfile::TempDir::new()?;
    write_image(root.path())?;
    let store = Arc::new(FilesystemStore::new(root.path())?);
    let reader = Arc::new(ZarrV2DatasetReader::new(store));
    let loader = ChunkLoader::new(
        reader,
        "plate/0",
        ChunkLoaderOptions::new(4, 9).with_log_chunk_loading(false),
    )?;
    assert!(loader.axis_layout().is_2d());

    let cell = loader.load(&[1, 2, 0])?;
    assert_eq!(cell.shape(), &[3, 2, 1]);
    assert_eq!(
        cell.as_slice::<f32>().unwrap(),
        &[0.0, 1.0, 2.0, 4.0, 5.0, 6.0]
    );

    // Missing chunks are zero, not the NaN fill value
    let cell = loader.load(&[0, 0])?;
    assert_eq!(cell.shape(), &[4, 4, 1]);
    assert_eq!(cell.as_slice::<f32>().unwrap(), &[0.0; 16]);
    Ok(())
}

#[test]
fn filesystem_explicit_layout() -> Result<(), Box<dyn Error>> {
    let root = tempfile::TempDir::new()?;
    write_image(root.path())?;
    let store = Arc::new(FilesystemStore::new(root.path())?);
    let reader = Arc::new(ZarrV2DatasetReader::new(store));
    let options = ChunkLoaderOptions::new(0, 0)
        .with_axis_layout(AxisLayout::TwoD)
        .with_log_chunk_loading(false);
    let loader = ChunkLoader::new(reader.clone(), "plate/0", options)?;
    assert_eq!(loader.load(&[1, 2])?.num_elements(), 6);

    let options = ChunkLoaderOptions::new(0, 0)
        .with_axis_layout(AxisLayout::SpatialTime3)
        .with_log_chunk_loading(false);
    assert!(ChunkLoader::new(reader, "plate/0", options).is_err());
    Ok(())
}

#[test]
fn filesystem_missing_file() -> Result<(), Box<dyn Error>> {
    let root = tempfile::TempDir::new()?;
    let store = FilesystemStore::new(root.path())?;
    assert_eq!(store.get(&StoreKey::new("a/0.0")?)?, None);
    assert_eq!(store.size_key(&StoreKey::new("a/0.0")?)?, None);

    std::fs::create_dir(root.path().join("a"))?;
    std::fs::create_dir(root.path().join("a").join("0.0"))?;
    let err: StorageError = store.get(&StoreKey::new("a/0.0")?).unwrap_err();
    assert!(!err.is_transient());
    Ok(())
}
