//! Zip containers for exported and imported packs.

use crate::CoreError;
use sculk_store::{validate_pack_path, StoreError};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Write `entries` (archive path to bytes) to a new zip at `path`.
///
/// The archive is assembled next to `path` and renamed into place.
pub fn write_zip(path: &Path, entries: &BTreeMap<String, Vec<u8>>) -> Result<(), CoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    let mut zip = ZipWriter::new(tmp.reopen()?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(data)?;
    }
    zip.finish()?;
    tmp.persist(path)
        .map_err(|e| CoreError::Store(StoreError::Io(e.error)))?;
    Ok(())
}

/// Every file entry of the zip at `path`, keyed by its archive path.
///
/// Entries whose names would escape the extraction root are rejected.
pub fn read_zip(path: &Path) -> Result<BTreeMap<String, Vec<u8>>, CoreError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut entries = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_owned();
        validate_pack_path(&name)?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        entries.insert(name, data);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_roundtrip_keeps_nested_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/pack.zip");
        let mut entries = BTreeMap::new();
        entries.insert("manifest.json".to_owned(), b"{}".to_vec());
        entries.insert("overrides/config/a.toml".to_owned(), b"a = 1".to_vec());

        write_zip(&path, &entries).unwrap();
        assert_eq!(read_zip(&path).unwrap(), entries);
    }

    #[test]
    fn escaping_entry_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evil.zip");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("../evil.txt", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"x").unwrap();
        zip.finish().unwrap();

        assert!(matches!(
            read_zip(&path),
            Err(CoreError::Store(StoreError::InvalidPath(_)))
        ));
    }
}
