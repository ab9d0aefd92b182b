use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::dataset::domain::dataset::{empty_metadata, Dataset, IdentityMetadata};
use crate::dataset::domain::dataset_repository::{DatasetError, DatasetRepository, LoadedDataset};
use crate::dataset::domain::identity::Identity;
use crate::shared::constants::ENCODING_FILE_EXT;
use crate::shared::data_layout::DataLayout;
use crate::shared::file_naming::{
    file_stem, list_files_with_extension, next_file_path, numeric_stem,
};

/// What `save()` does with numbered files beyond the in-memory sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StaleFilePolicy {
    /// Delete `<n>.bin` files with `n >= len` so disk matches memory.
    #[default]
    Prune,
    /// Leave them; a later load will pick them up again.
    Keep,
}

#[derive(Serialize)]
struct EncodingRecordRef<'a, E> {
    face: &'a E,
}

#[derive(Deserialize)]
struct EncodingRecord<E> {
    face: E,
}

/// On-disk dataset layout:
///
/// ```text
/// <root>/names.json          {"alice": {}, "bob": {...}}
/// <root>/faces/alice/0.bin   bincode {face: <encoding>}
/// <root>/faces/alice/1.bin
/// ```
pub struct FsDatasetRepository {
    layout: DataLayout,
    policy: StaleFilePolicy,
}

impl FsDatasetRepository {
    pub fn new(layout: DataLayout) -> Self {
        Self::with_policy(layout, StaleFilePolicy::default())
    }

    pub fn with_policy(layout: DataLayout, policy: StaleFilePolicy) -> Self {
        Self { layout, policy }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn identity_dir(&self, identity: &Identity) -> PathBuf {
        self.layout.faces_dir().join(identity.as_str())
    }

    /// Writes one encoding to the next free numbered file of `identity`
    /// and registers the identity in the name index if it is new.
    pub fn append<E: Serialize>(
        &self,
        identity: &Identity,
        encoding: &E,
    ) -> Result<PathBuf, DatasetError> {
        let dir = self.identity_dir(identity);
        fs::create_dir_all(&dir).map_err(|source| io_error(&dir, source))?;
        let path =
            next_file_path(&dir, ENCODING_FILE_EXT).map_err(|source| io_error(&dir, source))?;
        write_encoding(&path, encoding)?;

        let mut index = self.read_index()?.unwrap_or_default();
        if !index.contains_key(identity.as_str()) {
            index.insert(identity.as_str().to_string(), empty_metadata());
            self.write_index(&index)?;
        }
        log::debug!("Appended encoding for {identity} at {}", path.display());
        Ok(path)
    }

    fn read_index(&self) -> Result<Option<BTreeMap<String, IdentityMetadata>>, DatasetError> {
        let path = self.layout.name_index_file();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(io_error(&path, source)),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| DatasetError::IndexCorrupt { path, source })
    }

    fn write_index(&self, index: &BTreeMap<String, IdentityMetadata>) -> Result<(), DatasetError> {
        let path = self.layout.name_index_file();
        let json = serde_json::to_string_pretty(index).map_err(|source| DatasetError::Encode {
            path: path.clone(),
            source: source.into(),
        })?;
        write_atomic(&path, json.as_bytes())
    }

    /// Reads every decodable `<n>.bin` encoding of one identity. Returns
    /// the encodings and the number of files skipped.
    ///
    /// Files with a non-numeric stem are not records: `save()` never
    /// rewrites or prunes them, so loading them would duplicate their
    /// contents on every resave.
    fn load_identity<E: DeserializeOwned>(
        &self,
        identity: &Identity,
    ) -> Result<(Vec<E>, usize), DatasetError> {
        let dir = self.identity_dir(identity);
        let files = list_files_with_extension(&dir, ENCODING_FILE_EXT)
            .map_err(|source| io_error(&dir, source))?;

        let mut encodings = Vec::with_capacity(files.len());
        let mut skipped = 0;
        for path in files {
            if file_stem(&path).and_then(numeric_stem).is_none() {
                log::warn!("Ignoring non-numbered encoding file {}", path.display());
                continue;
            }
            match read_encoding(&path) {
                Ok(encoding) => encodings.push(encoding),
                Err(e) => {
                    log::warn!("Skipping encoding {}: {e}", path.display());
                    skipped += 1;
                }
            }
        }
        Ok((encodings, skipped))
    }

    fn prune_stale(&self, dir: &Path, len: usize) -> Result<(), DatasetError> {
        let files = list_files_with_extension(dir, ENCODING_FILE_EXT)
            .map_err(|source| io_error(dir, source))?;
        for path in files {
            let stale = file_stem(&path)
                .and_then(numeric_stem)
                .is_some_and(|n| n >= len as u64);
            if stale {
                fs::remove_file(&path).map_err(|source| io_error(&path, source))?;
                log::debug!("Removed stale encoding {}", path.display());
            }
        }
        Ok(())
    }
}

impl<E> DatasetRepository<E> for FsDatasetRepository
where
    E: Serialize + DeserializeOwned,
{
    fn load(&self) -> Result<Option<LoadedDataset<E>>, DatasetError> {
        let Some(index) = self.read_index()? else {
            return Ok(None);
        };

        let mut dataset = Dataset::new();
        let mut skipped_records = 0;
        for (name, metadata) in index {
            let identity = match Identity::new(name) {
                Ok(identity) => identity,
                Err(e) => {
                    log::warn!("Ignoring name index entry: {e}");
                    continue;
                }
            };
            let (encodings, skipped) = self.load_identity(&identity)?;
            skipped_records += skipped;
            dataset.insert_identity(identity.clone(), metadata);
            for encoding in encodings {
                dataset.add_encoding(identity.clone(), encoding);
            }
        }

        Ok(Some(LoadedDataset {
            dataset,
            skipped_records,
        }))
    }

    fn save(&self, dataset: &Dataset<E>) -> Result<(), DatasetError> {
        // Keys that load() skipped as invalid identities stay in the index.
        let mut index: BTreeMap<String, IdentityMetadata> = match self.read_index() {
            Ok(Some(existing)) => existing
                .into_iter()
                .filter(|(name, _)| Identity::new(name.as_str()).is_err())
                .collect(),
            Ok(None) | Err(DatasetError::IndexCorrupt { .. }) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        for (identity, encodings) in dataset.iter() {
            let dir = self.identity_dir(identity);
            fs::create_dir_all(&dir).map_err(|source| io_error(&dir, source))?;
            if self.policy == StaleFilePolicy::Prune {
                self.prune_stale(&dir, encodings.len())?;
            }
            for (position, encoding) in encodings.iter().enumerate() {
                write_encoding(&dir.join(format!("{position}.{ENCODING_FILE_EXT}")), encoding)?;
            }
            let metadata = dataset
                .metadata(identity)
                .cloned()
                .unwrap_or_else(empty_metadata);
            index.insert(identity.as_str().to_string(), metadata);
        }
        self.write_index(&index)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> DatasetError {
    DatasetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_encoding<E: Serialize>(path: &Path, encoding: &E) -> Result<(), DatasetError> {
    let bytes = bincode::serialize(&EncodingRecordRef { face: encoding }).map_err(|source| {
        DatasetError::Encode {
            path: path.to_path_buf(),
            source: source.into(),
        }
    })?;
    fs::write(path, bytes).map_err(|source| io_error(path, source))
}

fn read_encoding<E: DeserializeOwned>(path: &Path) -> Result<E, Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    let record: EncodingRecord<E> = bincode::deserialize(&bytes)?;
    Ok(record.face)
}

/// Writes through a `.part` sibling and renames so readers never see a
/// half-written file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
    }
    let part = path.with_extension("json.part");
    fs::write(&part, bytes).map_err(|source| io_error(&part, source))?;
    fs::rename(&part, path).map_err(|source| io_error(path, source))
}
