use std::path::PathBuf;

use thiserror::Error;

use crate::dataset::domain::dataset::Dataset;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("invalid identity name {0:?}")]
    InvalidIdentity(String),
    #[error("name index {path} is corrupt: {source}")]
    IndexCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A dataset read back from persistent storage.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedDataset<E> {
    pub dataset: Dataset<E>,
    /// Encoding records that could not be decoded and were left out.
    pub skipped_records: usize,
}

/// Persistence capability behind [`FaceDatasetStore`].
///
/// [`FaceDatasetStore`]: crate::dataset::domain::face_dataset_store::FaceDatasetStore
pub trait DatasetRepository<E>: Send {
    /// Reads the persisted dataset. `Ok(None)` means nothing has been
    /// persisted yet, which is distinct from an empty persisted dataset.
    /// Undecodable records are skipped, never fatal.
    fn load(&self) -> Result<Option<LoadedDataset<E>>, DatasetError>;

    /// Rewrites the persisted state from `dataset`. Writes already made
    /// when an error occurs are not rolled back.
    fn save(&self, dataset: &Dataset<E>) -> Result<(), DatasetError>;
}
