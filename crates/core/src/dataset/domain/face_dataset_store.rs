use crate::dataset::domain::dataset::{Dataset, FaceEncoding};
use crate::dataset::domain::dataset_repository::{DatasetError, DatasetRepository};
use crate::dataset::domain::identity::Identity;

/// Lifecycle of a [`FaceDatasetStore`].
///
/// `Loaded` and `Modified` behave identically; `Saved` is not terminal and
/// the store may be mutated and saved again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreState {
    Empty,
    Loaded,
    Modified,
    Saved,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Whether a name index existed at all.
    pub index_found: bool,
    pub identities: usize,
    pub encodings: usize,
    pub skipped_records: usize,
}

/// In-memory face dataset with explicit load and save.
///
/// Mutation never touches storage; [`save`] rewrites the whole dataset.
/// Not synchronized: a single writer owns the store.
///
/// [`save`]: FaceDatasetStore::save
pub struct FaceDatasetStore<E = FaceEncoding> {
    dataset: Dataset<E>,
    repository: Box<dyn DatasetRepository<E>>,
    state: StoreState,
}

impl<E> FaceDatasetStore<E> {
    pub fn new(repository: Box<dyn DatasetRepository<E>>) -> Self {
        Self {
            dataset: Dataset::new(),
            repository,
            state: StoreState::Empty,
        }
    }

    /// Replaces the in-memory dataset with the persisted one.
    ///
    /// A missing index yields an empty dataset; corrupt records are
    /// skipped by the repository and counted in the summary.
    pub fn load(&mut self) -> Result<LoadSummary, DatasetError> {
        let summary = match self.repository.load()? {
            Some(loaded) => {
                self.dataset = loaded.dataset;
                LoadSummary {
                    index_found: true,
                    identities: self.dataset.len(),
                    encodings: self.dataset.encoding_count(),
                    skipped_records: loaded.skipped_records,
                }
            }
            None => {
                log::info!("No name index found, starting with an empty dataset");
                self.dataset = Dataset::new();
                LoadSummary::default()
            }
        };
        if summary.skipped_records > 0 {
            log::warn!(
                "Skipped {} unreadable encoding record(s)",
                summary.skipped_records
            );
        }
        log::info!(
            "Loaded {} identities with {} encodings",
            summary.identities,
            summary.encodings
        );
        self.state = StoreState::Loaded;
        Ok(summary)
    }

    pub fn add_encoding(&mut self, identity: Identity, encoding: E) {
        self.dataset.add_encoding(identity, encoding);
        self.state = StoreState::Modified;
    }

    /// Persists every identity and the name index. On error, files already
    /// written stay on disk and the store remains unsaved.
    pub fn save(&mut self) -> Result<(), DatasetError> {
        self.repository.save(&self.dataset)?;
        log::info!(
            "Saved {} identities with {} encodings",
            self.dataset.len(),
            self.dataset.encoding_count()
        );
        self.state = StoreState::Saved;
        Ok(())
    }

    pub fn dataset(&self) -> &Dataset<E> {
        &self.dataset
    }

    /// Mutable access for edits beyond appending; marks the store modified.
    pub fn dataset_mut(&mut self) -> &mut Dataset<E> {
        self.state = StoreState::Modified;
        &mut self.dataset
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.state == StoreState::Modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::domain::dataset::empty_metadata;
    use crate::dataset::domain::dataset_repository::LoadedDataset;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct InMemoryRepository {
        persisted: Arc<Mutex<Option<Dataset<u32>>>>,
        skipped: usize,
        fail_save: bool,
    }

    impl DatasetRepository<u32> for InMemoryRepository {
        fn load(&self) -> Result<Option<LoadedDataset<u32>>, DatasetError> {
            Ok(self
                .persisted
                .lock()
                .unwrap()
                .clone()
                .map(|dataset| LoadedDataset {
                    dataset,
                    skipped_records: self.skipped,
                }))
        }

        fn save(&self, dataset: &Dataset<u32>) -> Result<(), DatasetError> {
            if self.fail_save {
                return Err(DatasetError::Io {
                    path: PathBuf::from("faces"),
                    source: std::io::Error::other("disk full"),
                });
            }
            *self.persisted.lock().unwrap() = Some(dataset.clone());
            Ok(())
        }
    }

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = FaceDatasetStore::new(Box::new(InMemoryRepository::default()));
        assert_eq!(store.state(), StoreState::Empty);
        assert!(store.dataset().is_empty());
    }

    #[test]
    fn test_load_without_index_is_empty_not_error() {
        let mut store = FaceDatasetStore::new(Box::new(InMemoryRepository::default()));
        let summary = store.load().unwrap();
        assert!(!summary.index_found);
        assert_eq!(store.state(), StoreState::Loaded);
        assert!(store.dataset().is_empty());
    }

    #[test]
    fn test_load_empty_index_is_distinguishable_from_missing() {
        let repo = InMemoryRepository::default();
        *repo.persisted.lock().unwrap() = Some(Dataset::new());
        let mut store = FaceDatasetStore::new(Box::new(repo));
        let summary = store.load().unwrap();
        assert!(summary.index_found);
        assert_eq!(summary.identities, 0);
    }

    #[test]
    fn test_load_reports_counts_and_skips() {
        let mut persisted = Dataset::new();
        persisted.add_encoding(id("alice"), 1);
        persisted.add_encoding(id("alice"), 2);
        persisted.insert_identity(id("bob"), empty_metadata());
        let repo = InMemoryRepository {
            persisted: Arc::new(Mutex::new(Some(persisted))),
            skipped: 1,
            fail_save: false,
        };

        let mut store = FaceDatasetStore::new(Box::new(repo));
        let summary = store.load().unwrap();
        assert_eq!(
            summary,
            LoadSummary {
                index_found: true,
                identities: 2,
                encodings: 2,
                skipped_records: 1,
            }
        );
        assert_eq!(store.dataset().encodings(&id("bob")), Some(&[][..]));
    }

    #[test]
    fn test_state_transitions() {
        let mut store = FaceDatasetStore::new(Box::new(InMemoryRepository::default()));
        store.load().unwrap();
        assert!(!store.has_unsaved_changes());

        store.add_encoding(id("alice"), 7);
        assert_eq!(store.state(), StoreState::Modified);
        assert!(store.has_unsaved_changes());

        store.save().unwrap();
        assert_eq!(store.state(), StoreState::Saved);

        store.add_encoding(id("alice"), 8);
        assert_eq!(store.state(), StoreState::Modified);
        store.save().unwrap();
        assert_eq!(store.state(), StoreState::Saved);
    }

    #[test]
    fn test_add_encoding_does_no_io() {
        let repo = InMemoryRepository::default();
        let persisted = repo.persisted.clone();
        let mut store = FaceDatasetStore::new(Box::new(repo));
        store.add_encoding(id("alice"), 1);
        assert!(persisted.lock().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let repo = InMemoryRepository::default();
        let mut store = FaceDatasetStore::new(Box::new(repo.clone()));
        store.add_encoding(id("alice"), 1);
        store.add_encoding(id("alice"), 2);
        store.add_encoding(id("bob"), 3);
        store.save().unwrap();

        let mut reloaded = FaceDatasetStore::new(Box::new(repo));
        reloaded.load().unwrap();
        assert_eq!(reloaded.dataset(), store.dataset());
    }

    #[test]
    fn test_load_replaces_unsaved_changes() {
        let repo = InMemoryRepository::default();
        let mut store = FaceDatasetStore::new(Box::new(repo));
        store.add_encoding(id("temp"), 1);
        store.load().unwrap();
        assert!(store.dataset().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_store_modified() {
        let repo = InMemoryRepository {
            fail_save: true,
            ..Default::default()
        };
        let mut store = FaceDatasetStore::new(Box::new(repo));
        store.add_encoding(id("alice"), 1);
        assert!(matches!(store.save(), Err(DatasetError::Io { .. })));
        assert_eq!(store.state(), StoreState::Modified);
    }
}
