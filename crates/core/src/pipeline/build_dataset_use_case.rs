use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::dataset::domain::dataset_repository::DatasetError;
use crate::dataset::domain::face_dataset_store::FaceDatasetStore;
use crate::dataset::domain::identity::Identity;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_matcher::FaceMatcher;
use crate::pipeline::detection_snapshot::DetectionSnapshotWriter;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::sampling::frame_sampler::{FrameSampler, SamplerSummary};
use crate::sampling::sample_interval::SampleInterval;
use crate::settings::Settings;
use crate::shared::data_layout::DataLayout;
use crate::shared::file_naming::file_stem;
use crate::video::domain::video_source::VideoSource;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Every detected face is stored under `identity`.
    Training { identity: Identity },
    /// Detected faces are labeled against the stored dataset only.
    Recognition,
}

#[derive(Clone, Debug)]
pub struct BuildDatasetConfig {
    pub video_path: PathBuf,
    pub interval: SampleInterval,
    pub mode: RunMode,
    pub show: bool,
}

impl BuildDatasetConfig {
    /// Resolves settings against `layout`. In training mode the identity
    /// is `identity` if given, else the video file stem.
    pub fn from_settings(
        settings: &Settings,
        layout: &DataLayout,
        identity: Option<&str>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        settings.validate()?;
        let video_path = layout.video_path(&settings.video_name);
        let mode = if settings.training {
            RunMode::Training {
                identity: training_identity(identity, &video_path)?,
            }
        } else {
            RunMode::Recognition
        };
        Ok(Self {
            interval: SampleInterval::new(settings.fps)?,
            video_path,
            mode,
            show: settings.show,
        })
    }
}

pub fn training_identity(
    explicit: Option<&str>,
    video_path: &Path,
) -> Result<Identity, DatasetError> {
    match explicit {
        Some(name) => Identity::new(name),
        None => Identity::new(file_stem(video_path).unwrap_or_default()),
    }
}

/// What one run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sampler: SamplerSummary,
    pub faces_detected: usize,
    pub encodings_added: usize,
    pub faces_recognized: usize,
    pub snapshots_saved: usize,
    pub dataset_saved: bool,
}

/// Driver loop: load the dataset, sample the video, detect faces on
/// sampled frames, then save the dataset when training.
///
/// Single-use: `execute` takes the video source, so a second call fails.
pub struct BuildDatasetUseCase {
    source: Option<Box<dyn VideoSource>>,
    detector: Box<dyn FaceDetector>,
    store: FaceDatasetStore,
    matcher: FaceMatcher,
    snapshots: Option<DetectionSnapshotWriter>,
    logger: Box<dyn PipelineLogger>,
}

impl BuildDatasetUseCase {
    pub fn new(
        source: Box<dyn VideoSource>,
        detector: Box<dyn FaceDetector>,
        store: FaceDatasetStore,
        matcher: FaceMatcher,
        snapshots: Option<DetectionSnapshotWriter>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source: Some(source),
            detector,
            store,
            matcher,
            snapshots,
            logger,
        }
    }

    pub fn store(&self) -> &FaceDatasetStore {
        &self.store
    }

    pub fn execute(
        &mut self,
        config: &BuildDatasetConfig,
    ) -> Result<RunReport, Box<dyn std::error::Error>> {
        let source = self.source.take().ok_or("BuildDatasetUseCase already executed")?;

        let loaded = self.store.load()?;
        self.logger.info(&format!(
            "Known faces: {} identities, {} encodings",
            loaded.identities, loaded.encodings
        ));

        let sampler = FrameSampler::open(source, &config.video_path, config.interval)?;

        let mut report = RunReport::default();
        let logger = RefCell::new(&mut self.logger);
        let detector = &mut self.detector;
        let store = &mut self.store;
        let matcher = &self.matcher;
        let snapshots = self.snapshots.as_ref();

        let summary = sampler.run(
            |_, index, total| {
                logger.borrow_mut().progress(index, total);
                Ok(())
            },
            |frame, index, _| {
                let t0 = Instant::now();
                let mut faces = detector.detect(frame)?;
                let mut logger = logger.borrow_mut();
                logger.timing("detect", t0.elapsed().as_secs_f64() * 1000.0);
                logger.metric("faces", faces.len() as f64);
                report.faces_detected += faces.len();

                match &config.mode {
                    RunMode::Training { identity } => {
                        for face in faces.iter_mut() {
                            store.add_encoding(identity.clone(), face.encoding.clone());
                            face.identity_hint = Some(identity.to_string());
                        }
                        report.encodings_added += faces.len();
                    }
                    RunMode::Recognition => {
                        matcher.label(store.dataset(), &mut faces);
                        report.faces_recognized +=
                            faces.iter().filter(|f| f.identity_hint.is_some()).count();
                    }
                }

                if config.show {
                    for face in &faces {
                        let b = face.bounding_box;
                        log::info!(
                            "Frame {index}: {} at ({}, {}) {}x{}",
                            face.label(),
                            b.x,
                            b.y,
                            b.width,
                            b.height
                        );
                    }
                }

                if let Some(snapshots) = snapshots.filter(|_| !faces.is_empty()) {
                    let t0 = Instant::now();
                    snapshots.save(frame, &faces)?;
                    logger.timing("snapshot", t0.elapsed().as_secs_f64() * 1000.0);
                    report.snapshots_saved += 1;
                }
                Ok(())
            },
        )?;
        report.sampler = summary;

        if report.sampler.ended_by_read_error {
            self.logger
                .info("Video ended early on a read error; keeping frames read so far");
        }

        if let RunMode::Training { identity } = &config.mode {
            self.store.save()?;
            report.dataset_saved = true;
            self.logger.info(&format!(
                "Added {} encodings for {identity}",
                report.encodings_added
            ));
        }

        self.logger.summary();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::domain::dataset::{Dataset, FaceEncoding};
    use crate::dataset::domain::dataset_repository::{DatasetRepository, LoadedDataset};
    use crate::detection::domain::detected_face::DetectedFace;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::frame::Frame;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::video::domain::image_writer::ImageWriter;
    use std::sync::{Arc, Mutex};

    struct StubSource {
        frames: usize,
        next: usize,
    }

    impl VideoSource for StubSource {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(VideoMetadata {
                width: 8,
                height: 8,
                fps: 25.0,
                total_frames: Some(self.frames),
                codec: String::new(),
                source_path: Some(path.to_path_buf()),
            })
        }

        fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            if self.next == self.frames {
                return Ok(None);
            }
            self.next += 1;
            Ok(Some(Frame::new(vec![0u8; 8 * 8 * 3], 8, 8, 3, self.next - 1)))
        }

        fn position(&self) -> Option<usize> {
            self.next.checked_sub(1)
        }

        fn frame_count(&self) -> Option<usize> {
            Some(self.frames)
        }

        fn close(&mut self) {}
    }

    /// One face per frame whose encoding is `[1, 0]`, plus records the
    /// frame indices it was asked about.
    struct StubDetector {
        seen: Arc<Mutex<Vec<usize>>>,
        fail: bool,
    }

    impl FaceDetector for StubDetector {
        fn detect(
            &mut self,
            frame: &Frame,
        ) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
            if self.fail {
                return Err("model crashed".into());
            }
            self.seen.lock().unwrap().push(frame.index());
            Ok(vec![DetectedFace::unlabeled(
                vec![1.0, 0.0],
                BoundingBox::new(1, 1, 4, 4),
            )])
        }
    }

    #[derive(Clone, Default)]
    struct InMemoryRepository {
        persisted: Arc<Mutex<Option<Dataset<FaceEncoding>>>>,
        saves: Arc<Mutex<usize>>,
    }

    impl DatasetRepository<FaceEncoding> for InMemoryRepository {
        fn load(&self) -> Result<Option<LoadedDataset<FaceEncoding>>, DatasetError> {
            Ok(self.persisted.lock().unwrap().clone().map(|dataset| LoadedDataset {
                dataset,
                skipped_records: 0,
            }))
        }

        fn save(&self, dataset: &Dataset<FaceEncoding>) -> Result<(), DatasetError> {
            *self.persisted.lock().unwrap() = Some(dataset.clone());
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct CountingWriter(Arc<Mutex<usize>>);

    impl ImageWriter for CountingWriter {
        fn write(&self, path: &Path, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            std::fs::write(path, b"")?;
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    fn use_case(
        frames: usize,
        repo: &InMemoryRepository,
        seen: &Arc<Mutex<Vec<usize>>>,
    ) -> BuildDatasetUseCase {
        BuildDatasetUseCase::new(
            Box::new(StubSource { frames, next: 0 }),
            Box::new(StubDetector {
                seen: seen.clone(),
                fail: false,
            }),
            FaceDatasetStore::new(Box::new(repo.clone())),
            FaceMatcher::default(),
            None,
            Box::new(NullPipelineLogger),
        )
    }

    fn config(fps: u32, mode: RunMode) -> BuildDatasetConfig {
        BuildDatasetConfig {
            video_path: PathBuf::from("clip.mp4"),
            interval: SampleInterval::new(fps).unwrap(),
            mode,
            show: true,
        }
    }

    #[test]
    fn test_training_detects_on_sampled_frames_and_saves() {
        let repo = InMemoryRepository::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut uc = use_case(6, &repo, &seen);

        let report = uc
            .execute(&config(2, RunMode::Training { identity: id("alice") }))
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 2, 4]);
        assert_eq!(report.sampler.frames_read, 6);
        assert_eq!(report.encodings_added, 3);
        assert!(report.dataset_saved);
        let persisted = repo.persisted.lock().unwrap().clone().unwrap();
        assert_eq!(persisted.encodings(&id("alice")).map(|e| e.len()), Some(3));
    }

    #[test]
    fn test_training_appends_to_loaded_dataset() {
        let repo = InMemoryRepository::default();
        let mut existing = Dataset::new();
        existing.add_encoding(id("alice"), vec![0.5, 0.5]);
        existing.add_encoding(id("bob"), vec![0.0, 1.0]);
        *repo.persisted.lock().unwrap() = Some(existing);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut uc = use_case(3, &repo, &seen);
        uc.execute(&config(1, RunMode::Training { identity: id("alice") }))
            .unwrap();

        let persisted = repo.persisted.lock().unwrap().clone().unwrap();
        let alice = persisted.encodings(&id("alice")).unwrap();
        assert_eq!(alice.len(), 4);
        assert_eq!(alice[0], vec![0.5, 0.5]);
        assert_eq!(persisted.encodings(&id("bob")).map(|e| e.len()), Some(1));
    }

    #[test]
    fn test_recognition_labels_without_saving() {
        let repo = InMemoryRepository::default();
        let mut existing = Dataset::new();
        existing.add_encoding(id("carol"), vec![0.9, 0.1]);
        *repo.persisted.lock().unwrap() = Some(existing);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut uc = use_case(4, &repo, &seen);
        let report = uc.execute(&config(2, RunMode::Recognition)).unwrap();

        assert_eq!(report.faces_detected, 2);
        assert_eq!(report.faces_recognized, 2);
        assert_eq!(report.encodings_added, 0);
        assert!(!report.dataset_saved);
        assert_eq!(*repo.saves.lock().unwrap(), 0);
    }

    #[test]
    fn test_detector_error_aborts_without_saving() {
        let repo = InMemoryRepository::default();
        let mut uc = BuildDatasetUseCase::new(
            Box::new(StubSource { frames: 4, next: 0 }),
            Box::new(StubDetector {
                seen: Arc::new(Mutex::new(Vec::new())),
                fail: true,
            }),
            FaceDatasetStore::new(Box::new(repo.clone())),
            FaceMatcher::default(),
            None,
            Box::new(NullPipelineLogger),
        );
        let result = uc.execute(&config(1, RunMode::Training { identity: id("alice") }));
        assert!(result.is_err());
        assert_eq!(*repo.saves.lock().unwrap(), 0);
    }

    #[test]
    fn test_snapshots_saved_for_frames_with_faces() {
        let tmp = tempfile::TempDir::new().unwrap();
        let count = Arc::new(Mutex::new(0));
        let repo = InMemoryRepository::default();
        let mut uc = BuildDatasetUseCase::new(
            Box::new(StubSource { frames: 5, next: 0 }),
            Box::new(StubDetector {
                seen: Arc::new(Mutex::new(Vec::new())),
                fail: false,
            }),
            FaceDatasetStore::new(Box::new(repo)),
            FaceMatcher::default(),
            Some(DetectionSnapshotWriter::new(
                Box::new(CountingWriter(count.clone())),
                tmp.path().join("out"),
            )),
            Box::new(NullPipelineLogger),
        );
        let report = uc.execute(&config(2, RunMode::Recognition)).unwrap();
        assert_eq!(report.snapshots_saved, 3);
        assert_eq!(*count.lock().unwrap(), 3);
        assert!(tmp.path().join("out").join("2.png").exists());
    }

    #[test]
    fn test_execute_twice_fails() {
        let repo = InMemoryRepository::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut uc = use_case(1, &repo, &seen);
        uc.execute(&config(1, RunMode::Recognition)).unwrap();
        assert!(uc.execute(&config(1, RunMode::Recognition)).is_err());
    }

    #[test]
    fn test_config_from_settings() {
        let layout = DataLayout::new("data");
        let settings = Settings {
            training: true,
            video_name: "holiday.mp4".into(),
            fps: 3,
            ..Settings::default()
        };

        let cfg = BuildDatasetConfig::from_settings(&settings, &layout, None).unwrap();
        assert_eq!(cfg.video_path, PathBuf::from("data/video/holiday.mp4"));
        assert_eq!(cfg.interval.fps(), 3);
        assert_eq!(cfg.mode, RunMode::Training { identity: id("holiday") });

        let cfg = BuildDatasetConfig::from_settings(&settings, &layout, Some("dan")).unwrap();
        assert_eq!(cfg.mode, RunMode::Training { identity: id("dan") });

        let recognition = Settings::default();
        let cfg = BuildDatasetConfig::from_settings(&recognition, &layout, Some("dan")).unwrap();
        assert_eq!(cfg.mode, RunMode::Recognition);
    }

    #[test]
    fn test_config_rejects_zero_fps() {
        let settings = Settings {
            fps: 0,
            ..Settings::default()
        };
        let layout = DataLayout::new("data");
        assert!(BuildDatasetConfig::from_settings(&settings, &layout, None).is_err());
    }
}
