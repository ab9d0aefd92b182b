use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::sampling::sample_interval::SampleInterval;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_source::VideoSource;

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("video source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("invalid sampling configuration: {0}")]
    ConfigInvalid(String),
}

/// What a completed [`FrameSampler::run`] observed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SamplerSummary {
    pub frames_read: usize,
    pub frames_sampled: usize,
    /// The source failed mid-stream and the run stopped there.
    pub ended_by_read_error: bool,
}

/// Walks a video source frame by frame and dispatches each frame to two
/// callbacks: one for every frame, one only for sampled frames.
///
/// Callbacks receive `(frame, index, total)` where `total` is `None` while
/// the source cannot report a frame count. Both run synchronously on the
/// caller's thread, every-frame first, before the next frame is pulled.
pub struct FrameSampler {
    source: Box<dyn VideoSource>,
    interval: SampleInterval,
    metadata: VideoMetadata,
}

impl FrameSampler {
    /// Opens `path` on `source`. Failure surfaces here, before any frame
    /// is read.
    pub fn open(
        mut source: Box<dyn VideoSource>,
        path: &Path,
        interval: SampleInterval,
    ) -> Result<Self, SamplerError> {
        let metadata = source
            .open(path)
            .map_err(|source| SamplerError::SourceUnavailable {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!(
            "Opened {} ({}x{}, {} frames, sampling every {} frame(s))",
            path.display(),
            metadata.width,
            metadata.height,
            metadata
                .total_frames
                .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
            interval.fps()
        );
        Ok(Self {
            source,
            interval,
            metadata,
        })
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    pub fn interval(&self) -> SampleInterval {
        self.interval
    }

    /// Pulls frames until end of stream.
    ///
    /// A read error mid-stream ends the run like end of stream does. An
    /// error returned by either callback stops the run and is propagated.
    /// The source is closed in every case.
    pub fn run<F, S>(
        mut self,
        mut on_every_frame: F,
        mut on_sampled_frame: S,
    ) -> Result<SamplerSummary, Box<dyn std::error::Error>>
    where
        F: FnMut(&Frame, usize, Option<usize>) -> Result<(), Box<dyn std::error::Error>>,
        S: FnMut(&Frame, usize, Option<usize>) -> Result<(), Box<dyn std::error::Error>>,
    {
        let result = self.dispatch_all(&mut on_every_frame, &mut on_sampled_frame);
        self.source.close();
        result
    }

    fn dispatch_all<F, S>(
        &mut self,
        on_every_frame: &mut F,
        on_sampled_frame: &mut S,
    ) -> Result<SamplerSummary, Box<dyn std::error::Error>>
    where
        F: FnMut(&Frame, usize, Option<usize>) -> Result<(), Box<dyn std::error::Error>>,
        S: FnMut(&Frame, usize, Option<usize>) -> Result<(), Box<dyn std::error::Error>>,
    {
        let mut summary = SamplerSummary::default();

        loop {
            let frame = match self.source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    log::warn!(
                        "Read failed after {} frames, treating as end of stream: {e}",
                        summary.frames_read
                    );
                    summary.ended_by_read_error = true;
                    break;
                }
            };

            let index = self.source.position().unwrap_or(summary.frames_read);
            let total = self.source.frame_count();
            summary.frames_read += 1;

            on_every_frame(&frame, index, total)?;

            if self.interval.is_sampled(index) {
                summary.frames_sampled += 1;
                on_sampled_frame(&frame, index, total)?;
            }
        }

        log::debug!(
            "Sampler finished: {} read, {} sampled",
            summary.frames_read,
            summary.frames_sampled
        );
        Ok(summary)
    }
}
