use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Sequential cursor over the frames of a video.
///
/// Implementations handle codec and container details while the sampler
/// only sees `Frame`s and positions. Position and count are queried live
/// after every read; neither may be cached by callers.
pub trait VideoSource: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns the next frame in decode order, or `Ok(None)` at end of stream.
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Zero-based index of the frame most recently returned by [`read`],
    /// or `None` before the first read.
    ///
    /// [`read`]: VideoSource::read
    fn position(&self) -> Option<usize>;

    /// Total number of frames, or `None` while the source cannot tell.
    fn frame_count(&self) -> Option<usize>;

    /// Releases any resources held by the source.
    fn close(&mut self);
}
