use std::path::{Path, PathBuf};

use crate::detection::domain::detected_face::DetectedFace;
use crate::shared::constants::{
    DETECTION_COLOR, DETECTION_LABEL_GAP, DETECTION_LABEL_SCALE, DETECTION_RECT_THICKNESS,
    SNAPSHOT_FILE_EXT,
};
use crate::shared::file_naming::next_file_path;
use crate::shared::frame::Frame;
use crate::shared::glyphs::text_size;
use crate::video::domain::image_writer::ImageWriter;

/// Saves annotated frames to numbered files in an output directory.
///
/// Names follow the same next-free-stem rule as encoding files, so
/// snapshots from earlier runs are never overwritten.
pub struct DetectionSnapshotWriter {
    writer: Box<dyn ImageWriter>,
    out_dir: PathBuf,
}

impl DetectionSnapshotWriter {
    pub fn new(writer: Box<dyn ImageWriter>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Draws every face box and label onto a copy of `frame` and writes it.
    pub fn save(
        &self,
        frame: &Frame,
        faces: &[DetectedFace],
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(&self.out_dir)?;
        let path = next_file_path(&self.out_dir, SNAPSHOT_FILE_EXT)?;
        self.writer.write(&path, &annotate(frame, faces))?;
        log::debug!("Saved detection snapshot {}", path.display());
        Ok(path)
    }
}

/// Boxes each face and writes its label underneath, or above the box
/// when there is no room below.
pub fn annotate(frame: &Frame, faces: &[DetectedFace]) -> Frame {
    let mut annotated = frame.clone();
    for face in faces {
        let bbox = &face.bounding_box;
        annotated.draw_rectangle(bbox, DETECTION_COLOR, DETECTION_RECT_THICKNESS);

        let label = face.label();
        let (_, label_height) = text_size(label, DETECTION_LABEL_SCALE);
        let below = bbox.bottom().saturating_add(DETECTION_LABEL_GAP);
        let y = if below.saturating_add(label_height as i32) <= frame.height() as i32 {
            below
        } else {
            bbox.y
                .saturating_sub(DETECTION_LABEL_GAP)
                .saturating_sub(label_height as i32)
                .max(0)
        };
        annotated.draw_text(bbox.x.max(0), y, label, DETECTION_COLOR, DETECTION_LABEL_SCALE);
    }
    annotated
}
