use crate::dataset::domain::dataset::FaceEncoding;
use crate::shared::bounding_box::BoundingBox;

/// One face found in a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedFace {
    /// Name of the matched identity, `None` while unknown.
    pub identity_hint: Option<String>,
    pub encoding: FaceEncoding,
    pub bounding_box: BoundingBox,
}

impl DetectedFace {
    pub fn unlabeled(encoding: FaceEncoding, bounding_box: BoundingBox) -> Self {
        Self {
            identity_hint: None,
            encoding,
            bounding_box,
        }
    }

    pub fn label(&self) -> &str {
        self.identity_hint.as_deref().unwrap_or("unknown")
    }
}
