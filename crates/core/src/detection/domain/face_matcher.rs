use crate::dataset::domain::dataset::{Dataset, FaceEncoding};
use crate::dataset::domain::identity::Identity;
use crate::detection::domain::detected_face::DetectedFace;

pub const DEFAULT_THRESHOLD: f64 = 0.4;

#[derive(Clone, Debug, PartialEq)]
pub struct FaceMatch<'a> {
    pub identity: &'a Identity,
    pub similarity: f64,
}

/// Labels encodings with the most similar known identity.
#[derive(Clone, Copy, Debug)]
pub struct FaceMatcher {
    threshold: f64,
}

impl Default for FaceMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl FaceMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Best match across every stored encoding, or `None` if nothing
    /// reaches the threshold. Encodings of a different length never match.
    pub fn best_match<'a>(
        &self,
        dataset: &'a Dataset<FaceEncoding>,
        encoding: &[f32],
    ) -> Option<FaceMatch<'a>> {
        let mut best: Option<FaceMatch<'a>> = None;
        for (identity, known) in dataset.iter() {
            for candidate in known.iter().filter(|c| c.len() == encoding.len()) {
                let similarity = cosine_similarity(candidate, encoding);
                if similarity < self.threshold {
                    continue;
                }
                if best.as_ref().map_or(true, |b| similarity > b.similarity) {
                    best = Some(FaceMatch {
                        identity,
                        similarity,
                    });
                }
            }
        }
        best
    }

    /// Sets `identity_hint` on each face from its best match.
    pub fn label(&self, dataset: &Dataset<FaceEncoding>, faces: &mut [DetectedFace]) {
        for face in faces {
            face.identity_hint = self
                .best_match(dataset, &face.encoding)
                .map(|m| m.identity.to_string());
        }
    }
}

/// Cosine similarity; zero when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;
    use approx::assert_relative_eq;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    fn dataset() -> Dataset<FaceEncoding> {
        let mut ds = Dataset::new();
        ds.add_encoding(id("alice"), vec![1.0, 0.0, 0.0]);
        ds.add_encoding(id("alice"), vec![0.9, 0.1, 0.0]);
        ds.add_encoding(id("bob"), vec![0.0, 1.0, 0.0]);
        ds
    }

    #[test]
    fn test_cosine_similarity_identical() {
        assert_relative_eq!(cosine_similarity(&[0.3, 0.4], &[0.3, 0.4]), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cosine_similarity_is_scale_invariant() {
        assert_relative_eq!(cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        assert_relative_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_best_match_picks_most_similar_identity() {
        let ds = dataset();
        let m = FaceMatcher::default().best_match(&ds, &[0.1, 0.95, 0.0]).unwrap();
        assert_eq!(m.identity.as_str(), "bob");
        assert!(m.similarity > 0.9);
    }

    #[test]
    fn test_below_threshold_is_unknown() {
        let ds = dataset();
        assert!(FaceMatcher::default().best_match(&ds, &[0.0, 0.0, 1.0]).is_none());
    }

    #[test]
    fn test_length_mismatch_never_matches() {
        let ds = dataset();
        assert!(FaceMatcher::new(0.0).best_match(&ds, &[1.0, 0.0]).is_none());
    }

    #[test]
    fn test_label_sets_identity_hints() {
        let ds = dataset();
        let mut faces = vec![
            DetectedFace::unlabeled(vec![1.0, 0.05, 0.0], BoundingBox::new(0, 0, 10, 10)),
            DetectedFace::unlabeled(vec![0.0, 0.0, 1.0], BoundingBox::new(20, 0, 10, 10)),
        ];
        FaceMatcher::default().label(&ds, &mut faces);
        assert_eq!(faces[0].identity_hint.as_deref(), Some("alice"));
        assert_eq!(faces[1].label(), "unknown");
    }
}
