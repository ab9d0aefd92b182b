use std::num::NonZeroU32;

use crate::sampling::frame_sampler::SamplerError;

/// Stride between fully processed frames.
///
/// A frame at zero-based index `i` is sampled iff `i % fps == 0`, so the
/// first frame is always sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleInterval(NonZeroU32);

impl SampleInterval {
    pub fn new(fps: u32) -> Result<Self, SamplerError> {
        NonZeroU32::new(fps)
            .map(Self)
            .ok_or_else(|| SamplerError::ConfigInvalid(format!("fps must be >= 1, got {fps}")))
    }

    pub fn fps(&self) -> u32 {
        self.0.get()
    }

    pub fn is_sampled(&self, index: usize) -> bool {
        index % self.0.get() as usize == 0
    }

    /// Number of sampled indices in `0..frames`.
    pub fn sampled_count(&self, frames: usize) -> usize {
        if frames == 0 {
            0
        } else {
            (frames - 1) / self.0.get() as usize + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_zero_is_config_error() {
        assert!(matches!(
            SampleInterval::new(0),
            Err(SamplerError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_is_sampled_on_multiples() {
        let interval = SampleInterval::new(3).unwrap();
        let sampled: Vec<usize> = (0..10).filter(|&i| interval.is_sampled(i)).collect();
        assert_eq!(sampled, vec![0, 3, 6, 9]);
    }

    #[test]
    fn test_interval_one_samples_everything() {
        let interval = SampleInterval::new(1).unwrap();
        assert!((0..50).all(|i| interval.is_sampled(i)));
    }

    #[rstest]
    #[case(0, 2, 0)]
    #[case(1, 5, 1)]
    #[case(6, 2, 3)]
    #[case(7, 2, 4)]
    #[case(9, 3, 3)]
    #[case(10, 3, 4)]
    fn test_sampled_count_matches_modulo_rule(
        #[case] frames: usize,
        #[case] fps: u32,
        #[case] expected: usize,
    ) {
        let interval = SampleInterval::new(fps).unwrap();
        assert_eq!(interval.sampled_count(frames), expected);
        assert_eq!((0..frames).filter(|&i| interval.is_sampled(i)).count(), expected);
    }
}
