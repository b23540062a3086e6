/// Default number of frames sampled from each video
pub const FRAMES_TO_SAMPLE: usize = 30;

/// A frame the sampler wants read from the video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePosition {
    /// 1-based sampling attempt number, reported back as `frame`
    pub ordinal: usize,
    /// Absolute 0-based frame index to seek to
    pub index: u64,
}

/// Distance between sampled frames. Collapses to 1 for short or
/// unknown-length videos.
pub fn sample_interval(total_frames: u64, target: usize) -> u64 {
    if target == 0 {
        return 1;
    }
    (total_frames / target as u64).max(1)
}

/// Evenly spaced positions `0, interval, 2 * interval, ...`.
///
/// Positions are never clamped to `total_frames`: when the container reports
/// fewer frames than `target`, the trailing positions point past the end and
/// are expected to fail at read time.
pub fn sample_positions(total_frames: u64, target: usize) -> Vec<FramePosition> {
    let interval = sample_interval(total_frames, target);
    (0..target)
        .map(|i| FramePosition {
            ordinal: i + 1,
            index: i as u64 * interval,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(total: u64) -> Vec<u64> {
        sample_positions(total, FRAMES_TO_SAMPLE)
            .into_iter()
            .map(|p| p.index)
            .collect()
    }

    #[test]
    fn test_interval() {
        assert_eq!(sample_interval(300, 30), 10);
        assert_eq!(sample_interval(329, 30), 10);
        assert_eq!(sample_interval(30, 30), 1);
        assert_eq!(sample_interval(29, 30), 1);
        assert_eq!(sample_interval(0, 30), 1);
        assert_eq!(sample_interval(100, 0), 1);
    }

    #[test]
    fn test_long_video_is_evenly_spaced() {
        let expected: Vec<u64> = (0..30).map(|i| i * 10).collect();
        assert_eq!(indices(300), expected);
        assert_eq!(*indices(300).last().unwrap(), 290);
    }

    #[test]
    fn test_short_video_walks_consecutive_frames() {
        let expected: Vec<u64> = (0..30).collect();
        assert_eq!(indices(10), expected);
        assert_eq!(indices(0), expected);
    }

    #[test]
    fn test_ordinals_are_one_based() {
        let positions = sample_positions(90, 30);
        assert_eq!(positions.len(), 30);
        assert_eq!(positions[0], FramePosition { ordinal: 1, index: 0 });
        assert_eq!(positions[29], FramePosition { ordinal: 30, index: 87 });
    }

    #[test]
    fn test_zero_target_samples_nothing() {
        assert!(sample_positions(300, 0).is_empty());
    }
}
