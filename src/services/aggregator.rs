use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Mean confidence (percent) above which a video is considered FAKE
pub const FAKE_THRESHOLD: f64 = 50.0;

/// Canned explanation attached to every verdict. Not derived from the frames.
pub const REASONS: [&str; 4] = [
    "Facial flickering detected",
    "Artifacts in compressed frames",
    "Unnatural blink patterns",
    "Lighting inconsistencies across frames",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    Real,
    Fake,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FrameScore {
    /// 1-based sampling attempt that produced this score
    pub frame: usize,
    /// Fake-probability as a percentage, rounded to 2 decimals
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub status: VerdictStatus,
    /// Mean per-frame confidence, rounded to 2 decimals
    pub confidence: f64,
    pub per_frame: Vec<FrameScore>,
    pub reasons: Vec<String>,
}

/// Collects classifier output in sampling order
#[derive(Debug, Default)]
pub struct ScoreAccumulator {
    per_frame: Vec<FrameScore>,
    raw: Vec<f64>,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the probability (0..=1) produced for sampling attempt `ordinal`
    pub fn push(&mut self, ordinal: usize, probability: f32) {
        let confidence = probability as f64 * 100.0;
        self.per_frame.push(FrameScore {
            frame: ordinal,
            confidence: round2(confidence),
        });
        self.raw.push(confidence);
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Average the collected scores. Returns `None` if nothing was scored.
    pub fn finish(self, threshold: f64) -> Option<Verdict> {
        if self.raw.is_empty() {
            return None;
        }

        let mean = self.raw.iter().sum::<f64>() / self.raw.len() as f64;

        // The label uses the exact mean; rounding is only for display
        Some(Verdict {
            status: classify(mean, threshold),
            confidence: round2(mean),
            per_frame: self.per_frame,
            reasons: REASONS.iter().map(|r| r.to_string()).collect(),
        })
    }
}

/// FAKE only when the confidence strictly exceeds the threshold
pub fn classify(confidence: f64, threshold: f64) -> VerdictStatus {
    if confidence > threshold {
        VerdictStatus::Fake
    } else {
        VerdictStatus::Real
    }
}

/// Round to 2 decimals based on the exact binary value, so `2.675`
/// (stored as 2.67499...) becomes 2.67 rather than 2.68.
pub fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.345_6), 12.35);
        assert_eq!(round2(60.000_002), 60.0);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(99.994), 99.99);
        assert_eq!(round2(2.675), 2.67);
        assert_eq!(round2(1.005), 1.0);
    }

    #[test]
    fn test_empty_accumulator_has_no_verdict() {
        let acc = ScoreAccumulator::new();
        assert!(acc.is_empty());
        assert!(acc.finish(FAKE_THRESHOLD).is_none());
    }

    #[test]
    fn test_uniform_sixty_is_fake() {
        let mut acc = ScoreAccumulator::new();
        for i in 1..=30 {
            acc.push(i, 0.6);
        }
        let verdict = acc.finish(FAKE_THRESHOLD).unwrap();
        assert_eq!(verdict.status, VerdictStatus::Fake);
        assert_eq!(verdict.confidence, 60.0);
        assert_eq!(verdict.per_frame.len(), 30);
        assert!(verdict.per_frame.iter().all(|f| f.confidence == 60.0));
    }

    #[test]
    fn test_exact_threshold_is_real() {
        let mut acc = ScoreAccumulator::new();
        acc.push(1, 0.25);
        acc.push(2, 0.75);
        let verdict = acc.finish(FAKE_THRESHOLD).unwrap();
        assert_eq!(verdict.confidence, 50.0);
        assert_eq!(verdict.status, VerdictStatus::Real);
    }

    #[test]
    fn test_mean_just_above_threshold_is_fake() {
        let mut acc = ScoreAccumulator::new();
        acc.push(1, 0.500_04);
        let verdict = acc.finish(FAKE_THRESHOLD).unwrap();
        assert_eq!(verdict.confidence, 50.0);
        assert_eq!(verdict.status, VerdictStatus::Fake);
    }

    #[test]
    fn test_classify_boundary() {
        assert_eq!(classify(50.0, 50.0), VerdictStatus::Real);
        assert_eq!(classify(50.01, 50.0), VerdictStatus::Fake);
        assert_eq!(classify(49.99, 50.0), VerdictStatus::Real);
    }

    #[test]
    fn test_order_and_gaps_are_kept() {
        let mut acc = ScoreAccumulator::new();
        acc.push(1, 0.1);
        acc.push(3, 0.2);
        acc.push(7, 0.3);
        assert_eq!(acc.len(), 3);
        let verdict = acc.finish(FAKE_THRESHOLD).unwrap();
        let frames: Vec<usize> = verdict.per_frame.iter().map(|f| f.frame).collect();
        assert_eq!(frames, vec![1, 3, 7]);
        assert_eq!(verdict.confidence, 20.0);
        assert_eq!(verdict.status, VerdictStatus::Real);
    }

    #[test]
    fn test_mean_uses_unrounded_scores() {
        let mut acc = ScoreAccumulator::new();
        acc.push(1, 0.123_44);
        acc.push(2, 0.123_44);
        acc.push(3, 0.123_44);
        let verdict = acc.finish(FAKE_THRESHOLD).unwrap();
        assert_eq!(verdict.per_frame[0].confidence, 12.34);
        assert_eq!(verdict.confidence, 12.34);
    }

    #[test]
    fn test_reasons_are_static() {
        let mut acc = ScoreAccumulator::new();
        acc.push(1, 0.9);
        let verdict = acc.finish(FAKE_THRESHOLD).unwrap();
        assert_eq!(verdict.reasons, REASONS.to_vec());
    }

    #[test]
    fn test_json_shape() {
        let mut acc = ScoreAccumulator::new();
        acc.push(1, 0.9);
        let json = serde_json::to_value(acc.finish(FAKE_THRESHOLD).unwrap()).unwrap();
        assert_eq!(json["status"], "FAKE");
        assert_eq!(json["perFrame"][0]["frame"], 1);
        assert!(json.get("per_frame").is_none());
        assert_eq!(json["reasons"].as_array().unwrap().len(), 4);
    }
}
