use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AnalyzerConfig;
use crate::services::aggregator::{FAKE_THRESHOLD, ScoreAccumulator, Verdict};
use crate::services::classifier::FakeClassifier;
use crate::services::decoder::FrameSource;
use crate::services::preprocess::{INPUT_SIZE, preprocess_frame};
use crate::services::sampler::{FRAMES_TO_SAMPLE, sample_interval, sample_positions};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No frames could be processed")]
    NoFramesProcessed,

    #[error("Decoder error: {0}")]
    Decode(anyhow::Error),

    #[error("Classifier error: {0}")]
    Classifier(anyhow::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Tunables for a single analysis run
#[derive(Debug, Clone, Copy)]
pub struct AnalysisSettings {
    pub frames_to_sample: usize,
    pub input_size: u32,
    pub fake_threshold: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            frames_to_sample: FRAMES_TO_SAMPLE,
            input_size: INPUT_SIZE,
            fake_threshold: FAKE_THRESHOLD,
        }
    }
}

impl From<&AnalyzerConfig> for AnalysisSettings {
    fn from(config: &AnalyzerConfig) -> Self {
        Self {
            frames_to_sample: config.frames_to_sample,
            input_size: config.input_size,
            fake_threshold: config.fake_threshold,
        }
    }
}

/// Samples a video, scores each frame and folds the scores into a verdict
pub struct DeepfakeAnalyzer {
    source: Arc<dyn FrameSource>,
    classifier: Arc<dyn FakeClassifier>,
    settings: AnalysisSettings,
}

impl DeepfakeAnalyzer {
    pub fn new(
        source: Arc<dyn FrameSource>,
        classifier: Arc<dyn FakeClassifier>,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            source,
            classifier,
            settings,
        }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn classifier_name(&self) -> String {
        self.classifier.describe()
    }

    pub async fn analyze(&self, path: &Path) -> Result<Verdict, AnalysisError> {
        let total_frames = self
            .source
            .frame_count(path)
            .await
            .map_err(AnalysisError::Decode)?;
        let target = self.settings.frames_to_sample;

        info!(
            path = %path.display(),
            total_frames,
            interval = sample_interval(total_frames, target),
            "Sampling {} frames",
            target
        );

        let mut scores = ScoreAccumulator::new();

        for position in sample_positions(total_frames, target) {
            let frame = match self
                .source
                .read_frame(path, position.index)
                .await
                .map_err(AnalysisError::Decode)?
            {
                Some(frame) => frame,
                None => {
                    debug!(index = position.index, "skipping unreadable frame");
                    continue;
                }
            };

            let classifier = Arc::clone(&self.classifier);
            let size = self.settings.input_size;
            let probability = tokio::task::spawn_blocking(move || {
                let tensor = preprocess_frame(&frame, size);
                classifier.predict(&tensor)
            })
            .await?
            .map_err(AnalysisError::Classifier)?;

            scores.push(position.ordinal, probability);
        }

        let processed = scores.len();
        let verdict = scores
            .finish(self.settings.fake_threshold)
            .ok_or(AnalysisError::NoFramesProcessed)?;

        info!(
            processed,
            confidence = verdict.confidence,
            status = ?verdict.status,
            "Analysis complete"
        );

        Ok(verdict)
    }
}
