use anyhow::{Context, Result, anyhow};
use std::path::Path;
use tract_onnx::prelude::*;

use crate::services::preprocess::FrameTensor;

/// Anything that can score a preprocessed frame with a fake-probability.
///
/// Implementations are shared across requests behind an `Arc` and must not
/// mutate state between calls.
pub trait FakeClassifier: Send + Sync {
    /// Probability in [0, 1] that the frame is synthetic
    fn predict(&self, frame: &FrameTensor) -> Result<f32>;

    /// Short identifier for logs and the health endpoint
    fn describe(&self) -> String;
}

type RunnableOnnx = TypedRunnableModel<TypedModel>;

/// Pretrained image classifier exported to ONNX and run with tract.
///
/// Expects an NHWC float input of shape `(1, size, size, 3)` and a single
/// sigmoid output.
pub struct OnnxClassifier {
    plan: RunnableOnnx,
    input_size: u32,
    source: String,
}

impl OnnxClassifier {
    /// Load and optimize the model once. Any failure here is fatal to startup.
    pub fn load(path: impl AsRef<Path>, input_size: u32) -> Result<Self> {
        let path = path.as_ref();
        let side = input_size as usize;

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to read model weights from {}", path.display()))?
            .with_input_fact(0, f32::fact([1, side, side, 3]).into())
            .context("model does not accept a (1, H, W, 3) float input")?
            .into_optimized()
            .context("failed to optimize model")?
            .into_runnable()
            .context("failed to build runnable model")?;

        tracing::info!("Loaded classifier from {} ({}x{})", path.display(), side, side);

        Ok(Self {
            plan,
            input_size,
            source: path.display().to_string(),
        })
    }
}

impl FakeClassifier for OnnxClassifier {
    fn predict(&self, frame: &FrameTensor) -> Result<f32> {
        if frame.size() != self.input_size {
            return Err(anyhow!(
                "frame is {}x{}, model expects {}x{}",
                frame.size(),
                frame.size(),
                self.input_size,
                self.input_size
            ));
        }

        let input: Tensor =
            tract_ndarray::Array4::from_shape_vec(frame.shape(), frame.data().to_vec())
                .context("frame tensor shape mismatch")?
                .into();

        let outputs = self.plan.run(tvec!(input.into()))?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let score = output
            .to_array_view::<f32>()?
            .iter()
            .next()
            .copied()
            .ok_or_else(|| anyhow!("model output is empty"))?;

        clamp_probability(score)
    }

    fn describe(&self) -> String {
        format!("onnx:{}", self.source)
    }
}

/// Classifier that returns the same probability for every frame.
/// Useful for dry runs and tests.
pub struct ConstantClassifier(pub f32);

impl FakeClassifier for ConstantClassifier {
    fn predict(&self, _frame: &FrameTensor) -> Result<f32> {
        clamp_probability(self.0)
    }

    fn describe(&self) -> String {
        format!("constant:{}", self.0)
    }
}

fn clamp_probability(score: f32) -> Result<f32> {
    if !score.is_finite() {
        return Err(anyhow!("classifier returned a non-finite score: {}", score));
    }
    Ok(score.clamp(0.0, 1.0))
}
