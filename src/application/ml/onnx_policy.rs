use crate::domain::errors::{InsightError, InsightResult};
use crate::domain::ports::TradingPolicy;
use ort::session::Session;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info};

/// PPO actor exported to ONNX. Input `[1, observation_dim]` f32, first output
/// value is the action.
pub struct OnnxPolicy {
    session: Mutex<Session>,
    model_path: PathBuf,
    observation_dim: usize,
}

impl OnnxPolicy {
    /// Loads the model and runs one probe inference on a zero observation so
    /// shape mismatches surface at load time rather than on the first request.
    pub fn load(model_path: &Path, observation_dim: usize) -> InsightResult<Self> {
        if !model_path.exists() {
            return Err(InsightError::ModelUnavailable(format!(
                "ONNX model file not found at {:?}",
                model_path
            )));
        }

        let session = Session::builder()
            .and_then(|mut builder| builder.commit_from_file(model_path))
            .map_err(|e| {
                error!("OnnxPolicy: failed to load {:?}: {}", model_path, e);
                InsightError::ModelUnavailable(format!(
                    "failed to load ONNX model {:?}: {}",
                    model_path, e
                ))
            })?;

        let policy = Self {
            session: Mutex::new(session),
            model_path: model_path.to_path_buf(),
            observation_dim,
        };

        policy
            .act(&vec![0.0; observation_dim])
            .map_err(|e| {
                InsightError::ModelUnavailable(format!(
                    "probe inference on {:?} failed: {}",
                    model_path, e
                ))
            })?;

        info!(
            "OnnxPolicy: loaded {:?} (observation dim {})",
            policy.model_path, observation_dim
        );
        Ok(policy)
    }
}

impl TradingPolicy for OnnxPolicy {
    fn act(&self, observation: &[f32]) -> InsightResult<f32> {
        if observation.len() != self.observation_dim {
            return Err(InsightError::Inference(format!(
                "expected {} observation values, got {}",
                self.observation_dim,
                observation.len()
            )));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|e| InsightError::Inference(format!("session lock poisoned: {}", e)))?;

        let shape = vec![1, self.observation_dim];
        let input_value = ort::value::Value::from_array((shape.as_slice(), observation.to_vec()))
            .map_err(|e| InsightError::Inference(format!("input value creation failed: {}", e)))?;

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| InsightError::Inference(e.to_string()))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| InsightError::Inference("model produced no output".to_string()))?;
        let data = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| InsightError::Inference(e.to_string()))?;
        let action = *data
            .1
            .iter()
            .next()
            .ok_or_else(|| InsightError::Inference("empty output tensor".to_string()))?;

        if !action.is_finite() {
            return Err(InsightError::Inference(format!(
                "non-finite action {}",
                action
            )));
        }
        Ok(action.clamp(-1.0, 1.0))
    }

    fn observation_dim(&self) -> usize {
        self.observation_dim
    }

    fn name(&self) -> &str {
        "ONNX Runtime (PPO actor)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_unavailable() {
        let err = OnnxPolicy::load(Path::new("does_not_exist.onnx"), 11)
            .err()
            .unwrap();
        assert!(matches!(err, InsightError::ModelUnavailable(_)));
    }

    #[test]
    fn test_corrupt_model_is_unavailable() {
        let path = std::env::temp_dir().join("finrl_insight_corrupt_model.onnx");
        std::fs::write(&path, b"not an onnx graph").unwrap();

        let err = OnnxPolicy::load(&path, 11).err().unwrap();
        assert!(matches!(err, InsightError::ModelUnavailable(_)));

        let _ = std::fs::remove_file(&path);
    }
}
