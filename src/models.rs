use crate::config::ModelSpec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A scoring model restored from a saved artifact. Implementations only
/// predict; training happened in a previous run and is out of scope here.
pub trait Model: std::fmt::Debug {
    /// One score per row; higher means more likely positive.
    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64>;
}

/// On-disk weight checkpoint, one weight per feature in feature-list order.
#[derive(Serialize, Deserialize, Debug)]
pub struct ModelCheckpoint {
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
}

impl ModelCheckpoint {
    pub fn from_file(source: impl AsRef<Path>) -> Self {
        let raw = std::fs::read_to_string(source.as_ref())
            .unwrap_or_else(|_| panic!("Failed to read checkpoint {:?}", source.as_ref()));
        serde_json::from_str(&raw).expect("Failed to parse checkpoint as JSON")
    }
}

#[derive(Debug)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl Model for LinearModel {
    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| dot(&self.weights, row) + self.bias).collect()
    }
}

#[derive(Debug)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    pub bias: f64,
    /// Temperature applied to the linear score before the sigmoid.
    pub scale: f64,
}

impl Model for LogisticModel {
    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter()
            .map(|row| {
                let score = (dot(&self.weights, row) + self.bias) / self.scale;
                1. / (1. + (-score).exp())
            })
            .collect()
    }
}

fn dot(weights: &[f64], row: &[f64]) -> f64 {
    weights.iter().zip(row).map(|(w, x)| w * x).sum()
}

/// Restores the model configured for a run from its checkpoint file.
pub fn load_model(
    spec: &ModelSpec,
    checkpoint_path: impl AsRef<Path>,
    num_features: usize,
) -> Result<Box<dyn Model + Send>, String> {
    let checkpoint = ModelCheckpoint::from_file(checkpoint_path.as_ref());
    if checkpoint.weights.len() != num_features {
        return Err(format!(
            "Checkpoint {:?} has {} weights but the feature list has {} entries",
            checkpoint_path.as_ref(),
            checkpoint.weights.len(),
            num_features
        ));
    }
    match spec.method.as_str() {
        "linear" => Ok(Box::new(LinearModel {
            weights: checkpoint.weights,
            bias: checkpoint.bias,
        })),
        "logistic" => Ok(Box::new(LogisticModel {
            weights: checkpoint.weights,
            bias: checkpoint.bias,
            scale: spec.params.first().copied().unwrap_or(1.),
        })),
        name => Err(format!(
            "{} is not a valid model method. Must be one of: linear, logistic",
            name
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn rows() -> Vec<Vec<f64>> {
        vec![vec![1., 0.], vec![0., 1.], vec![2., 2.]]
    }

    #[test]
    fn test_linear_predict() {
        let model = LinearModel {
            weights: vec![2., -1.],
            bias: 0.5,
        };
        assert_eq!(model.predict(&rows()), [2.5, -0.5, 2.5]);
    }

    #[test]
    fn test_logistic_predict_is_monotone_in_score() {
        let model = LogisticModel {
            weights: vec![1., 1.],
            bias: 0.,
            scale: 1.,
        };
        let scores = model.predict(&rows());
        assert!(scores.iter().all(|&p| (0. ..=1.).contains(&p)));
        assert!(scores[2] > scores[0]);
        assert!((scores[0] - scores[1]).abs() < 1e-12);
    }

    #[test]
    fn test_load_model_rejects_unknown_method() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{{\"weights\": [1.0, 2.0], \"bias\": 0.0}}").unwrap();

        let spec = ModelSpec {
            method: "gradient_boosting".into(),
            params: vec![],
        };
        assert!(load_model(&spec, &path, 2).is_err());

        let spec = ModelSpec {
            method: "linear".into(),
            params: vec![],
        };
        assert!(load_model(&spec, &path, 2).is_ok());
        // Feature count must match the checkpoint
        assert!(load_model(&spec, &path, 3).is_err());
    }
}
