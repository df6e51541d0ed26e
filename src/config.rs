use serde::Deserialize;
use std::path::Path;

/// Metric used whenever no per-row identifier column is available.
pub static FALLBACK_METRIC: &str = "topk";

fn default_observations() -> usize {
    20
}

fn default_folds() -> usize {
    5
}

fn read_yml<T: serde::de::DeserializeOwned>(source: &Path) -> T {
    let raw = std::fs::read_to_string(source)
        .unwrap_or_else(|_| panic!("Failed to read configuration file {:?}", source));
    serde_yaml::from_str(&raw)
        .unwrap_or_else(|err| panic!("Failed to parse {:?} as YAML: {}", source, err))
}

/// Evaluation-time options, shared by every configuration file in a run tree.
#[derive(Deserialize, Debug, Clone)]
pub struct EvaluationConfiguration {
    #[serde(default)]
    pub eval_id_name: Option<String>,
    pub metric_selector: String,
    #[serde(default)]
    pub monitoring_metrics: Vec<String>,
    /// Cutoff used by the top-k metric.
    #[serde(default = "default_observations")]
    pub observations_number: usize,
}

impl EvaluationConfiguration {
    /// Injects the command-line identifier column. Without one, grouped
    /// metrics are meaningless, so the selector falls back to top-k.
    pub fn apply_id_override(&mut self, eval_id_name: Option<&str>) {
        self.eval_id_name = eval_id_name.map(str::to_owned);
        if eval_id_name.is_none() {
            self.metric_selector = FALLBACK_METRIC.to_owned();
        }
    }
}

/// One configured experiment type, in the order the YAML lists them.
#[derive(Deserialize, Debug, Clone)]
pub struct ExperimentEntry {
    pub name: String,
    #[serde(default = "default_folds")]
    pub folds: usize,
}

/// Top-level `configuration.yml` of an experiment folder.
#[derive(Deserialize, Debug)]
pub struct GeneralConfiguration {
    pub experiments: Vec<ExperimentEntry>,
    pub model_types: Vec<String>,
    pub feature_paths: Vec<String>,
    pub evaluation: EvaluationConfiguration,
}

impl GeneralConfiguration {
    pub fn from_file(source: impl AsRef<Path>) -> Self {
        read_yml(source.as_ref())
    }

    /// The top-level override also narrows the monitored metrics, unlike the
    /// per-run override which leaves them as configured.
    pub fn apply_id_override(&mut self, eval_id_name: Option<&str>) {
        self.evaluation.apply_id_override(eval_id_name);
        if eval_id_name.is_none() {
            self.evaluation.monitoring_metrics = vec![FALLBACK_METRIC.to_owned()];
        }
    }
}

/// Scoring method and parameters of a saved model artifact.
#[derive(Deserialize, Debug, Clone)]
pub struct ModelSpec {
    pub method: String,
    #[serde(default)]
    pub params: Vec<f64>,
}

/// Per-combination `configuration.yml`, stored next to the artifacts in
/// `<folder>/<experiment>/<features>/<model_type>/`.
#[derive(Deserialize, Debug)]
pub struct RunConfiguration {
    pub label: String,
    pub model: ModelSpec,
    pub evaluation: EvaluationConfiguration,
}

impl RunConfiguration {
    pub fn from_file(source: impl AsRef<Path>) -> Self {
        read_yml(source.as_ref())
    }
}

/// `best_experiment/configuration.yml`, written when a run tree is ranked.
/// Only its first experiment entry is ever evaluated.
#[derive(Deserialize, Debug)]
pub struct BestConfiguration {
    pub experiments: Vec<ExperimentEntry>,
    pub model_type: String,
    pub features: String,
    pub label: String,
    pub model: ModelSpec,
    pub evaluation: EvaluationConfiguration,
}

impl BestConfiguration {
    pub fn from_file(source: impl AsRef<Path>) -> Self {
        read_yml(source.as_ref())
    }
}

/// Column typing produced by the data-processing stage; tells the dataset
/// loader which columns parse as numbers and which stay as identifiers.
#[derive(Deserialize, Debug, Default)]
pub struct FeaturesConfiguration {
    #[serde(default)]
    pub float: Vec<String>,
    #[serde(default)]
    pub int: Vec<String>,
    #[serde(default)]
    pub ids: Vec<String>,
}

impl FeaturesConfiguration {
    pub fn from_file(source: impl AsRef<Path>) -> Self {
        read_yml(source.as_ref())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_general() -> GeneralConfiguration {
        let raw = "
experiments:
  - name: single_model
  - name: kfold
    folds: 3
model_types: [linear, logistic]
feature_paths: [base, extended]
evaluation:
  metric_selector: auc
  monitoring_metrics: [auc, topk]
  observations_number: 10
";
        serde_yaml::from_str(raw).unwrap()
    }

    #[test]
    fn test_general_parse() {
        let config = sample_general();
        assert_eq!(config.experiments.len(), 2);
        assert_eq!(config.experiments[0].name, "single_model");
        assert_eq!(config.experiments[0].folds, 5);
        assert_eq!(config.experiments[1].folds, 3);
        assert_eq!(config.model_types, ["linear", "logistic"]);
        assert_eq!(config.evaluation.observations_number, 10);
        assert_eq!(config.evaluation.eval_id_name, None);
    }

    #[test]
    fn test_override_without_id_column() {
        let mut config = sample_general();
        config.apply_id_override(None);
        assert_eq!(config.evaluation.metric_selector, "topk");
        assert_eq!(config.evaluation.monitoring_metrics, ["topk"]);
        assert_eq!(config.evaluation.eval_id_name, None);
    }

    #[test]
    fn test_override_with_id_column() {
        let mut config = sample_general();
        config.apply_id_override(Some("patient_id"));
        assert_eq!(config.evaluation.metric_selector, "auc");
        assert_eq!(config.evaluation.monitoring_metrics, ["auc", "topk"]);
        assert_eq!(config.evaluation.eval_id_name.as_deref(), Some("patient_id"));
    }

    #[test]
    fn test_run_override_keeps_monitoring_metrics() {
        let raw = "
label: response
model:
  method: linear
evaluation:
  metric_selector: auc
  monitoring_metrics: [auc, topk]
";
        let mut config: RunConfiguration = serde_yaml::from_str(raw).unwrap();
        config.evaluation.apply_id_override(None);
        assert_eq!(config.evaluation.metric_selector, "topk");
        assert_eq!(config.evaluation.monitoring_metrics, ["auc", "topk"]);
    }
}
