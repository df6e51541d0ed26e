use crate::config::{
    BestConfiguration, EvaluationConfiguration, ExperimentEntry, GeneralConfiguration, ModelSpec,
    RunConfiguration,
};
use crate::dataset::Dataset;
use crate::metrics::compute_metrics;
use crate::models::{load_model, Model};
use std::collections::BTreeMap;
use std::path::Path;

/// Reads a feature list, one column name per line, blank lines skipped.
pub fn read_feature_list(source: impl AsRef<Path>) -> Vec<String> {
    std::fs::read_to_string(source.as_ref())
        .unwrap_or_else(|_| panic!("Failed to read feature list {:?}", source.as_ref()))
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// One (experiment type, feature list, model type) combination, restored from
/// its run directory and ready to score a held-out dataset.
pub struct Experiment {
    pub experiment_name: String,
    pub model_type: String,
    pub features_name: String,
    pub label: String,
    pub features: Vec<String>,
    // Single-model runs hold one entry; k-fold runs average one model per fold
    pub folds: Vec<Box<dyn Model + Send>>,
    pub evaluation: EvaluationConfiguration,
}

impl Experiment {
    /// Restores a combination from `<folder>/<experiment>/<features>/<model>/`.
    /// The run's own configuration is loaded fresh, so the evaluation override
    /// must be reapplied here; it is independent of the top-level one.
    pub fn from_run_dir(
        run_path: &Path,
        entry: &ExperimentEntry,
        model_type: &str,
        features_name: &str,
        eval_id_name: Option<&str>,
    ) -> Self {
        let mut configuration = RunConfiguration::from_file(run_path.join("configuration.yml"));
        configuration.evaluation.apply_id_override(eval_id_name);

        let features = read_feature_list(run_path.join("features.txt"));
        let folds = load_folds(entry, &configuration.model, run_path, features.len());

        Self {
            experiment_name: entry.name.clone(),
            model_type: model_type.to_owned(),
            features_name: features_name.to_owned(),
            label: configuration.label,
            features,
            folds,
            evaluation: configuration.evaluation,
        }
    }

    /// Restores the persisted best combination from the fixed
    /// `best_experiment` directory, whatever scored best in-memory.
    pub fn from_best_dir(best_path: &Path, eval_id_name: Option<&str>) -> Self {
        let mut configuration = BestConfiguration::from_file(best_path.join("configuration.yml"));
        configuration.evaluation.apply_id_override(eval_id_name);

        let entry = configuration
            .experiments
            .first()
            .expect("best_experiment configures no experiment");
        let features = read_feature_list(best_path.join("features.txt"));
        let folds = load_folds(entry, &configuration.model, best_path, features.len());

        Self {
            experiment_name: entry.name.clone(),
            model_type: configuration.model_type,
            features_name: configuration.features,
            label: configuration.label,
            features,
            folds,
            evaluation: configuration.evaluation,
        }
    }

    pub fn combination(&self) -> String {
        format!(
            "{}/{}/{}",
            self.experiment_name, self.features_name, self.model_type
        )
    }

    /// Scores the dataset with every fold model, averages the predictions,
    /// and evaluates the configured metrics.
    pub fn eval_test(&self, test_data: &Dataset) -> EvalScores {
        let rows = test_data.feature_matrix(&self.features);
        let mut predictions = vec![0.; rows.len()];
        for model in &self.folds {
            for (average, prediction) in predictions.iter_mut().zip(model.predict(&rows)) {
                *average += prediction / self.folds.len() as f64;
            }
        }

        let labels = test_data.column(&self.label);
        let ids = self
            .evaluation
            .eval_id_name
            .as_deref()
            .map(|column| test_data.ids(column));
        let metrics = compute_metrics(&predictions, labels, ids, &self.evaluation);

        EvalScores {
            experiment_name: self.experiment_name.clone(),
            model_type: self.model_type.clone(),
            features_name: self.features_name.clone(),
            dataset_name: test_data.name.clone(),
            selector_metric: self.evaluation.metric_selector.clone(),
            metrics,
        }
    }
}

fn load_folds(
    entry: &ExperimentEntry,
    spec: &ModelSpec,
    artifact_dir: &Path,
    num_features: usize,
) -> Vec<Box<dyn Model + Send>> {
    match entry.name.as_str() {
        "single_model" => {
            let model = load_model(spec, artifact_dir.join("model.json"), num_features)
                .unwrap_or_else(|msg| panic!("{}", msg));
            vec![model]
        }
        "kfold" => (0..entry.folds)
            .map(|fold| {
                let checkpoint = artifact_dir.join(format!("fold_{}", fold)).join("model.json");
                load_model(spec, checkpoint, num_features).unwrap_or_else(|msg| panic!("{}", msg))
            })
            .collect(),
        name => panic!("'{}' is not a valid experiment name!", name),
    }
}

/// Metrics of one evaluated combination on one dataset.
#[derive(Debug, Clone)]
pub struct EvalScores {
    pub experiment_name: String,
    pub model_type: String,
    pub features_name: String,
    pub dataset_name: String,
    pub selector_metric: String,
    pub metrics: BTreeMap<String, f64>,
}

impl EvalScores {
    pub fn selector_score(&self) -> f64 {
        *self
            .metrics
            .get(&self.selector_metric)
            .unwrap_or_else(|| panic!("No score recorded for metric {}", self.selector_metric))
    }

    pub fn combination(&self) -> String {
        format!(
            "{}/{}/{}",
            self.experiment_name, self.features_name, self.model_type
        )
    }
}

/// Evaluates every configured combination of one experiment folder against a
/// dataset that was already loaded. Produces exactly
/// `experiments x model_types x feature_paths` score records, in
/// configuration order.
pub fn evaluate_folder(
    experiment_path: &Path,
    configuration: &GeneralConfiguration,
    test_data: &Dataset,
    eval_id_name: Option<&str>,
) -> Vec<EvalScores> {
    let mut results = vec![];
    for entry in &configuration.experiments {
        tracing::info!("{} :", entry.name);
        for model_type in &configuration.model_types {
            tracing::info!(" {} :", model_type);
            for features_name in &configuration.feature_paths {
                tracing::info!("  {} :", features_name);
                let run_path = experiment_path
                    .join(&entry.name)
                    .join(features_name)
                    .join(model_type);
                let experiment =
                    Experiment::from_run_dir(&run_path, entry, model_type, features_name, eval_id_name);
                results.push(experiment.eval_test(test_data));
            }
        }
    }
    results
}
