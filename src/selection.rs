use crate::config::EvaluationConfiguration;
use crate::experiment::EvalScores;
use std::collections::BTreeSet;
use std::path::Path;

/// Ranks the collected score records by the selector metric, writes the full
/// score table to `<path>/<file_name>.csv`, and returns the best record with
/// a printable summary.
pub fn get_best_experiment<'a>(
    results: &'a [EvalScores],
    eval: &EvaluationConfiguration,
    path: &Path,
    file_name: &str,
) -> (&'a EvalScores, String) {
    assert!(!results.is_empty(), "No experiment produced scores");
    write_results_table(results, &path.join(format!("{}.csv", file_name)));

    let best = results
        .iter()
        .max_by(|a, b| a.selector_score().total_cmp(&b.selector_score()))
        .unwrap();
    let message = format!(
        "Best experiment on {}: {} with {} = {:.4}",
        best.dataset_name,
        best.combination(),
        eval.metric_selector,
        best.selector_score()
    );
    (best, message)
}

pub fn log_summary_results(message: &str) {
    let horizontal = "============================================================";
    tracing::info!("{}\n{}\n{}", horizontal, message, horizontal);
}

fn write_results_table(results: &[EvalScores], path: &Path) {
    // Union of metric names across records; BTreeSet keeps the columns stable
    let metric_names: BTreeSet<&str> = results
        .iter()
        .flat_map(|scores| scores.metrics.keys().map(String::as_str))
        .collect();

    let mut writer =
        csv::Writer::from_path(path).unwrap_or_else(|err| panic!("Failed to create {:?}: {}", path, err));
    let mut header = vec!["experiment", "features", "model", "dataset"];
    header.extend(metric_names.iter().copied());
    writer.write_record(&header).expect("Failed to write results header");

    for scores in results {
        let mut record = vec![
            scores.experiment_name.clone(),
            scores.features_name.clone(),
            scores.model_type.clone(),
            scores.dataset_name.clone(),
        ];
        for name in &metric_names {
            let cell = scores
                .metrics
                .get(*name)
                .map_or(String::new(), |value| value.to_string());
            record.push(cell);
        }
        writer.write_record(&record).expect("Failed to write results row");
    }
    writer.flush().expect("Failed to flush results file");
    tracing::info!("Successfully wrote scores to {:?}", path);
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;

    fn record(experiment: &str, topk: f64) -> EvalScores {
        EvalScores {
            experiment_name: experiment.to_owned(),
            model_type: "linear".to_owned(),
            features_name: "base".to_owned(),
            dataset_name: "holdout".to_owned(),
            selector_metric: "topk".to_owned(),
            metrics: BTreeMap::from([("topk".to_owned(), topk)]),
        }
    }

    #[test]
    fn test_best_is_highest_selector_score() {
        let dir = tempfile::tempdir().unwrap();
        let eval = EvaluationConfiguration {
            eval_id_name: None,
            metric_selector: "topk".to_owned(),
            monitoring_metrics: vec!["topk".to_owned()],
            observations_number: 20,
        };
        let results = vec![record("kfold", 0.4), record("single_model", 0.7)];

        let (best, message) = get_best_experiment(&results, &eval, dir.path(), "results");
        assert_eq!(best.experiment_name, "single_model");
        assert!(message.contains("single_model/base/linear"));

        let table = std::fs::read_to_string(dir.path().join("results.csv")).unwrap();
        let mut lines = table.lines();
        assert_eq!(lines.next().unwrap(), "experiment,features,model,dataset,topk");
        assert_eq!(lines.clone().count(), 2);
        assert!(lines.any(|line| line.starts_with("kfold,base,linear,holdout,")));
    }

    #[test]
    #[should_panic(expected = "No experiment produced scores")]
    fn test_empty_results_panic() {
        let dir = tempfile::tempdir().unwrap();
        let eval = EvaluationConfiguration {
            eval_id_name: None,
            metric_selector: "topk".to_owned(),
            monitoring_metrics: vec![],
            observations_number: 20,
        };
        get_best_experiment(&[], &eval, dir.path(), "results");
    }
}
