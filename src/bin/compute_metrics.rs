use clap::Parser;
use modelrank::config::{FeaturesConfiguration, GeneralConfiguration};
use modelrank::dataset::Dataset;
use modelrank::experiment::{evaluate_folder, Experiment};
use modelrank::selection::{get_best_experiment, log_summary_results};
use modelrank::{DATAPROC_DIRECTORY, MODELS_DIRECTORY};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Evaluate the trained artifacts of an experiment folder on held-out
/// datasets and report the best-scoring combination.
#[derive(Parser, Debug)]
#[command(name = "compute_metrics")]
struct Args {
    /// Path to a dataset used in evaluation; repeat for several datasets.
    #[arg(short = 'd', long = "test_data_paths", required = true)]
    test_data_paths: Vec<PathBuf>,

    /// Column name to evaluate per split.
    #[arg(short = 'e', long = "eval_id_name", alias = "eid")]
    eval_id_name: Option<String>,

    /// Experiment folder name under the models directory.
    #[arg(short = 'n', long = "folder_name")]
    folder_name: String,
}

fn main() {
    let args = Args::parse();
    let experiment_path = Path::new(MODELS_DIRECTORY).join(&args.folder_name);
    init_logging(&experiment_path);

    let eval_id_name = args.eval_id_name.as_deref();
    let mut general_configuration =
        GeneralConfiguration::from_file(experiment_path.join("configuration.yml"));
    general_configuration.apply_id_override(eval_id_name);
    let eval_configuration = general_configuration.evaluation.clone();
    tracing::info!(
        "Loaded {} experiments, {} model types, {} feature lists from {:?}",
        general_configuration.experiments.len(),
        general_configuration.model_types.len(),
        general_configuration.feature_paths.len(),
        experiment_path
    );

    let features_configuration = FeaturesConfiguration::from_file(
        experiment_path
            .join(DATAPROC_DIRECTORY)
            .join("features_configuration.yml"),
    );

    for test_data_path in &args.test_data_paths {
        // One load per dataset path, shared by every combination below
        let test_data = Dataset::load(test_data_path, &features_configuration);
        let horizontal = "####################";
        tracing::info!("{}\nStart evaluating {}\n{}", horizontal, test_data.name, horizontal);

        let results = evaluate_folder(
            &experiment_path,
            &general_configuration,
            &test_data,
            eval_id_name,
        );
        let (_, eval_message) =
            get_best_experiment(&results, &eval_configuration, &experiment_path, "results");
        log_summary_results(&eval_message);

        tracing::info!("Eval best experiment");
        let best = Experiment::from_best_dir(&experiment_path.join("best_experiment"), eval_id_name);
        tracing::info!("Experiment : {}", best.experiment_name);
        tracing::info!("model : {}", best.model_type);
        tracing::info!("features : {}", best.features_name);
        let scores = best.eval_test(&test_data);
        tracing::info!("{} scores: {:?}", scores.combination(), scores.metrics);
    }
}

/// Logs to stdout and appends to a per-experiment file, so each run leaves a
/// record next to the artifacts it evaluated.
fn init_logging(experiment_path: &Path) {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(experiment_path.join("InfoEval.log"))
        .unwrap_or_else(|err| panic!("Failed to open log file in {:?}: {}", experiment_path, err));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(log_file)),
        )
        .init();
}
