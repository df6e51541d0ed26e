pub mod config;
pub mod dataset;
pub mod experiment;
pub mod metrics;
pub mod models;
pub mod selection;

/// Directory holding one subdirectory of saved artifacts per training run.
pub static MODELS_DIRECTORY: &str = "models";

/// Subdirectory of a run holding data-processing artifacts.
pub static DATAPROC_DIRECTORY: &str = "data_proc";
