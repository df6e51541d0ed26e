use crate::config::EvaluationConfiguration;
use itertools::Itertools;
use overload::overload;
use std::collections::BTreeMap;
use std::fmt;
use std::ops;

/// A scored row: (prediction, label). Labels are 0/1 floats.
pub type ScoredRows = [(f64, f64)];
pub type WeightAndSum = (f64, f64);
pub type Metric = Box<dyn Fn(&ScoredRows) -> WeightAndSum>;

// A data structure for accumulating weighted metrics across evaluation groups
pub struct ScoreReport {
    pub metrics_wt_sum: Vec<WeightAndSum>,
}

impl ScoreReport {
    pub fn new(num_metrics: usize) -> Self {
        Self {
            metrics_wt_sum: vec![(0., 0.); num_metrics],
        }
    }

    /// Weighted averages, NaN where no group carried any outcome.
    pub fn averages(&self) -> Vec<f64> {
        self.metrics_wt_sum
            .iter()
            .map(|&(wt, sum)| sum / wt)
            .collect()
    }
}

impl fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.averages())
    }
}

overload!((a: ?ScoreReport) + (b: ?ScoreReport) -> ScoreReport {
    assert_eq!(a.metrics_wt_sum.len(), b.metrics_wt_sum.len());
    let metrics_wt_sum = a.metrics_wt_sum.iter().zip(b.metrics_wt_sum.iter()).map(|((a_w, a_sum), (b_w, b_sum))| (a_w+b_w, a_sum+b_sum)).collect();
    ScoreReport {
        metrics_wt_sum
    }
});

overload!((a: &mut ScoreReport) += (b: ?ScoreReport) {
    assert_eq!(a.metrics_wt_sum.len(), b.metrics_wt_sum.len());
    for ((a_w, a_sum), (b_w, b_sum)) in a.metrics_wt_sum.iter_mut().zip(b.metrics_wt_sum.iter()) {
        *a_w += b_w;
        *a_sum += b_sum;
    }
});

// A group with a single outcome class carries no ranking signal
fn outcome_free(rows: &ScoredRows) -> bool {
    rows.iter().all(|&(_, y)| y > 0.) || rows.iter().all(|&(_, y)| y <= 0.)
}

/// Precision among the k highest-scoring rows, weighted by group size.
/// May count fewer than k rows when the group is smaller than k.
pub fn top_k_metric(rows: &ScoredRows, k: usize) -> WeightAndSum {
    if outcome_free(rows) {
        return (0., 0.);
    }
    let mut by_score = rows.to_vec();
    by_score.sort_by(|a, b| b.0.total_cmp(&a.0));
    let k_eff = k.min(by_score.len());
    let hits = by_score[..k_eff].iter().filter(|&&(_, y)| y > 0.).count();

    let n = rows.len() as f64;
    (n, n * hits as f64 / k_eff as f64)
}

/// Rank-based AUC with midrank tie handling, weighted by group size.
pub fn auc_metric(rows: &ScoredRows) -> WeightAndSum {
    if outcome_free(rows) {
        return (0., 0.);
    }
    let mut by_score = rows.to_vec();
    by_score.sort_by(|a, b| a.0.total_cmp(&b.0));

    let num_positive = by_score.iter().filter(|&&(_, y)| y > 0.).count() as f64;
    let num_negative = by_score.len() as f64 - num_positive;

    // Sum the 1-indexed midranks of the positive rows
    let mut rank_sum = 0.;
    let mut lo = 0;
    while lo < by_score.len() {
        let mut hi = lo;
        while hi + 1 < by_score.len() && by_score[hi + 1].0 == by_score[lo].0 {
            hi += 1;
        }
        let midrank = (lo + hi) as f64 / 2. + 1.;
        rank_sum += midrank
            * by_score[lo..=hi].iter().filter(|&&(_, y)| y > 0.).count() as f64;
        lo = hi + 1;
    }

    let auc = (rank_sum - num_positive * (num_positive + 1.) / 2.) / (num_positive * num_negative);
    let n = rows.len() as f64;
    (n, n * auc)
}

pub fn metric_by_name(metric_name: &str, top_k: usize) -> Result<Metric, String> {
    match metric_name {
        "topk" => Ok(Box::new(move |rows| top_k_metric(rows, top_k))),
        "auc" => Ok(Box::new(auc_metric)),
        name => Err(format!(
            "{} is not a valid metric. Must be one of: topk, auc",
            name
        )),
    }
}

/// Evaluates every monitored metric, plus the selector if it is not already
/// monitored. With an identifier column the rows are grouped by id and each
/// metric is averaged over groups, weighted by group size; without one the
/// metrics are computed over the whole dataset.
pub fn compute_metrics(
    predictions: &[f64],
    labels: &[f64],
    ids: Option<&[String]>,
    eval: &EvaluationConfiguration,
) -> BTreeMap<String, f64> {
    assert_eq!(predictions.len(), labels.len());
    let mut metric_names: Vec<&str> = eval
        .monitoring_metrics
        .iter()
        .map(String::as_str)
        .collect();
    if !metric_names.contains(&eval.metric_selector.as_str()) {
        metric_names.push(eval.metric_selector.as_str());
    }
    let metrics: Vec<Metric> = metric_names
        .iter()
        .map(|name| metric_by_name(name, eval.observations_number).unwrap())
        .collect();

    let scored: Vec<(f64, f64)> = predictions
        .iter()
        .copied()
        .zip(labels.iter().copied())
        .collect();

    let mut report = ScoreReport::new(metrics.len());
    match ids {
        Some(ids) => {
            assert_eq!(ids.len(), scored.len());
            let groups = ids.iter().zip(scored.iter().copied()).into_group_map();
            for rows in groups.values() {
                report += ScoreReport {
                    metrics_wt_sum: metrics.iter().map(|metric| metric(rows)).collect(),
                };
            }
        }
        None => {
            report += ScoreReport {
                metrics_wt_sum: metrics.iter().map(|metric| metric(&scored)).collect(),
            };
        }
    }

    metric_names
        .iter()
        .map(|name| name.to_string())
        .zip(report.averages())
        .collect()
}
