use merge_core::Tier;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::runner::SeedResult;

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub seed_count: usize,
    pub status_counts: BTreeMap<&'static str, usize>,
    /// Over successful seeds only; `None` when no seed succeeded.
    pub stages_played: Option<MetricSummary>,
    pub milestones: Vec<MilestoneSummary>,
}

#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
    pub median: f64,
}

#[derive(Debug, Serialize)]
pub struct MilestoneSummary {
    pub tier: Tier,
    pub seeds_reached: usize,
    pub mean_stage: f64,
}

pub fn compute_summary(results: &[SeedResult]) -> SummaryStats {
    let mut status_counts = BTreeMap::new();
    for result in results {
        *status_counts.entry(result.outcome.status.label()).or_insert(0) += 1;
    }

    let successes: Vec<f64> = results
        .iter()
        .filter(|r| r.outcome.status == merge_core::RunStatus::Success)
        .map(|r| r.outcome.stages_played as f64)
        .collect();

    let mut stages_by_tier: BTreeMap<Tier, Vec<f64>> = BTreeMap::new();
    for result in results {
        for (tier, stage) in result.outcome.milestones.iter() {
            stages_by_tier.entry(tier).or_default().push(stage as f64);
        }
    }
    let milestones = stages_by_tier
        .into_iter()
        .map(|(tier, stages)| MilestoneSummary {
            tier,
            seeds_reached: stages.len(),
            mean_stage: stages.iter().sum::<f64>() / stages.len() as f64,
        })
        .collect();

    SummaryStats {
        seed_count: results.len(),
        status_counts,
        stages_played: compute_metric_summary(&successes),
        milestones,
    }
}

fn compute_metric_summary(values: &[f64]) -> Option<MetricSummary> {
    if values.is_empty() {
        return None;
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Some(MetricSummary {
        mean,
        min,
        max,
        stddev: variance.sqrt(),
        median,
    })
}

pub fn print_summary(scenario_name: &str, stats: &SummaryStats) {
    println!("\n=== {} ({} seeds) ===\n", scenario_name, stats.seed_count);
    for (status, count) in &stats.status_counts {
        println!("{status:<30} {count}/{}", stats.seed_count);
    }
    println!();
    println!(
        "{:<30} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "Metric", "Mean", "Min", "Max", "StdDev", "Median"
    );
    println!("{}", "-".repeat(79));
    match &stats.stages_played {
        Some(m) => println!(
            "{:<30} {:>8.2} {:>8.0} {:>8.0} {:>8.2} {:>8.1}",
            "stages_played (success)", m.mean, m.min, m.max, m.stddev, m.median
        ),
        None => println!("{:<30} {:>8}", "stages_played (success)", "n/a"),
    }
    println!();
    println!("{:<10} {:>8} {:>12}", "Tier", "Reached", "Mean stage");
    for milestone in &stats.milestones {
        println!(
            "{:<10} {:>8} {:>12.1}",
            milestone.tier, milestone.seeds_reached, milestone.mean_stage
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merge_core::{Field, MilestoneRecord, RunOutcome, RunStatus, TierLedger};

    fn seed_result(seed: u64, status: RunStatus, stages: u64, milestones: &[(Tier, u64)]) -> SeedResult {
        let mut record = MilestoneRecord::default();
        for &(tier, stage) in milestones {
            record.record(tier, stage);
        }
        SeedResult {
            seed,
            run_id: format!("run-{seed}"),
            outcome: RunOutcome {
                status,
                final_stage: stages,
                stages_played: stages,
                milestones: record,
                energy_left: 0,
                field: Field::Ledger(TierLedger::new(4, &BTreeMap::new())),
            },
            wall_time_ms: 0,
        }
    }

    #[test]
    fn stages_played_covers_only_successes() {
        let results = vec![
            seed_result(1, RunStatus::Success, 10, &[(2, 2)]),
            seed_result(2, RunStatus::Success, 20, &[(2, 4)]),
            seed_result(3, RunStatus::Success, 60, &[(2, 3)]),
            seed_result(4, RunStatus::TimedOut, 1000, &[(2, 2)]),
        ];
        let stats = compute_summary(&results);

        assert_eq!(stats.seed_count, 4);
        assert_eq!(stats.status_counts.get("success"), Some(&3));
        assert_eq!(stats.status_counts.get("timed_out"), Some(&1));
        let stages = stats.stages_played.unwrap();
        assert!((stages.mean - 30.0).abs() < 1e-9);
        assert!((stages.min - 10.0).abs() < 1e-9);
        assert!((stages.max - 60.0).abs() < 1e-9);
        assert!((stages.median - 20.0).abs() < 1e-9);
    }

    #[test]
    fn milestone_means_count_only_seeds_that_reached_the_tier() {
        let results = vec![
            seed_result(1, RunStatus::Success, 6, &[(2, 2), (3, 4)]),
            seed_result(2, RunStatus::Gridlocked, 5, &[(2, 4)]),
        ];
        let stats = compute_summary(&results);

        assert_eq!(stats.milestones.len(), 2);
        assert_eq!(stats.milestones[0].tier, 2);
        assert_eq!(stats.milestones[0].seeds_reached, 2);
        assert!((stats.milestones[0].mean_stage - 3.0).abs() < 1e-9);
        assert_eq!(stats.milestones[1].seeds_reached, 1);
        assert!((stats.milestones[1].mean_stage - 4.0).abs() < 1e-9);
    }

    #[test]
    fn no_successes_means_no_stage_summary() {
        let results = vec![seed_result(1, RunStatus::Gridlocked, 8, &[])];
        let stats = compute_summary(&results);
        assert!(stats.stages_played.is_none());
        assert!(stats.milestones.is_empty());
    }

    #[test]
    fn even_count_median_averages_the_middle_pair() {
        let summary = compute_metric_summary(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert!((summary.median - 2.5).abs() < 1e-9);
        assert!((summary.stddev - 1.25_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn stddev_zero_for_identical() {
        let summary = compute_metric_summary(&[7.0, 7.0, 7.0]).unwrap();
        assert!(summary.stddev.abs() < 1e-12);
    }
}
