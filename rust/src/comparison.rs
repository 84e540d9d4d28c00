//! Mode x rule comparison over one task graph.

use std::time::Instant;

use crate::graph::TaskGraph;
use crate::models::RunRecord;
use crate::priority::PriorityRule;
use crate::scheduler::{run_schedule, Mode, ResourcePool, SchedulerError};

/// Run every (mode, rule) combination, modes outermost, and collect one
/// record per run. Stops at the first failing run.
pub fn compare_runs(
    graph: &TaskGraph,
    pool: &ResourcePool,
    modes: &[Mode],
    rules: &[PriorityRule],
) -> Result<Vec<RunRecord>, SchedulerError> {
    let mut records = Vec::with_capacity(modes.len() * rules.len());

    for &mode in modes {
        for &rule in rules {
            let time_start = Instant::now();
            let schedule = run_schedule(graph, pool, rule, mode)?;
            let elapsed_secs = time_start.elapsed().as_secs_f64();

            records.push(RunRecord {
                mode: mode.name().to_string(),
                rule: rule.name().to_string(),
                makespan: schedule.makespan,
                total_cost: schedule.total_cost,
                elapsed_secs,
            });
        }
    }

    Ok(records)
}

/// Best record by makespan; ties keep the earliest run.
pub fn best_run(records: &[RunRecord]) -> Option<&RunRecord> {
    records.iter().reduce(|best, r| if r.makespan < best.makespan { r } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;

    fn graph() -> TaskGraph {
        TaskGraph::new(vec![
            Task::new("A", 4).with_demand("dev", 1),
            Task::new("B", 3).with_demand("dev", 1).with_predecessor("A"),
            Task::new("C", 2).with_demand("test", 1).with_predecessor("A"),
            Task::new("D", 5)
                .with_demand("dev", 1)
                .with_demand("test", 1)
                .with_predecessor("B")
                .with_predecessor("C"),
            Task::new("E", 3).with_demand("dev", 1).with_predecessor("C"),
        ])
        .unwrap()
    }

    #[test]
    fn test_every_combination_in_order() {
        let pool = ResourcePool::skills([("dev", 2), ("test", 1)]);
        let records = compare_runs(&graph(), &pool, &Mode::ALL, &PriorityRule::STANDARD).unwrap();

        assert_eq!(records.len(), 8);
        let labels: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.mode.as_str(), r.rule.as_str()))
            .collect();
        assert_eq!(labels[0], ("parallel", "shortest"));
        assert_eq!(labels[3], ("parallel", "most_important"));
        assert_eq!(labels[4], ("serial", "shortest"));

        for record in &records {
            assert!(record.elapsed_secs >= 0.0);
            match record.mode.as_str() {
                "serial" => assert_eq!(record.makespan, 17),
                _ => assert!(record.makespan <= 17),
            }
        }
        assert_eq!(best_run(&records).map(|r| r.makespan), Some(12));
    }

    #[test]
    fn test_failure_propagates() {
        let pool = ResourcePool::skills([("dev", 2)]);
        let err = compare_runs(&graph(), &pool, &Mode::ALL, &PriorityRule::STANDARD).unwrap_err();
        assert!(matches!(err, SchedulerError::ResourceCapacityExceeded { .. }));
        assert_eq!(best_run(&[]), None);
    }
}
