//! Independent audit of a finished schedule.
//!
//! Re-derives every constraint from the task graph and the pool instead of
//! trusting the scheduler's bookkeeping, and reports all violations found.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::TaskGraph;
use crate::models::{Schedule, ScheduleEntry, Time};
use crate::scheduler::{audit_exclusivity, ResourcePool, SCALAR_RESOURCE};

/// Classification of schedule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// A task has no entry.
    MissingTask,
    /// A task has more than one entry.
    DuplicateEntry,
    /// An entry names a task that is not in the graph.
    UnknownTask,
    /// end - start differs from the task duration.
    DurationMismatch,
    /// A task starts before one of its predecessors ends.
    Precedence,
    /// Concurrent demand on a skill exceeds its capacity.
    CapacityExceeded,
    /// One employee is assigned to overlapping tasks.
    DoubleBooking,
    /// An employee lacks the skill they were assigned to.
    Unqualified,
    /// One employee fills two skill slots of the same task.
    Exclusivity,
    /// A skill slot was left unfilled.
    Understaffed,
}

/// One broken constraint found in a schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    /// Task (or employee, for double booking) the violation is about.
    pub entity_id: String,
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }
}

/// Check `schedule` against `graph` and `pool`.
///
/// Returns every violation, in check order, or `Ok(())` for a valid schedule.
pub fn verify_schedule(
    schedule: &Schedule,
    graph: &TaskGraph,
    pool: &ResourcePool,
) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();

    let by_id = check_coverage(schedule, graph, &mut violations);
    check_precedence(graph, &by_id, &mut violations);

    match pool {
        ResourcePool::Skills(caps) => {
            for t in start_instants(schedule) {
                let mut load: FxHashMap<&str, u64> = FxHashMap::default();
                for entry in active_at(schedule, t) {
                    let Some(task) = graph.get(&entry.task_id) else {
                        continue;
                    };
                    for (skill, units) in &task.demand {
                        *load.entry(skill.as_str()).or_insert(0) += u64::from(*units);
                    }
                }
                let mut skills: Vec<(&str, u64)> = load.into_iter().collect();
                skills.sort();
                for (skill, used) in skills {
                    let capacity = u64::from(caps.get(skill).copied().unwrap_or(0));
                    if used > capacity {
                        violations.push(Violation::new(
                            ViolationKind::CapacityExceeded,
                            skill,
                            format!("{} unit(s) of {} in use at t={}, capacity {}", used, skill, t, capacity),
                        ));
                    }
                }
            }
        }
        ResourcePool::Scalar(cap) => {
            for entry in &schedule.entries {
                let Some(task) = graph.get(&entry.task_id) else {
                    continue;
                };
                if task.scalar_demand() > u64::from(*cap) {
                    violations.push(Violation::new(
                        ViolationKind::CapacityExceeded,
                        &task.id,
                        format!(
                            "{} requires {} {}, capacity {}",
                            task.id,
                            task.scalar_demand(),
                            SCALAR_RESOURCE,
                            cap
                        ),
                    ));
                }
            }
        }
        ResourcePool::Employees(_) => check_staffing(schedule, graph, pool, &mut violations),
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// One entry per task, matching duration. Returns entries keyed by task id.
fn check_coverage<'s>(
    schedule: &'s Schedule,
    graph: &TaskGraph,
    violations: &mut Vec<Violation>,
) -> FxHashMap<&'s str, &'s ScheduleEntry> {
    let mut by_id: FxHashMap<&str, &ScheduleEntry> = FxHashMap::default();

    for entry in &schedule.entries {
        let Some(task) = graph.get(&entry.task_id) else {
            violations.push(Violation::new(
                ViolationKind::UnknownTask,
                &entry.task_id,
                format!("entry for unknown task {}", entry.task_id),
            ));
            continue;
        };
        if by_id.insert(entry.task_id.as_str(), entry).is_some() {
            violations.push(Violation::new(
                ViolationKind::DuplicateEntry,
                &entry.task_id,
                format!("{} scheduled more than once", entry.task_id),
            ));
        }
        if entry.end < entry.start || entry.end - entry.start != task.duration {
            violations.push(Violation::new(
                ViolationKind::DurationMismatch,
                &entry.task_id,
                format!(
                    "{} runs [{}, {}) but lasts {}",
                    entry.task_id, entry.start, entry.end, task.duration
                ),
            ));
        }
    }

    for task in graph.tasks() {
        if !by_id.contains_key(task.id.as_str()) {
            violations.push(Violation::new(
                ViolationKind::MissingTask,
                &task.id,
                format!("{} was never scheduled", task.id),
            ));
        }
    }

    by_id
}

fn check_precedence(
    graph: &TaskGraph,
    by_id: &FxHashMap<&str, &ScheduleEntry>,
    violations: &mut Vec<Violation>,
) {
    for (idx, task) in graph.tasks().iter().enumerate() {
        let Some(entry) = by_id.get(task.id.as_str()) else {
            continue;
        };
        for &pred in graph.predecessors(idx) {
            let pred_id = graph.task(pred).id.as_str();
            if let Some(pred_entry) = by_id.get(pred_id) {
                if entry.start < pred_entry.end {
                    violations.push(Violation::new(
                        ViolationKind::Precedence,
                        &task.id,
                        format!(
                            "{} starts at {} before {} ends at {}",
                            task.id, entry.start, pred_id, pred_entry.end
                        ),
                    ));
                }
            }
        }
    }
}

fn check_staffing(
    schedule: &Schedule,
    graph: &TaskGraph,
    pool: &ResourcePool,
    violations: &mut Vec<Violation>,
) {
    let ResourcePool::Employees(roster) = pool else {
        return;
    };
    let skills_of: FxHashMap<&str, &[String]> = roster
        .iter()
        .map(|e| (e.name.as_str(), e.skills.as_slice()))
        .collect();

    for entry in &schedule.entries {
        let Some(task) = graph.get(&entry.task_id) else {
            continue;
        };

        if let Err(refusal) = audit_exclusivity(&entry.assignment) {
            violations.push(Violation::new(
                ViolationKind::Exclusivity,
                &task.id,
                format!("{}: {}", task.id, refusal),
            ));
        }

        for (skill, units) in task.sorted_demand() {
            let staffed: Vec<&String> = entry
                .assignment
                .iter()
                .filter(|a| a.skill == skill)
                .flat_map(|a| a.employees.iter())
                .collect();
            if staffed.len() < units as usize {
                violations.push(Violation::new(
                    ViolationKind::Understaffed,
                    &task.id,
                    format!(
                        "{} has {} of {} {} slot(s) staffed",
                        task.id,
                        staffed.len(),
                        units,
                        skill
                    ),
                ));
            }
            for name in staffed {
                let qualified = skills_of
                    .get(name.as_str())
                    .is_some_and(|skills| skills.iter().any(|s| s == skill));
                if !qualified {
                    violations.push(Violation::new(
                        ViolationKind::Unqualified,
                        &task.id,
                        format!("{} cannot fill {} on {}", name, skill, task.id),
                    ));
                }
            }
        }
    }

    for t in start_instants(schedule) {
        let mut holder: FxHashMap<&str, &str> = FxHashMap::default();
        let mut reported: FxHashSet<&str> = FxHashSet::default();
        for entry in active_at(schedule, t) {
            // Same-task repeats are reported as exclusivity breaches above
            let names: FxHashSet<&str> = entry
                .assignment
                .iter()
                .flat_map(|a| a.employees.iter().map(String::as_str))
                .collect();
            let mut names: Vec<&str> = names.into_iter().collect();
            names.sort();
            for name in names {
                if let Some(other) = holder.insert(name, entry.task_id.as_str()) {
                    if reported.insert(name) {
                        violations.push(Violation::new(
                            ViolationKind::DoubleBooking,
                            name,
                            format!(
                                "{} works on {} and {} at t={}",
                                name, other, entry.task_id, t
                            ),
                        ));
                    }
                }
            }
        }
    }
}

/// Distinct start times in ascending order. Usage only rises at a start, so
/// these are the only instants where a limit can first be broken.
fn start_instants(schedule: &Schedule) -> Vec<Time> {
    let mut instants: Vec<Time> = schedule.entries.iter().map(|e| e.start).collect();
    instants.sort_unstable();
    instants.dedup();
    instants
}

fn active_at(schedule: &Schedule, t: Time) -> impl Iterator<Item = &ScheduleEntry> {
    schedule
        .entries
        .iter()
        .filter(move |e| e.start <= t && t < e.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Employee, SkillAssignment, Task};

    fn graph() -> TaskGraph {
        TaskGraph::new(vec![
            Task::new("A", 4).with_demand("dev", 1),
            Task::new("B", 3).with_demand("dev", 1).with_predecessor("A"),
            Task::new("C", 2).with_demand("test", 1).with_predecessor("A"),
        ])
        .unwrap()
    }

    fn entry(task_id: &str, start: Time, end: Time, assignment: Vec<SkillAssignment>) -> ScheduleEntry {
        ScheduleEntry {
            task_id: task_id.to_string(),
            start,
            end,
            assignment,
        }
    }

    fn staffed(skill: &str, names: &[&str]) -> SkillAssignment {
        SkillAssignment::staffed(skill, names.iter().map(|n| n.to_string()).collect())
    }

    fn kinds(result: Result<(), Vec<Violation>>) -> Vec<ViolationKind> {
        result.unwrap_err().into_iter().map(|v| v.kind).collect()
    }

    #[test]
    fn test_valid_schedule_passes() {
        let schedule = Schedule::new(
            vec![
                entry("A", 0, 4, vec![]),
                entry("B", 4, 7, vec![]),
                entry("C", 4, 6, vec![]),
            ],
            0,
        );
        let pool = ResourcePool::skills([("dev", 1), ("test", 1)]);
        assert_eq!(verify_schedule(&schedule, &graph(), &pool), Ok(()));
    }

    #[test]
    fn test_reports_every_violation() {
        let schedule = Schedule::new(
            vec![
                entry("A", 0, 4, vec![]),
                entry("B", 2, 5, vec![]),
                entry("X", 0, 1, vec![]),
            ],
            0,
        );
        let pool = ResourcePool::skills([("dev", 1), ("test", 1)]);
        assert_eq!(
            kinds(verify_schedule(&schedule, &graph(), &pool)),
            vec![
                ViolationKind::UnknownTask,
                ViolationKind::MissingTask,
                ViolationKind::Precedence,
                ViolationKind::CapacityExceeded,
            ]
        );
    }

    #[test]
    fn test_duration_and_duplicates() {
        let schedule = Schedule::new(
            vec![
                entry("A", 0, 4, vec![]),
                entry("A", 4, 8, vec![]),
                entry("B", 8, 10, vec![]),
                entry("C", 8, 10, vec![]),
            ],
            0,
        );
        let pool = ResourcePool::scalar(2);
        assert_eq!(
            kinds(verify_schedule(&schedule, &graph(), &pool)),
            vec![ViolationKind::DuplicateEntry, ViolationKind::DurationMismatch]
        );
    }

    #[test]
    fn test_scalar_checks_each_task_alone() {
        let graph = TaskGraph::new(vec![
            Task::new("A1", 3).with_demand("units", 3),
            Task::new("A2", 3).with_demand("units", 3),
        ])
        .unwrap();
        let schedule = Schedule::new(
            vec![entry("A1", 0, 3, vec![]), entry("A2", 0, 3, vec![])],
            0,
        );
        assert!(verify_schedule(&schedule, &graph, &ResourcePool::scalar(4)).is_ok());
        assert_eq!(
            kinds(verify_schedule(&schedule, &graph, &ResourcePool::scalar(2))),
            vec![ViolationKind::CapacityExceeded, ViolationKind::CapacityExceeded]
        );
    }

    #[test]
    fn test_employee_violations() {
        let graph = TaskGraph::new(vec![
            Task::new("P", 3).with_demand("dev", 1).with_demand("test", 1),
            Task::new("Q", 2).with_demand("dev", 1),
        ])
        .unwrap();
        let pool = ResourcePool::employees(vec![
            Employee::new("Alice", &["dev", "test"]),
            Employee::new("Bob", &["dev"]),
        ]);
        let schedule = Schedule::new(
            vec![
                entry(
                    "P",
                    0,
                    3,
                    vec![staffed("dev", &["Alice"]), staffed("test", &["Alice"])],
                ),
                entry("Q", 1, 3, vec![staffed("dev", &["Alice"])]),
            ],
            0,
        );
        let violations = verify_schedule(&schedule, &graph, &pool).unwrap_err();
        let found: Vec<ViolationKind> = violations.iter().map(|v| v.kind).collect();
        assert_eq!(
            found,
            vec![ViolationKind::Exclusivity, ViolationKind::DoubleBooking]
        );
        assert_eq!(violations[1].entity_id, "Alice");
    }

    #[test]
    fn test_unqualified_and_understaffed() {
        let graph = TaskGraph::new(vec![Task::new("P", 3)
            .with_demand("dev", 1)
            .with_demand("test", 1)])
        .unwrap();
        let pool = ResourcePool::employees(vec![
            Employee::new("Alice", &["dev", "test"]),
            Employee::new("Bob", &["dev"]),
        ]);
        let schedule = Schedule::new(vec![entry("P", 0, 3, vec![staffed("test", &["Bob"])])], 0);
        assert_eq!(
            kinds(verify_schedule(&schedule, &graph, &pool)),
            vec![ViolationKind::Understaffed, ViolationKind::Unqualified]
        );
    }
}
