//! Immutable task arena with resolved precedence edges.
//!
//! Tasks are stored once, addressed by dense [`TaskIdx`] indices, and validated
//! on construction: ids, durations and demand entries must be well formed, every
//! predecessor must exist, and the precedence relation must be acyclic.

use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use thiserror::Error;

use crate::models::{Task, Time};

/// Dense index of a task inside a [`TaskGraph`].
pub type TaskIdx = usize;

/// Structural faults detected while building a task graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Task id must not be empty")]
    EmptyId,
    #[error("Duplicate task id: {0}")]
    DuplicateTask(String),
    #[error("Task {0} must have a positive duration")]
    ZeroDuration(String),
    #[error("Task {task_id} demands zero units of skill {skill}")]
    ZeroDemand { task_id: String, skill: String },
    #[error("Task {task_id} lists skill {skill} more than once")]
    DuplicateSkill { task_id: String, skill: String },
    #[error("Task {task_id} depends on unknown task {predecessor}")]
    UnknownPredecessor {
        task_id: String,
        predecessor: String,
    },
    #[error("Task {0} depends on itself")]
    SelfDependency(String),
    /// Tasks that can never become ready because of a precedence cycle.
    #[error("Circular dependency blocks tasks: {0:?}")]
    Cycle(Vec<String>),
    /// The summed durations do not fit the clock.
    #[error("Total duration of all tasks overflows the clock")]
    HorizonOverflow,
}

/// Validated, immutable set of tasks plus precedence edges.
///
/// One graph can be scheduled any number of times with different rules,
/// modes and pools; runs never write back into it.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: FxHashMap<String, TaskIdx>,
    predecessors: Vec<Vec<TaskIdx>>,
    successor_counts: Vec<usize>,
    total_duration: Time,
}

impl TaskGraph {
    /// Build and validate a graph. Task order is preserved.
    pub fn new(tasks: Vec<Task>) -> Result<Self, GraphError> {
        let mut index: FxHashMap<String, TaskIdx> =
            FxHashMap::with_capacity_and_hasher(tasks.len(), Default::default());

        for (idx, task) in tasks.iter().enumerate() {
            validate_task_fields(task)?;
            if index.insert(task.id.clone(), idx).is_some() {
                return Err(GraphError::DuplicateTask(task.id.clone()));
            }
        }

        let mut predecessors: Vec<Vec<TaskIdx>> = Vec::with_capacity(tasks.len());
        let mut successor_counts = vec![0usize; tasks.len()];

        for (idx, task) in tasks.iter().enumerate() {
            let mut preds: Vec<TaskIdx> = Vec::with_capacity(task.predecessors.len());
            for pred_id in &task.predecessors {
                let pred = *index
                    .get(pred_id)
                    .ok_or_else(|| GraphError::UnknownPredecessor {
                        task_id: task.id.clone(),
                        predecessor: pred_id.clone(),
                    })?;
                if pred == idx {
                    return Err(GraphError::SelfDependency(task.id.clone()));
                }
                // Repeated predecessor ids count once
                if !preds.contains(&pred) {
                    preds.push(pred);
                    successor_counts[pred] += 1;
                }
            }
            predecessors.push(preds);
        }

        check_acyclic(&tasks, &predecessors)?;

        // No run ends later than the serial makespan, so the clock cannot wrap
        let total_duration = tasks
            .iter()
            .try_fold(0, |sum: Time, t| sum.checked_add(t.duration))
            .ok_or(GraphError::HorizonOverflow)?;

        Ok(Self {
            tasks,
            index,
            predecessors,
            successor_counts,
            total_duration,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[inline]
    pub fn task(&self, idx: TaskIdx) -> &Task {
        &self.tasks[idx]
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[inline]
    pub fn index_of(&self, task_id: &str) -> Option<TaskIdx> {
        self.index.get(task_id).copied()
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.index_of(task_id).map(|idx| &self.tasks[idx])
    }

    #[inline]
    pub fn predecessors(&self, idx: TaskIdx) -> &[TaskIdx] {
        &self.predecessors[idx]
    }

    /// Number of distinct tasks that list `idx` as a predecessor.
    #[inline]
    pub fn successor_count(&self, idx: TaskIdx) -> usize {
        self.successor_counts[idx]
    }

    /// Sum of all durations: the makespan of any serial schedule and an
    /// upper bound on every end time.
    #[inline]
    pub fn total_duration(&self) -> Time {
        self.total_duration
    }
}

fn validate_task_fields(task: &Task) -> Result<(), GraphError> {
    if task.id.is_empty() {
        return Err(GraphError::EmptyId);
    }
    if task.duration == 0 {
        return Err(GraphError::ZeroDuration(task.id.clone()));
    }
    for (pos, (skill, units)) in task.demand.iter().enumerate() {
        if *units == 0 {
            return Err(GraphError::ZeroDemand {
                task_id: task.id.clone(),
                skill: skill.clone(),
            });
        }
        if task.demand[..pos].iter().any(|(s, _)| s == skill) {
            return Err(GraphError::DuplicateSkill {
                task_id: task.id.clone(),
                skill: skill.clone(),
            });
        }
    }
    Ok(())
}

/// Kahn's algorithm over predecessor edges.
///
/// On a cycle, every task left with unmet predecessors is reported, sorted by
/// id.
fn check_acyclic(tasks: &[Task], predecessors: &[Vec<TaskIdx>]) -> Result<(), GraphError> {
    let mut in_degree: Vec<usize> = predecessors.iter().map(|p| p.len()).collect();
    let mut successors: Vec<Vec<TaskIdx>> = vec![Vec::new(); tasks.len()];
    for (idx, preds) in predecessors.iter().enumerate() {
        for &pred in preds {
            successors[pred].push(idx);
        }
    }

    let mut queue: VecDeque<TaskIdx> = (0..tasks.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut released = 0;

    while let Some(idx) = queue.pop_front() {
        released += 1;
        for &succ in &successors[idx] {
            in_degree[succ] -= 1;
            if in_degree[succ] == 0 {
                queue.push_back(succ);
            }
        }
    }

    if released != tasks.len() {
        let mut blocked: Vec<String> = (0..tasks.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| tasks[i].id.clone())
            .collect();
        blocked.sort();
        return Err(GraphError::Cycle(blocked));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_tasks() -> Vec<Task> {
        vec![
            Task::new("A", 4).with_demand("dev", 1).with_importance(10),
            Task::new("B", 3)
                .with_demand("dev", 1)
                .with_predecessor("A")
                .with_importance(8),
            Task::new("C", 2)
                .with_demand("test", 1)
                .with_predecessor("A")
                .with_importance(6),
            Task::new("D", 5)
                .with_demand("dev", 1)
                .with_demand("test", 1)
                .with_predecessor("B")
                .with_predecessor("C")
                .with_importance(9),
            Task::new("E", 3)
                .with_demand("dev", 1)
                .with_predecessor("C")
                .with_importance(5),
        ]
    }

    #[test]
    fn test_successor_counts() {
        let graph = TaskGraph::new(scenario_tasks()).unwrap();
        let count = |id: &str| graph.successor_count(graph.index_of(id).unwrap());
        assert_eq!(count("A"), 2);
        assert_eq!(count("B"), 1);
        assert_eq!(count("C"), 2);
        assert_eq!(count("D"), 0);
        assert_eq!(count("E"), 0);
    }

    #[test]
    fn test_total_duration() {
        let graph = TaskGraph::new(scenario_tasks()).unwrap();
        assert_eq!(graph.total_duration(), 17);
        assert_eq!(graph.predecessors(3), &[1, 2]);
    }

    #[test]
    fn test_duration_sum_must_fit_clock() {
        let half = Time::MAX / 2 + 1;
        assert_eq!(
            TaskGraph::new(vec![Task::new("A", half), Task::new("B", half)]).unwrap_err(),
            GraphError::HorizonOverflow
        );
        let graph =
            TaskGraph::new(vec![Task::new("A", Time::MAX - 1), Task::new("B", 1)]).unwrap();
        assert_eq!(graph.total_duration(), Time::MAX);
    }

    #[test]
    fn test_two_task_cycle_rejected() {
        let tasks = vec![
            Task::new("A", 1).with_predecessor("B"),
            Task::new("B", 1).with_predecessor("A"),
        ];
        let err = TaskGraph::new(tasks).unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_cycle_reports_downstream_tasks() {
        let tasks = vec![
            Task::new("root", 1),
            Task::new("x", 1).with_predecessor("y").with_predecessor("root"),
            Task::new("y", 1).with_predecessor("x"),
            Task::new("tail", 1).with_predecessor("y"),
        ];
        let err = TaskGraph::new(tasks).unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle(vec!["tail".to_string(), "x".to_string(), "y".to_string()])
        );
    }

    #[test]
    fn test_unknown_predecessor() {
        let err = TaskGraph::new(vec![Task::new("A", 1).with_predecessor("ghost")]).unwrap_err();
        assert!(matches!(err, GraphError::UnknownPredecessor { .. }));
    }

    #[test]
    fn test_self_dependency() {
        let err = TaskGraph::new(vec![Task::new("A", 1).with_predecessor("A")]).unwrap_err();
        assert_eq!(err, GraphError::SelfDependency("A".to_string()));
    }

    #[test]
    fn test_duplicate_id() {
        let err = TaskGraph::new(vec![Task::new("A", 1), Task::new("A", 2)]).unwrap_err();
        assert_eq!(err, GraphError::DuplicateTask("A".to_string()));
    }

    #[test]
    fn test_field_validation() {
        assert_eq!(
            TaskGraph::new(vec![Task::new("A", 0)]).unwrap_err(),
            GraphError::ZeroDuration("A".to_string())
        );
        assert_eq!(
            TaskGraph::new(vec![Task::new("", 1)]).unwrap_err(),
            GraphError::EmptyId
        );
        assert!(matches!(
            TaskGraph::new(vec![Task::new("A", 1).with_demand("dev", 0)]).unwrap_err(),
            GraphError::ZeroDemand { .. }
        ));
        assert!(matches!(
            TaskGraph::new(vec![Task::new("A", 1)
                .with_demand("dev", 1)
                .with_demand("dev", 2)])
            .unwrap_err(),
            GraphError::DuplicateSkill { .. }
        ));
    }

    #[test]
    fn test_repeated_predecessor_counts_once() {
        let graph = TaskGraph::new(vec![
            Task::new("A", 1),
            Task::new("B", 1).with_predecessor("A").with_predecessor("A"),
        ])
        .unwrap();
        assert_eq!(graph.predecessors(1), &[0]);
        assert_eq!(graph.successor_count(0), 1);
    }
}
