//! Mutable state of a single scheduling run.

use rustc_hash::FxHashSet;

use crate::graph::{TaskGraph, TaskIdx};
use crate::models::{ScheduleEntry, SkillAssignment, Time};

use super::admission::AdmissionPolicy;

/// A task that has started and not yet completed.
#[derive(Clone, Debug)]
pub struct RunningTask {
    pub idx: TaskIdx,
    pub end: Time,
    pub assignment: Vec<SkillAssignment>,
}

/// Simulation state owned by one run; never shared between runs.
#[derive(Clone, Debug)]
pub struct RunState {
    /// Simulated clock
    pub now: Time,
    pub finished: FxHashSet<TaskIdx>,
    pub running: Vec<RunningTask>,
    /// Tasks not yet started
    pub remaining: FxHashSet<TaskIdx>,
    /// Scheduling decisions in admission order
    pub entries: Vec<ScheduleEntry>,
}

impl RunState {
    pub fn new(task_count: usize) -> Self {
        Self {
            now: 0,
            finished: FxHashSet::default(),
            running: Vec::new(),
            remaining: (0..task_count).collect(),
            entries: Vec::with_capacity(task_count),
        }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty() && self.running.is_empty()
    }

    /// Finish every running task whose completion is due and hand its
    /// resources back. Returns the released tasks.
    pub fn release_completed(
        &mut self,
        graph: &TaskGraph,
        policy: &mut dyn AdmissionPolicy,
    ) -> Vec<TaskIdx> {
        let now = self.now;
        let (done, still_running): (Vec<RunningTask>, Vec<RunningTask>) = self
            .running
            .drain(..)
            .partition(|running| running.end <= now);
        self.running = still_running;

        done.into_iter()
            .map(|running| {
                policy.release(graph.task(running.idx), &running.assignment);
                self.finished.insert(running.idx);
                running.idx
            })
            .collect()
    }

    /// Unstarted tasks whose predecessors have all finished.
    pub fn ready(&self, graph: &TaskGraph) -> Vec<TaskIdx> {
        self.remaining
            .iter()
            .copied()
            .filter(|&idx| {
                graph
                    .predecessors(idx)
                    .iter()
                    .all(|pred| self.finished.contains(pred))
            })
            .collect()
    }

    /// Start a task at the current instant and record its entry.
    pub fn start(&mut self, graph: &TaskGraph, idx: TaskIdx, assignment: Vec<SkillAssignment>) {
        let task = graph.task(idx);
        // Never saturates: every end is bounded by the graph's total duration
        let end = self.now.saturating_add(task.duration);
        self.remaining.remove(&idx);
        self.entries.push(ScheduleEntry {
            task_id: task.id.clone(),
            start: self.now,
            end,
            assignment: assignment.clone(),
        });
        self.running.push(RunningTask {
            idx,
            end,
            assignment,
        });
    }

    /// Earliest completion among running tasks: the next event time.
    pub fn next_completion(&self) -> Option<Time> {
        self.running.iter().map(|r| r.end).min()
    }

    /// Ids of tasks that never started, sorted.
    pub fn unscheduled_ids(&self, graph: &TaskGraph) -> Vec<String> {
        let mut ids: Vec<String> = self
            .remaining
            .iter()
            .map(|&idx| graph.task(idx).id.clone())
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use crate::scheduler::ResourcePool;

    fn chain() -> TaskGraph {
        TaskGraph::new(vec![
            Task::new("a", 2).with_demand("dev", 1),
            Task::new("b", 3).with_demand("dev", 1).with_predecessor("a"),
        ])
        .unwrap()
    }

    #[test]
    fn test_ready_requires_finished_predecessors() {
        let graph = chain();
        let pool = ResourcePool::skills([("dev", 1)]);
        let mut policy = pool.admission_policy();
        let mut state = RunState::new(graph.len());
        assert_eq!(state.ready(&graph), vec![0]);

        let held = policy.try_admit(graph.task(0)).unwrap();
        state.start(&graph, 0, held);
        // a is running, not finished
        assert!(state.ready(&graph).is_empty());
        assert_eq!(state.next_completion(), Some(2));

        state.now = 2;
        assert_eq!(state.release_completed(&graph, policy.as_mut()), vec![0]);
        assert_eq!(state.ready(&graph), vec![1]);
        assert!(policy.try_admit(graph.task(1)).is_ok());
    }

    #[test]
    fn test_unscheduled_ids_sorted() {
        let graph = chain();
        let state = RunState::new(graph.len());
        assert_eq!(state.unscheduled_ids(&graph), vec!["a", "b"]);
        assert!(!state.is_complete());
        assert_eq!(state.next_completion(), None);
    }
}
