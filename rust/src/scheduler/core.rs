//! Core list scheduler: one discrete-event loop for every mode and pool.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::SchedulingConfig;
use crate::graph::{GraphError, TaskGraph};
use crate::models::Schedule;
use crate::priority::{sort_ready, PriorityRule, UnknownRuleError};
use crate::{log_changes, log_checks, log_debug};

use super::admission::{AdmissionRefusal, ResourcePool};
use super::state::RunState;

/// Errors that can occur during scheduling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// No task can make progress while some remain unscheduled.
    #[error("Cyclic or unsatisfiable dependency, unscheduled tasks: {unscheduled:?}")]
    CyclicOrUnsatisfiableDependency { unscheduled: Vec<String> },
    #[error("Task {task_id} needs {demand} unit(s) of {skill} but the pool provides {capacity}")]
    ResourceCapacityExceeded {
        task_id: String,
        skill: String,
        demand: u64,
        capacity: u64,
    },
    #[error("Task {task_id} cannot be staffed by distinct employees")]
    UnstaffableTask { task_id: String },
    #[error("Invalid task graph: {0}")]
    InvalidTaskGraph(GraphError),
    #[error("Invalid resource pool: {0}")]
    InvalidPool(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    UnknownPriorityRule(#[from] UnknownRuleError),
    #[error(transparent)]
    UnknownMode(#[from] UnknownModeError),
}

impl From<GraphError> for SchedulerError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Cycle(unscheduled) => {
                SchedulerError::CyclicOrUnsatisfiableDependency { unscheduled }
            }
            other => SchedulerError::InvalidTaskGraph(other),
        }
    }
}

/// Raised when a mode name is neither parallel nor serial.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown scheduling mode: {0}")]
pub struct UnknownModeError(pub String);

/// How many tasks may be active at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Overlap bounded only by resources (and an optional cap).
    Parallel,
    /// One task at a time.
    Serial,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Parallel, Mode::Serial];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Serial => "serial",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parallel" => Ok(Self::Parallel),
            "serial" | "series" => Ok(Self::Serial),
            _ => Err(UnknownModeError(s.to_string())),
        }
    }
}

/// Greedy list scheduler over a validated task graph.
///
/// The run is a pure function of graph, pool, rule and mode: all mutable
/// state lives in a [`RunState`] and a fresh admission policy created inside
/// [`ListScheduler::schedule`].
#[derive(Debug, Clone)]
pub struct ListScheduler<'a> {
    graph: &'a TaskGraph,
    pool: &'a ResourcePool,
    rule: PriorityRule,
    mode: Mode,
    max_active: Option<usize>,
    verbosity: u8,
}

impl<'a> ListScheduler<'a> {
    pub fn new(graph: &'a TaskGraph, pool: &'a ResourcePool, rule: PriorityRule, mode: Mode) -> Self {
        Self {
            graph,
            pool,
            rule,
            mode,
            max_active: None,
            verbosity: 0,
        }
    }

    /// Create a scheduler from string configuration, rejecting unknown names.
    pub fn from_config(
        graph: &'a TaskGraph,
        pool: &'a ResourcePool,
        config: &SchedulingConfig,
    ) -> Result<Self, SchedulerError> {
        let rule = config.rule()?;
        let mode = config.parsed_mode()?;
        Ok(Self::new(graph, pool, rule, mode)
            .with_max_active(config.max_active)
            .with_verbosity(config.verbosity))
    }

    /// Cap simultaneously active tasks in parallel mode.
    pub fn with_max_active(mut self, max_active: Option<usize>) -> Self {
        self.max_active = max_active;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Effective concurrency limit: 1 for serial, the optional cap otherwise.
    pub fn active_limit(&self) -> Option<usize> {
        match self.mode {
            Mode::Serial => Some(1),
            Mode::Parallel => self.max_active,
        }
    }

    /// Run the simulation.
    pub fn schedule(&self) -> Result<Schedule, SchedulerError> {
        if self.active_limit() == Some(0) {
            return Err(SchedulerError::InvalidConfig(
                "max_active must be at least 1".to_string(),
            ));
        }

        // Structural faults abort before the clock starts
        self.pool.validate(self.graph)?;

        let graph = self.graph;
        let verbosity = self.verbosity;
        let limit = self.active_limit();
        let keys = self.rule.keys(graph);
        let mut policy = self.pool.admission_policy();
        let mut state = RunState::new(graph.len());

        log_debug!(
            verbosity,
            "Scheduling {} task(s): mode={}, rule={}, pool={}",
            graph.len(),
            self.mode,
            self.rule,
            self.pool.kind()
        );

        loop {
            for idx in state.release_completed(graph, policy.as_mut()) {
                log_changes!(
                    verbosity,
                    "  t={}: {} completed",
                    state.now,
                    graph.task(idx).id
                );
            }

            if state.is_complete() {
                break;
            }

            let ready = sort_ready(graph, &keys, &state.ready(graph));
            log_debug!(
                verbosity,
                "Time {}: ready={:?} usage: {}",
                state.now,
                ready.iter().map(|&i| graph.task(i).id.as_str()).collect::<Vec<_>>(),
                policy.usage_summary()
            );

            for idx in ready {
                let task = graph.task(idx);

                if let Some(limit) = limit {
                    if state.running.len() >= limit {
                        log_checks!(
                            verbosity,
                            "    Deferring {}: {}",
                            task.id,
                            AdmissionRefusal::ActiveLimitReached { limit }
                        );
                        break;
                    }
                }

                match policy.try_admit(task) {
                    Ok(assignment) => {
                        log_changes!(
                            verbosity,
                            "  t={}: started {} until {}",
                            state.now,
                            task.id,
                            state.now.saturating_add(task.duration)
                        );
                        state.start(graph, idx, assignment);
                    }
                    Err(refusal) => {
                        log_checks!(verbosity, "    Deferring {}: {}", task.id, refusal);
                    }
                }
            }

            match state.next_completion() {
                Some(next) => {
                    log_debug!(verbosity, "  Advancing clock {} -> {}", state.now, next);
                    state.now = next;
                }
                None => {
                    // Nothing running and nothing admitted: no future event can help
                    return Err(SchedulerError::CyclicOrUnsatisfiableDependency {
                        unscheduled: state.unscheduled_ids(graph),
                    });
                }
            }
        }

        let total_cost = state
            .entries
            .iter()
            .filter_map(|e| {
                graph
                    .get(&e.task_id)
                    .map(|t| e.duration().saturating_mul(t.cost_per_unit))
            })
            .fold(0u64, u64::saturating_add);
        let schedule = Schedule::new(state.entries, total_cost);

        log_changes!(
            verbosity,
            "Finished {} {}: makespan={}",
            self.mode,
            self.rule,
            schedule.makespan
        );

        Ok(schedule)
    }
}

/// Schedule `graph` on `pool` with the given rule and mode.
pub fn run_schedule(
    graph: &TaskGraph,
    pool: &ResourcePool,
    rule: PriorityRule,
    mode: Mode,
) -> Result<Schedule, SchedulerError> {
    ListScheduler::new(graph, pool, rule, mode).schedule()
}
