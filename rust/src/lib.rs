//! Resource-constrained project scheduling engine.
//!
//! Greedy list scheduling of a precedence graph of tasks under renewable
//! resource limits, in parallel or serial mode, with pluggable priority rules
//! and three resource models (skill counters, a scalar capacity, or a roster
//! of named employees).

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::prelude::*;
use std::collections::HashMap;

pub mod comparison;
mod config;
pub mod graph;
pub mod logging;
mod models;
pub mod priority;
pub mod scheduler;
pub mod validation;

pub use comparison::{best_run, compare_runs};
pub use config::SchedulingConfig;
pub use graph::{GraphError, TaskGraph, TaskIdx};
pub use models::{
    DatedEntry, Employee, RunRecord, Schedule, ScheduleEntry, SkillAssignment, Task, Time,
};
pub use priority::{PriorityRule, UnknownRuleError};
pub use scheduler::{
    run_schedule, AdmissionPolicy, AdmissionRefusal, ListScheduler, Mode, ResourcePool,
    SchedulerError,
};
pub use validation::{verify_schedule, Violation, ViolationKind};

fn to_py_err(e: SchedulerError) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(e.to_string())
}

/// Validate the task list and pool shared by every Python entry point.
fn build_inputs(
    tasks: Vec<Task>,
    capacities: Option<HashMap<String, u32>>,
    employees: Option<Vec<Employee>>,
    scalar_capacity: Option<u32>,
) -> Result<(TaskGraph, ResourcePool), SchedulerError> {
    let graph = TaskGraph::new(tasks)?;
    let pool = ResourcePool::from_parts(capacities, employees, scalar_capacity)?;
    Ok((graph, pool))
}

/// Schedule a set of tasks.
///
/// Exactly one resource model must be given:
/// * `capacities` - units per skill, tracked cumulatively
/// * `employees` - named roster; one slot of one task per employee at a time
/// * `scalar_capacity` - a single limit checked against each task's total demand
///
/// # Returns
/// * Schedule with entries in admission order
///
/// # Raises
/// * ValueError for invalid input, an unknown rule or mode, or a run that
///   cannot complete
#[pyfunction]
#[pyo3(name = "run_schedule", signature = (tasks, config, capacities=None, employees=None, scalar_capacity=None))]
fn py_run_schedule(
    tasks: Vec<Task>,
    config: SchedulingConfig,
    capacities: Option<HashMap<String, u32>>,
    employees: Option<Vec<Employee>>,
    scalar_capacity: Option<u32>,
) -> PyResult<Schedule> {
    let (graph, pool) =
        build_inputs(tasks, capacities, employees, scalar_capacity).map_err(to_py_err)?;

    ListScheduler::from_config(&graph, &pool, &config)
        .and_then(|scheduler| scheduler.schedule())
        .map_err(to_py_err)
}

/// Run both modes under each rule and report makespan, cost and wall time.
///
/// `rules` defaults to shortest, longest, most_successors and most_important.
#[pyfunction]
#[pyo3(name = "compare_runs", signature = (tasks, capacities=None, employees=None, scalar_capacity=None, rules=None))]
fn py_compare_runs(
    tasks: Vec<Task>,
    capacities: Option<HashMap<String, u32>>,
    employees: Option<Vec<Employee>>,
    scalar_capacity: Option<u32>,
    rules: Option<Vec<String>>,
) -> PyResult<Vec<RunRecord>> {
    let (graph, pool) =
        build_inputs(tasks, capacities, employees, scalar_capacity).map_err(to_py_err)?;

    let rules = match rules {
        Some(names) => names
            .iter()
            .map(|name| name.parse::<PriorityRule>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| to_py_err(e.into()))?,
        None => PriorityRule::STANDARD.to_vec(),
    };

    compare_runs(&graph, &pool, &Mode::ALL, &rules).map_err(to_py_err)
}

/// The rcpsp.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<Task>()?;
    m.add_class::<Employee>()?;
    m.add_class::<SkillAssignment>()?;
    m.add_class::<ScheduleEntry>()?;
    m.add_class::<Schedule>()?;
    m.add_class::<DatedEntry>()?;
    m.add_class::<RunRecord>()?;

    // Config types
    m.add_class::<SchedulingConfig>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(py_run_schedule, m)?)?;
    m.add_function(wrap_pyfunction!(py_compare_runs, m)?)?;

    Ok(())
}
