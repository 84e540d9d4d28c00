//! Core data types for the scheduling engine.

use chrono::{Days, NaiveDate};
use pyo3::prelude::*;

/// Simulated time, in abstract integer units (one unit = one day when projected).
pub type Time = u64;

/// A task to be scheduled.
///
/// Start and end times are never stored here; they are produced per run as
/// [`ScheduleEntry`] records so one task set can be reused across runs.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub duration: Time,
    /// Required units per skill.
    #[pyo3(get, set)]
    pub demand: Vec<(String, u32)>,
    #[pyo3(get, set)]
    pub predecessors: Vec<String>,
    /// Importance weight, only read by priority rules.
    #[pyo3(get, set)]
    pub importance: i32,
    #[pyo3(get, set)]
    pub cost_per_unit: u64,
}

impl Task {
    /// Create a task with no demand, no predecessors and zero weight/cost.
    pub fn new(id: impl Into<String>, duration: Time) -> Self {
        Self {
            id: id.into(),
            duration,
            demand: Vec::new(),
            predecessors: Vec::new(),
            importance: 0,
            cost_per_unit: 0,
        }
    }

    pub fn with_demand(mut self, skill: &str, units: u32) -> Self {
        self.demand.push((skill.to_string(), units));
        self
    }

    pub fn with_predecessor(mut self, task_id: &str) -> Self {
        self.predecessors.push(task_id.to_string());
        self
    }

    pub fn with_importance(mut self, importance: i32) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_cost_per_unit(mut self, cost_per_unit: u64) -> Self {
        self.cost_per_unit = cost_per_unit;
        self
    }

    /// Units demanded for one skill (0 if the task does not need it).
    pub fn demand_for(&self, skill: &str) -> u32 {
        self.demand
            .iter()
            .filter(|(s, _)| s == skill)
            .map(|(_, units)| *units)
            .sum()
    }

    /// Total units over all skills; the requirement seen by a scalar pool.
    pub fn scalar_demand(&self) -> u64 {
        self.demand.iter().map(|(_, units)| u64::from(*units)).sum()
    }

    /// Demand entries ordered by skill name.
    pub fn sorted_demand(&self) -> Vec<(&str, u32)> {
        let mut demand: Vec<(&str, u32)> = self
            .demand
            .iter()
            .map(|(skill, units)| (skill.as_str(), *units))
            .collect();
        demand.sort_by(|a, b| a.0.cmp(b.0));
        demand
    }
}

#[pymethods]
impl Task {
    #[new]
    #[pyo3(signature = (
        id,
        duration,
        demand,
        predecessors=Vec::new(),
        importance=0,
        cost_per_unit=0
    ))]
    fn py_new(
        id: String,
        duration: Time,
        demand: Vec<(String, u32)>,
        predecessors: Vec<String>,
        importance: i32,
        cost_per_unit: u64,
    ) -> Self {
        Self {
            id,
            duration,
            demand,
            predecessors,
            importance,
            cost_per_unit,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Task(id={:?}, duration={}, demand={:?}, preds={})",
            self.id,
            self.duration,
            self.demand,
            self.predecessors.len()
        )
    }
}

/// A named worker holding one or more skills.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Employee {
    #[pyo3(get, set)]
    pub name: String,
    #[pyo3(get, set)]
    pub skills: Vec<String>,
}

impl Employee {
    pub fn new(name: impl Into<String>, skills: &[&str]) -> Self {
        Self {
            name: name.into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[inline]
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s == skill)
    }
}

#[pymethods]
impl Employee {
    #[new]
    fn py_new(name: String, skills: Vec<String>) -> Self {
        Self { name, skills }
    }

    fn __repr__(&self) -> String {
        format!("Employee(name={:?}, skills={:?})", self.name, self.skills)
    }
}

/// Resources granted to one task for one skill.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkillAssignment {
    #[pyo3(get)]
    pub skill: String,
    #[pyo3(get)]
    pub units: u32,
    /// Named employees filling the slots (empty for counted and scalar pools).
    #[pyo3(get)]
    pub employees: Vec<String>,
}

impl SkillAssignment {
    pub fn units(skill: &str, units: u32) -> Self {
        Self {
            skill: skill.to_string(),
            units,
            employees: Vec::new(),
        }
    }

    pub fn staffed(skill: &str, employees: Vec<String>) -> Self {
        Self {
            skill: skill.to_string(),
            units: employees.len() as u32,
            employees,
        }
    }
}

#[pymethods]
impl SkillAssignment {
    fn __repr__(&self) -> String {
        if self.employees.is_empty() {
            format!("SkillAssignment(skill={:?}, units={})", self.skill, self.units)
        } else {
            format!(
                "SkillAssignment(skill={:?}, employees={:?})",
                self.skill, self.employees
            )
        }
    }
}

/// One scheduling decision: when a task runs and what it holds.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleEntry {
    #[pyo3(get)]
    pub task_id: String,
    #[pyo3(get)]
    pub start: Time,
    #[pyo3(get)]
    pub end: Time,
    #[pyo3(get)]
    pub assignment: Vec<SkillAssignment>,
}

#[pymethods]
impl ScheduleEntry {
    #[getter]
    pub fn duration(&self) -> Time {
        self.end - self.start
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduleEntry(task_id={:?}, start={}, end={})",
            self.task_id, self.start, self.end
        )
    }
}

/// A task's interval projected onto the calendar.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatedEntry {
    #[pyo3(get)]
    pub task_id: String,
    #[pyo3(get)]
    pub start_date: NaiveDate,
    #[pyo3(get)]
    pub end_date: NaiveDate,
}

#[pymethods]
impl DatedEntry {
    fn __repr__(&self) -> String {
        format!(
            "DatedEntry(task_id={:?}, start={}, end={})",
            self.task_id, self.start_date, self.end_date
        )
    }
}

/// Result of one scheduling run. Immutable once produced.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Entries in the order the scheduler admitted them.
    #[pyo3(get)]
    pub entries: Vec<ScheduleEntry>,
    #[pyo3(get)]
    pub makespan: Time,
    #[pyo3(get)]
    pub total_cost: u64,
}

impl Schedule {
    pub fn new(entries: Vec<ScheduleEntry>, total_cost: u64) -> Self {
        let makespan = entries.iter().map(|e| e.end).max().unwrap_or(0);
        Self {
            entries,
            makespan,
            total_cost,
        }
    }

    pub fn entry(&self, task_id: &str) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.task_id == task_id)
    }

    /// (task id, start, end) triples in admission order.
    pub fn intervals(&self) -> Vec<(&str, Time, Time)> {
        self.entries
            .iter()
            .map(|e| (e.task_id.as_str(), e.start, e.end))
            .collect()
    }
}

#[pymethods]
impl Schedule {
    /// Project every entry onto the calendar, one time unit per day.
    pub fn to_calendar(&self, project_start: NaiveDate) -> Vec<DatedEntry> {
        self.entries
            .iter()
            .map(|e| DatedEntry {
                task_id: e.task_id.clone(),
                start_date: project_start
                    .checked_add_days(Days::new(e.start))
                    .unwrap_or(NaiveDate::MAX),
                end_date: project_start
                    .checked_add_days(Days::new(e.end))
                    .unwrap_or(NaiveDate::MAX),
            })
            .collect()
    }

    fn __len__(&self) -> usize {
        self.entries.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "Schedule(entries={}, makespan={}, total_cost={})",
            self.entries.len(),
            self.makespan,
            self.total_cost
        )
    }
}

/// One row of a mode x rule comparison.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct RunRecord {
    #[pyo3(get)]
    pub mode: String,
    #[pyo3(get)]
    pub rule: String,
    #[pyo3(get)]
    pub makespan: Time,
    #[pyo3(get)]
    pub total_cost: u64,
    #[pyo3(get)]
    pub elapsed_secs: f64,
}

#[pymethods]
impl RunRecord {
    fn __repr__(&self) -> String {
        format!(
            "RunRecord(mode={:?}, rule={:?}, makespan={}, elapsed={:.6}s)",
            self.mode, self.rule, self.makespan, self.elapsed_secs
        )
    }
}
