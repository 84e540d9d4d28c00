//! Resource pools and the admission policies derived from them.
//!
//! A [`ResourcePool`] is an immutable description of capacity. Each scheduling
//! run asks it for a fresh [`AdmissionPolicy`], which owns the mutable usage
//! counters (or busy set) for exactly that run.

use rustc_hash::FxHashMap;
use std::collections::HashMap;
use thiserror::Error;

use crate::graph::TaskGraph;
use crate::models::{Employee, SkillAssignment, Task};

use super::core::SchedulerError;
use super::staffing::{validate_roster_against, EmployeePolicy};

/// Label used for the single capacity of a scalar pool.
pub const SCALAR_RESOURCE: &str = "resource";

/// Why a ready task could not start at the current instant.
///
/// Refusals are transient: the task stays ready and is retried after the
/// next completion frees resources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionRefusal {
    #[error("skill {skill} has {available} free unit(s), {requested} requested")]
    SkillExhausted {
        skill: String,
        requested: u32,
        available: u32,
    },
    #[error("requirement {requested} exceeds scalar capacity {capacity}")]
    ScalarExceeded { requested: u64, capacity: u64 },
    #[error("only {free_qualified} free employee(s) hold {skill}, {needed} needed")]
    IncompleteEmployeeAssignment {
        skill: String,
        needed: u32,
        free_qualified: usize,
    },
    #[error("employee {employee} would fill both {first_skill} and {second_skill}")]
    ExclusivityViolation {
        employee: String,
        first_skill: String,
        second_skill: String,
    },
    #[error("{limit} task(s) already active")]
    ActiveLimitReached { limit: usize },
}

/// Feasibility test and bookkeeping applied before a task may start.
pub trait AdmissionPolicy {
    /// Commit resources for `task` if it fits right now.
    fn try_admit(&mut self, task: &Task) -> Result<Vec<SkillAssignment>, AdmissionRefusal>;

    /// Return the resources held by a completed task.
    fn release(&mut self, task: &Task, assignment: &[SkillAssignment]);

    /// Short usage summary for debug logging.
    fn usage_summary(&self) -> String;
}

/// Renewable resources available to a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourcePool {
    /// Capacity per skill; usage is tracked cumulatively across active tasks.
    Skills(FxHashMap<String, u32>),
    /// Named employees; each fills one skill slot of one task at a time.
    Employees(Vec<Employee>),
    /// One scalar capacity; a task fits iff its total demand fits. Nothing is
    /// tracked across concurrently active tasks.
    Scalar(u32),
}

impl ResourcePool {
    pub fn skills<I, S>(capacities: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self::Skills(
            capacities
                .into_iter()
                .map(|(skill, cap)| (skill.into(), cap))
                .collect(),
        )
    }

    pub fn employees(roster: Vec<Employee>) -> Self {
        Self::Employees(roster)
    }

    pub fn scalar(capacity: u32) -> Self {
        Self::Scalar(capacity)
    }

    /// Build a pool from exactly one of the optional descriptions.
    pub fn from_parts(
        capacities: Option<HashMap<String, u32>>,
        employees: Option<Vec<Employee>>,
        scalar_capacity: Option<u32>,
    ) -> Result<Self, SchedulerError> {
        match (capacities, employees, scalar_capacity) {
            (Some(caps), None, None) => Ok(Self::skills(caps)),
            (None, Some(roster), None) => Ok(Self::Employees(roster)),
            (None, None, Some(cap)) => Ok(Self::Scalar(cap)),
            _ => Err(SchedulerError::InvalidPool(
                "exactly one of capacities, employees or scalar_capacity must be given"
                    .to_string(),
            )),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Skills(_) => "skills",
            Self::Employees(_) => "employees",
            Self::Scalar(_) => "scalar",
        }
    }

    /// Total units of `skill` the pool can ever provide at once.
    pub fn capacity_of(&self, skill: &str) -> u64 {
        match self {
            Self::Skills(caps) => u64::from(caps.get(skill).copied().unwrap_or(0)),
            Self::Employees(roster) => roster.iter().filter(|e| e.has_skill(skill)).count() as u64,
            Self::Scalar(cap) => u64::from(*cap),
        }
    }

    /// Reject tasks that could never start, even with every resource free.
    pub fn validate(&self, graph: &TaskGraph) -> Result<(), SchedulerError> {
        match self {
            Self::Skills(caps) => {
                for task in graph.tasks() {
                    for (skill, units) in &task.demand {
                        let capacity = caps.get(skill).copied().unwrap_or(0);
                        if *units > capacity {
                            return Err(SchedulerError::ResourceCapacityExceeded {
                                task_id: task.id.clone(),
                                skill: skill.clone(),
                                demand: u64::from(*units),
                                capacity: u64::from(capacity),
                            });
                        }
                    }
                }
                Ok(())
            }
            Self::Employees(roster) => validate_roster_against(roster, graph),
            Self::Scalar(cap) => {
                for task in graph.tasks() {
                    if task.scalar_demand() > u64::from(*cap) {
                        return Err(SchedulerError::ResourceCapacityExceeded {
                            task_id: task.id.clone(),
                            skill: SCALAR_RESOURCE.to_string(),
                            demand: task.scalar_demand(),
                            capacity: u64::from(*cap),
                        });
                    }
                }
                Ok(())
            }
        }
    }

    /// Fresh per-run policy state borrowing this pool.
    pub fn admission_policy(&self) -> Box<dyn AdmissionPolicy + '_> {
        match self {
            Self::Skills(caps) => Box::new(CumulativeSkillPolicy::new(caps)),
            Self::Employees(roster) => Box::new(EmployeePolicy::new(roster)),
            Self::Scalar(cap) => Box::new(ScalarPolicy::new(*cap)),
        }
    }
}

/// Per-skill counters with multi-unit demand.
#[derive(Debug)]
pub struct CumulativeSkillPolicy<'a> {
    capacities: &'a FxHashMap<String, u32>,
    usage: FxHashMap<String, u32>,
}

impl<'a> CumulativeSkillPolicy<'a> {
    pub fn new(capacities: &'a FxHashMap<String, u32>) -> Self {
        Self {
            capacities,
            usage: FxHashMap::default(),
        }
    }

    #[inline]
    fn used(&self, skill: &str) -> u32 {
        self.usage.get(skill).copied().unwrap_or(0)
    }
}

impl AdmissionPolicy for CumulativeSkillPolicy<'_> {
    fn try_admit(&mut self, task: &Task) -> Result<Vec<SkillAssignment>, AdmissionRefusal> {
        let demand = task.sorted_demand();

        // All-or-nothing: check every skill before committing any
        for &(skill, units) in &demand {
            let capacity = self.capacities.get(skill).copied().unwrap_or(0);
            // used <= capacity always holds, so the subtraction cannot wrap
            let available = capacity.saturating_sub(self.used(skill));
            if units > available {
                return Err(AdmissionRefusal::SkillExhausted {
                    skill: skill.to_string(),
                    requested: units,
                    available,
                });
            }
        }

        for &(skill, units) in &demand {
            *self.usage.entry(skill.to_string()).or_insert(0) += units;
        }

        Ok(demand
            .into_iter()
            .map(|(skill, units)| SkillAssignment::units(skill, units))
            .collect())
    }

    fn release(&mut self, _task: &Task, assignment: &[SkillAssignment]) {
        for held in assignment {
            if let Some(used) = self.usage.get_mut(&held.skill) {
                *used = used.saturating_sub(held.units);
            }
        }
    }

    fn usage_summary(&self) -> String {
        let mut skills: Vec<&String> = self.capacities.keys().collect();
        skills.sort();
        skills
            .into_iter()
            .map(|s| format!("{}={}/{}", s, self.used(s), self.capacities[s]))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Single scalar capacity checked per task, with no cumulative tracking.
///
/// Weaker than [`CumulativeSkillPolicy`]: two tasks that each fit the
/// capacity may run together even if their sum does not.
#[derive(Debug, Clone, Copy)]
pub struct ScalarPolicy {
    capacity: u32,
}

impl ScalarPolicy {
    pub fn new(capacity: u32) -> Self {
        Self { capacity }
    }
}

impl AdmissionPolicy for ScalarPolicy {
    fn try_admit(&mut self, task: &Task) -> Result<Vec<SkillAssignment>, AdmissionRefusal> {
        let requested = task.scalar_demand();
        if requested > u64::from(self.capacity) {
            return Err(AdmissionRefusal::ScalarExceeded {
                requested,
                capacity: u64::from(self.capacity),
            });
        }
        if requested == 0 {
            return Ok(Vec::new());
        }
        // requested <= capacity, so it fits in u32
        Ok(vec![SkillAssignment::units(
            SCALAR_RESOURCE,
            requested as u32,
        )])
    }

    fn release(&mut self, _task: &Task, _assignment: &[SkillAssignment]) {}

    fn usage_summary(&self) -> String {
        format!("{}<={}", SCALAR_RESOURCE, self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_admission_and_release() {
        let pool = ResourcePool::skills([("dev", 2), ("test", 1)]);
        let ResourcePool::Skills(caps) = &pool else {
            unreachable!()
        };
        let mut policy = CumulativeSkillPolicy::new(caps);

        let pair = Task::new("D", 5).with_demand("dev", 2).with_demand("test", 1);
        let single = Task::new("B", 3).with_demand("dev", 1);

        let held = policy.try_admit(&pair).unwrap();
        assert_eq!(
            held,
            vec![
                SkillAssignment::units("dev", 2),
                SkillAssignment::units("test", 1)
            ]
        );
        assert_eq!(
            policy.try_admit(&single),
            Err(AdmissionRefusal::SkillExhausted {
                skill: "dev".to_string(),
                requested: 1,
                available: 0,
            })
        );
        assert_eq!(policy.usage_summary(), "dev=2/2 test=1/1");

        policy.release(&pair, &held);
        assert!(policy.try_admit(&single).is_ok());
        assert_eq!(policy.usage_summary(), "dev=1/2 test=0/1");
    }

    #[test]
    fn test_cumulative_refusal_commits_nothing() {
        let pool = ResourcePool::skills([("dev", 2), ("test", 0)]);
        let ResourcePool::Skills(caps) = &pool else {
            unreachable!()
        };
        let mut policy = CumulativeSkillPolicy::new(caps);
        let task = Task::new("X", 1).with_demand("dev", 1).with_demand("test", 1);
        assert!(policy.try_admit(&task).is_err());
        assert_eq!(policy.usage_summary(), "dev=0/2 test=0/0");
    }

    #[test]
    fn test_cumulative_full_width_capacity() {
        let pool = ResourcePool::skills([("dev", u32::MAX)]);
        let ResourcePool::Skills(caps) = &pool else {
            unreachable!()
        };
        let mut policy = CumulativeSkillPolicy::new(caps);
        let task = Task::new("wide", 1).with_demand("dev", u32::MAX);

        let held = policy.try_admit(&task).unwrap();
        assert_eq!(
            policy.try_admit(&task),
            Err(AdmissionRefusal::SkillExhausted {
                skill: "dev".to_string(),
                requested: u32::MAX,
                available: 0,
            })
        );
        policy.release(&task, &held);
        assert!(policy.try_admit(&task).is_ok());
    }

    #[test]
    fn test_scalar_policy_does_not_accumulate() {
        let mut policy = ScalarPolicy::new(4);
        let task = Task::new("A", 3).with_demand("units", 3);
        assert!(policy.try_admit(&task).is_ok());
        assert!(policy.try_admit(&task).is_ok());
        let big = Task::new("B", 1).with_demand("units", 5);
        assert_eq!(
            policy.try_admit(&big),
            Err(AdmissionRefusal::ScalarExceeded {
                requested: 5,
                capacity: 4
            })
        );
    }

    #[test]
    fn test_validate_capacity_exceeded() {
        let graph = TaskGraph::new(vec![Task::new("big", 2).with_demand("dev", 3)]).unwrap();
        let err = ResourcePool::skills([("dev", 2)]).validate(&graph).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::ResourceCapacityExceeded {
                task_id: "big".to_string(),
                skill: "dev".to_string(),
                demand: 3,
                capacity: 2,
            }
        );
    }

    #[test]
    fn test_validate_missing_skill_has_zero_capacity() {
        let graph = TaskGraph::new(vec![Task::new("ops", 2).with_demand("ops", 1)]).unwrap();
        let err = ResourcePool::skills([("dev", 2)]).validate(&graph).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::ResourceCapacityExceeded { capacity: 0, .. }
        ));
    }

    #[test]
    fn test_validate_scalar() {
        let graph = TaskGraph::new(vec![Task::new("A2", 2).with_demand("units", 3)]).unwrap();
        assert!(ResourcePool::scalar(4).validate(&graph).is_ok());
        assert!(matches!(
            ResourcePool::scalar(2).validate(&graph),
            Err(SchedulerError::ResourceCapacityExceeded { demand: 3, capacity: 2, .. })
        ));
    }

    #[test]
    fn test_from_parts_requires_exactly_one() {
        assert!(ResourcePool::from_parts(None, None, None).is_err());
        assert!(ResourcePool::from_parts(None, Some(vec![]), Some(2)).is_err());
        assert_eq!(
            ResourcePool::from_parts(None, None, Some(3)).unwrap(),
            ResourcePool::Scalar(3)
        );
        assert_eq!(ResourcePool::scalar(3).kind(), "scalar");
    }

    #[test]
    fn test_capacity_of() {
        let roster = vec![
            Employee::new("Alice", &["dev", "test"]),
            Employee::new("Bob", &["dev"]),
        ];
        let pool = ResourcePool::employees(roster);
        assert_eq!(pool.capacity_of("dev"), 2);
        assert_eq!(pool.capacity_of("test"), 1);
        assert_eq!(pool.capacity_of("ops"), 0);
    }
}
