//! Named-employee admission with the one-slot-per-task exclusivity rule.
//!
//! A task's demand is expanded into skill slots (skills in name order, one
//! slot per unit). Slots are matched to distinct free employees with an
//! augmenting-path search, so a multi-skilled employee grabbed early for one
//! skill is moved to another slot when that is the only way to staff the task.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::TaskGraph;
use crate::models::{Employee, SkillAssignment, Task};

use super::admission::{AdmissionPolicy, AdmissionRefusal};
use super::core::SchedulerError;

/// Busy-set bookkeeping over a fixed roster.
#[derive(Debug)]
pub struct EmployeePolicy<'a> {
    roster: &'a [Employee],
    by_name: FxHashMap<&'a str, usize>,
    busy: FxHashSet<usize>,
}

impl<'a> EmployeePolicy<'a> {
    pub fn new(roster: &'a [Employee]) -> Self {
        let by_name = roster
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.as_str(), i))
            .collect();
        Self {
            roster,
            by_name,
            busy: FxHashSet::default(),
        }
    }

    fn free_employees(&self) -> Vec<usize> {
        (0..self.roster.len())
            .filter(|i| !self.busy.contains(i))
            .collect()
    }
}

impl AdmissionPolicy for EmployeePolicy<'_> {
    fn try_admit(&mut self, task: &Task) -> Result<Vec<SkillAssignment>, AdmissionRefusal> {
        let free = self.free_employees();
        let assignment = staff_task(self.roster, &free, task)?;
        audit_exclusivity(&assignment)?;

        for held in &assignment {
            for name in &held.employees {
                if let Some(&idx) = self.by_name.get(name.as_str()) {
                    self.busy.insert(idx);
                }
            }
        }
        Ok(assignment)
    }

    fn release(&mut self, _task: &Task, assignment: &[SkillAssignment]) {
        for held in assignment {
            for name in &held.employees {
                if let Some(idx) = self.by_name.get(name.as_str()) {
                    self.busy.remove(idx);
                }
            }
        }
    }

    fn usage_summary(&self) -> String {
        let mut busy: Vec<&str> = self
            .busy
            .iter()
            .map(|&i| self.roster[i].name.as_str())
            .collect();
        busy.sort();
        format!("busy=[{}] free={}", busy.join(", "), self.roster.len() - busy.len())
    }
}

/// Pick distinct employees from `free` covering every skill slot of `task`.
pub fn staff_task(
    roster: &[Employee],
    free: &[usize],
    task: &Task,
) -> Result<Vec<SkillAssignment>, AdmissionRefusal> {
    let demand = task.sorted_demand();
    let slots: Vec<&str> = demand
        .iter()
        .flat_map(|&(skill, units)| std::iter::repeat(skill).take(units as usize))
        .collect();

    let owners = match match_slots(roster, free, &slots) {
        Ok(owners) => owners,
        Err(slot) => {
            let skill = slots[slot];
            return Err(AdmissionRefusal::IncompleteEmployeeAssignment {
                skill: skill.to_string(),
                needed: task.demand_for(skill),
                free_qualified: free.iter().filter(|&&e| roster[e].has_skill(skill)).count(),
            });
        }
    };

    // Slots are grouped by skill, so owners can be split in demand order
    let mut assignment = Vec::with_capacity(demand.len());
    let mut cursor = 0;
    for (skill, units) in demand {
        let names = owners[cursor..cursor + units as usize]
            .iter()
            .map(|&e| roster[e].name.clone())
            .collect();
        cursor += units as usize;
        assignment.push(SkillAssignment::staffed(skill, names));
    }
    Ok(assignment)
}

/// Assign one distinct employee to every slot, or return the first slot that
/// could not be filled.
fn match_slots(roster: &[Employee], free: &[usize], slots: &[&str]) -> Result<Vec<usize>, usize> {
    let mut slot_owner: Vec<Option<usize>> = vec![None; slots.len()];
    let mut holder: FxHashMap<usize, usize> = FxHashMap::default();

    for slot in 0..slots.len() {
        let mut visited: FxHashSet<usize> = FxHashSet::default();
        if !augment(
            slot,
            roster,
            free,
            slots,
            &mut visited,
            &mut holder,
            &mut slot_owner,
        ) {
            return Err(slot);
        }
    }

    Ok(slot_owner.into_iter().flatten().collect())
}

fn augment(
    slot: usize,
    roster: &[Employee],
    free: &[usize],
    slots: &[&str],
    visited: &mut FxHashSet<usize>,
    holder: &mut FxHashMap<usize, usize>,
    slot_owner: &mut [Option<usize>],
) -> bool {
    let skill = slots[slot];

    // Unclaimed employees first, in roster order
    if let Some(&emp) = free
        .iter()
        .find(|&&e| roster[e].has_skill(skill) && !holder.contains_key(&e))
    {
        holder.insert(emp, slot);
        slot_owner[slot] = Some(emp);
        return true;
    }

    for &emp in free {
        if !roster[emp].has_skill(skill) || !visited.insert(emp) {
            continue;
        }
        let Some(other) = holder.get(&emp).copied() else {
            continue;
        };
        if augment(other, roster, free, slots, visited, holder, slot_owner) {
            holder.insert(emp, slot);
            slot_owner[slot] = Some(emp);
            return true;
        }
    }
    false
}

/// Reject an assignment that lists one employee under two skill slots.
pub fn audit_exclusivity(assignment: &[SkillAssignment]) -> Result<(), AdmissionRefusal> {
    let mut seen: FxHashMap<&str, &str> = FxHashMap::default();
    for held in assignment {
        for name in &held.employees {
            if let Some(first) = seen.insert(name.as_str(), held.skill.as_str()) {
                return Err(AdmissionRefusal::ExclusivityViolation {
                    employee: name.clone(),
                    first_skill: first.to_string(),
                    second_skill: held.skill.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Roster integrity plus a per-task check that staffing is possible with the
/// whole roster free.
pub(crate) fn validate_roster_against(
    roster: &[Employee],
    graph: &TaskGraph,
) -> Result<(), SchedulerError> {
    let mut names: FxHashSet<&str> = FxHashSet::default();
    for employee in roster {
        if !names.insert(employee.name.as_str()) {
            return Err(SchedulerError::InvalidPool(format!(
                "duplicate employee name: {}",
                employee.name
            )));
        }
        if employee.skills.is_empty() {
            return Err(SchedulerError::InvalidPool(format!(
                "employee {} has no skills",
                employee.name
            )));
        }
    }

    let everyone: Vec<usize> = (0..roster.len()).collect();
    for task in graph.tasks() {
        for (skill, units) in task.sorted_demand() {
            let headcount = roster.iter().filter(|e| e.has_skill(skill)).count() as u64;
            if u64::from(units) > headcount {
                return Err(SchedulerError::ResourceCapacityExceeded {
                    task_id: task.id.clone(),
                    skill: skill.to_string(),
                    demand: u64::from(units),
                    capacity: headcount,
                });
            }
        }
        if staff_task(roster, &everyone, task).is_err() {
            return Err(SchedulerError::UnstaffableTask {
                task_id: task.id.clone(),
            });
        }
    }
    Ok(())
}
