//! Priority rules for ordering ready tasks.
//!
//! Implements the list-scheduling heuristics:
//! - `shortest`: shortest duration first (SPT)
//! - `longest`: longest duration first (LPT)
//! - `most_successors`: most direct dependents first
//! - `most_important`: highest importance weight first
//! - `cheapest`: lowest cost per time unit first
//!
//! Every rule maps a task to an integer key sorted ascending. Equal keys fall
//! back to task id so runs are reproducible.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::graph::{TaskGraph, TaskIdx};

/// Raised when a rule name does not match any built-in rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown priority rule: {0}")]
pub struct UnknownRuleError(pub String);

/// Ordering heuristic used to rank ready tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriorityRule {
    Shortest,
    Longest,
    MostSuccessors,
    MostImportant,
    Cheapest,
}

impl PriorityRule {
    /// The four rules compared by default.
    pub const STANDARD: [PriorityRule; 4] = [
        PriorityRule::Shortest,
        PriorityRule::Longest,
        PriorityRule::MostSuccessors,
        PriorityRule::MostImportant,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Shortest => "shortest",
            Self::Longest => "longest",
            Self::MostSuccessors => "most_successors",
            Self::MostImportant => "most_important",
            Self::Cheapest => "cheapest",
        }
    }

    /// Sort key for one task (lower = scheduled earlier).
    pub fn key(&self, graph: &TaskGraph, idx: TaskIdx) -> i64 {
        let task = graph.task(idx);
        // Values past i64::MAX clamp so the ordering never flips sign
        let duration = i64::try_from(task.duration).unwrap_or(i64::MAX);
        match self {
            Self::Shortest => duration,
            Self::Longest => -duration,
            Self::MostSuccessors => {
                -i64::try_from(graph.successor_count(idx)).unwrap_or(i64::MAX)
            }
            Self::MostImportant => -i64::from(task.importance),
            Self::Cheapest => i64::try_from(task.cost_per_unit).unwrap_or(i64::MAX),
        }
    }

    /// Keys for every task, indexed by [`TaskIdx`]. None of the rules depend
    /// on simulated time, so a run computes these once.
    pub fn keys(&self, graph: &TaskGraph) -> Vec<i64> {
        (0..graph.len()).map(|idx| self.key(graph, idx)).collect()
    }
}

impl fmt::Display for PriorityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PriorityRule {
    type Err = UnknownRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shortest" | "spt" => Ok(Self::Shortest),
            "longest" | "lpt" => Ok(Self::Longest),
            "most_successors" | "successors" => Ok(Self::MostSuccessors),
            "most_important" | "important" => Ok(Self::MostImportant),
            "cheapest" | "cost" => Ok(Self::Cheapest),
            _ => Err(UnknownRuleError(s.to_string())),
        }
    }
}

/// Composite sort key: rule key first, then task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PriorityKey<'a> {
    key: i64,
    task_id: &'a str,
    idx: TaskIdx,
}

/// Sort ready task indices by precomputed rule keys (most urgent first).
pub fn sort_ready(graph: &TaskGraph, keys: &[i64], ready: &[TaskIdx]) -> Vec<TaskIdx> {
    let mut ranked: Vec<PriorityKey<'_>> = ready
        .iter()
        .map(|&idx| PriorityKey {
            key: keys[idx],
            task_id: graph.task(idx).id.as_str(),
            idx,
        })
        .collect();
    ranked.sort();
    ranked.into_iter().map(|k| k.idx).collect()
}
