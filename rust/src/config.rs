//! Configuration types for scheduling runs.

use pyo3::prelude::*;

use crate::logging::verbosity_name;
use crate::priority::{PriorityRule, UnknownRuleError};
use crate::scheduler::{Mode, UnknownModeError};

/// Rule, mode and logging selection for a run.
#[pyclass]
#[derive(Clone, Debug)]
pub struct SchedulingConfig {
    /// Priority rule: "shortest", "longest", "most_successors", "most_important" or "cheapest"
    #[pyo3(get, set)]
    pub priority_rule: String,
    /// Admission mode: "parallel" or "serial"
    #[pyo3(get, set)]
    pub mode: String,
    /// Cap on simultaneously active tasks in parallel mode (None = resources only)
    #[pyo3(get, set)]
    pub max_active: Option<usize>,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            priority_rule: PriorityRule::Shortest.name().to_string(),
            mode: Mode::Parallel.name().to_string(),
            max_active: None,
            verbosity: 0,
        }
    }
}

impl SchedulingConfig {
    pub fn rule(&self) -> Result<PriorityRule, UnknownRuleError> {
        self.priority_rule.parse()
    }

    pub fn parsed_mode(&self) -> Result<Mode, UnknownModeError> {
        self.mode.parse()
    }
}

#[pymethods]
impl SchedulingConfig {
    #[new]
    #[pyo3(signature = (priority_rule=None, mode=None, max_active=None, verbosity=None))]
    fn new(
        priority_rule: Option<String>,
        mode: Option<String>,
        max_active: Option<usize>,
        verbosity: Option<u8>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            priority_rule: priority_rule.unwrap_or(defaults.priority_rule),
            mode: mode.unwrap_or(defaults.mode),
            max_active,
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "SchedulingConfig(priority_rule={:?}, mode={:?}, max_active={:?}, verbosity={})",
            self.priority_rule,
            self.mode,
            self.max_active,
            verbosity_name(self.verbosity)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = SchedulingConfig::default();
        assert_eq!(config.rule(), Ok(PriorityRule::Shortest));
        assert_eq!(config.parsed_mode(), Ok(Mode::Parallel));
        assert_eq!(config.max_active, None);
    }

    #[test]
    fn test_series_alias_and_bad_values() {
        let config = SchedulingConfig {
            priority_rule: "fastest".to_string(),
            mode: "series".to_string(),
            max_active: None,
            verbosity: 0,
        };
        assert_eq!(config.parsed_mode(), Ok(Mode::Serial));
        assert!(config.rule().is_err());
    }
}
