//! List scheduler for resource-constrained task graphs.
//!
//! One discrete-event loop serves both parallel and serial modes; the pool
//! decides, through an [`AdmissionPolicy`], whether a ready task may start.

mod admission;
mod core;
mod staffing;
mod state;

pub use admission::{
    AdmissionPolicy, AdmissionRefusal, CumulativeSkillPolicy, ResourcePool, ScalarPolicy,
    SCALAR_RESOURCE,
};
pub use core::{run_schedule, ListScheduler, Mode, SchedulerError, UnknownModeError};
pub use staffing::{audit_exclusivity, staff_task, EmployeePolicy};
pub use state::{RunState, RunningTask};
