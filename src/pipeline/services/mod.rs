//! Application services: the coordinator and the workflow driver.

mod coordinator;
mod roster;
mod workflow;

pub use coordinator::{
    CoordinatorError, CoordinatorResult, DEFAULT_MAX_ITERATIONS, RetryPolicy, StageCoordinator,
    StageVerdict, recorded_verdict,
};
pub use roster::AgentRoster;
pub use workflow::{
    AUTO_APPROVAL_COMMENT, PipelineError, PipelineResult, PipelineWorkflow, RunSubmission,
};
