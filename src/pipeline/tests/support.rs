//! Shared builders for pipeline unit tests.

use crate::pipeline::domain::{
    BranchName, CredentialsHandle, PipelineState, RepositoryFullName, RepositoryInfo, RunId,
    TaskBrief,
};
use std::path::Path;

pub fn repository() -> RepositoryInfo {
    RepositoryInfo {
        full_name: RepositoryFullName::new("octo/widgets").expect("valid repository"),
        default_branch: BranchName::new("main").expect("valid branch"),
    }
}

pub fn task() -> TaskBrief {
    TaskBrief::new("Add retry header", "Send X-Retry on every retried request")
        .expect("valid task")
        .with_description("Clients need to tell retries apart.")
}

pub fn state() -> PipelineState {
    PipelineState::new(
        RunId::new(),
        task(),
        repository(),
        CredentialsHandle::new("token-123"),
    )
}

pub fn state_in(tree: &Path) -> PipelineState {
    state().with_working_tree(tree)
}
