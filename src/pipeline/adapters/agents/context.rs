//! Context stage agent.
//!
//! Reads the repository's local mirror, not the run's working tree, so it
//! never observes in-flight changes of any run.

use async_trait::async_trait;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::pipeline::{
    domain::{AgentKind, RepositoryContext, StagePayload, StageReport},
    ports::{StageAgent, StageAgentError, StageContext},
};

/// Upper bound on listed files.
const MAX_LISTED_FILES: usize = 500;

const MANIFEST_NAMES: &[&str] = &[
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
    "requirements.txt",
    "setup.py",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "composer.json",
    "Gemfile",
];

/// Lists files and dependency manifests of the target repository.
#[derive(Debug, Clone)]
pub struct ContextAgent {
    mirror_root: PathBuf,
}

impl ContextAgent {
    /// Creates an agent reading mirrors laid out as `<root>/<owner>/<repo>`.
    #[must_use]
    pub fn new(mirror_root: impl Into<PathBuf>) -> Self {
        Self {
            mirror_root: mirror_root.into(),
        }
    }

    fn mirror_of(&self, full_name: &str) -> PathBuf {
        full_name
            .split('/')
            .fold(self.mirror_root.clone(), |path, segment| path.join(segment))
    }
}

fn list_repository(root: &Path) -> Result<RepositoryContext, ignore::Error> {
    let mut context = RepositoryContext::default();
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .sort_by_file_path(|left, right| left.cmp(right))
        .build();
    for entry in walker {
        let file = entry?;
        if !file.file_type().is_some_and(|kind| kind.is_file()) {
            continue;
        }
        let Ok(relative) = file.path().strip_prefix(root) else {
            continue;
        };
        let name = relative.to_string_lossy().into_owned();
        let is_manifest = file
            .file_name()
            .to_str()
            .is_some_and(|file_name| MANIFEST_NAMES.contains(&file_name));
        if is_manifest {
            context.manifests.push(name.clone());
        }
        if context.files.len() < MAX_LISTED_FILES {
            context.files.push(name);
        } else {
            context.truncated = true;
        }
    }
    Ok(context)
}

#[async_trait]
impl StageAgent for ContextAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Context
    }

    async fn execute(&self, context: &StageContext) -> Result<StageReport, StageAgentError> {
        let mirror = self.mirror_of(context.repository().full_name.as_str());
        if !mirror.is_dir() {
            warn!(
                run_id = %context.run_id(),
                mirror = %mirror.display(),
                "no repository mirror, continuing without context"
            );
            return Ok(StageReport::success(StagePayload::Context(
                RepositoryContext::default(),
            )));
        }

        let listing = tokio::task::spawn_blocking(move || list_repository(&mirror))
            .await
            .map_err(StageAgentError::collaborator)?;
        match listing {
            Ok(repository) => {
                debug!(
                    run_id = %context.run_id(),
                    files = repository.files.len(),
                    manifests = repository.manifests.len(),
                    "repository context gathered"
                );
                Ok(StageReport::success(StagePayload::Context(repository)))
            }
            Err(err) => Ok(StageReport::failure(format!(
                "failed to read repository: {err}"
            ))),
        }
    }
}
