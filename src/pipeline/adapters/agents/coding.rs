//! Code-generation stage agent.
//!
//! The model answers with a JSON array of whole-file changes which are
//! written into the run's working tree. Paths must stay inside the tree.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::prompts;
use crate::pipeline::{
    domain::{AgentKind, CodeChanges, FileChange, StagePayload, StageReport},
    ports::{LanguageModel, StageAgent, StageAgentError, StageContext},
};

/// Reasons a model response cannot be applied.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChangeSetError {
    /// The response is not a JSON list of file changes.
    #[error("model response is not a list of file changes: {0}")]
    Malformed(String),

    /// The response contains no changes.
    #[error("model returned no file changes")]
    Empty,

    /// A path is absolute or escapes the working tree.
    #[error("refusing to write outside the working tree: {0}")]
    UnsafePath(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChangeResponse {
    List(Vec<FileChange>),
    Wrapped { changes: Vec<FileChange> },
}

/// Parses a model response, tolerating a surrounding Markdown code fence.
///
/// # Errors
///
/// Returns [`ChangeSetError::Malformed`] or [`ChangeSetError::Empty`].
pub fn parse_changes(response: &str) -> Result<Vec<FileChange>, ChangeSetError> {
    let body = strip_code_fence(response.trim());
    let parsed: ChangeResponse =
        serde_json::from_str(body).map_err(|err| ChangeSetError::Malformed(err.to_string()))?;
    let changes = match parsed {
        ChangeResponse::List(changes) | ChangeResponse::Wrapped { changes } => changes,
    };
    if changes.is_empty() {
        return Err(ChangeSetError::Empty);
    }
    Ok(changes)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(opened) = text.strip_prefix("```") else {
        return text;
    };
    let without_language = opened.split_once('\n').map_or("", |(_, rest)| rest);
    without_language
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_language)
        .trim()
}

/// Resolves `relative` below `root`, rejecting absolute paths and `..`.
///
/// # Errors
///
/// Returns [`ChangeSetError::UnsafePath`] for anything that could leave
/// `root`.
pub fn resolve_inside(root: &Path, relative: &str) -> Result<PathBuf, ChangeSetError> {
    let candidate = Path::new(relative);
    let mut has_normal = false;
    for component in candidate.components() {
        match component {
            Component::Normal(_) => has_normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ChangeSetError::UnsafePath(relative.to_owned()));
            }
        }
    }
    if !has_normal {
        return Err(ChangeSetError::UnsafePath(relative.to_owned()));
    }
    Ok(root.join(candidate))
}

async fn write_change(root: &Path, change: &FileChange) -> Result<(), StageAgentError> {
    let target = resolve_inside(root, &change.path).map_err(StageAgentError::collaborator)?;
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(StageAgentError::collaborator)?;
    }
    tokio::fs::write(&target, change.content.as_bytes())
        .await
        .map_err(StageAgentError::collaborator)
}

/// Generates code with the model and writes it to the working tree.
pub struct CodingAgent<M>
where
    M: LanguageModel,
{
    model: Arc<M>,
}

impl<M> CodingAgent<M>
where
    M: LanguageModel,
{
    /// Creates a coding agent backed by `model`.
    #[must_use]
    pub const fn new(model: Arc<M>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M> StageAgent for CodingAgent<M>
where
    M: LanguageModel,
{
    fn kind(&self) -> AgentKind {
        AgentKind::Coding
    }

    async fn execute(&self, context: &StageContext) -> Result<StageReport, StageAgentError> {
        let root = context.require_working_tree()?;
        let prompt = prompts::coding(context).map_err(StageAgentError::collaborator)?;
        let response = match self.model.complete(&prompt).await {
            Ok(response) => response,
            Err(err) => {
                warn!(run_id = %context.run_id(), error = %err, "coding model call failed");
                return Ok(StageReport::failure(format!("code generation failed: {err}")));
            }
        };

        let changes = match parse_changes(&response) {
            Ok(changes) => changes,
            Err(err) => return Ok(StageReport::failure(err.to_string())),
        };
        if let Some(unsafe_change) = changes
            .iter()
            .find(|change| resolve_inside(root, &change.path).is_err())
        {
            return Ok(StageReport::failure(
                ChangeSetError::UnsafePath(unsafe_change.path.clone()).to_string(),
            ));
        }

        for change in &changes {
            write_change(root, change).await?;
        }
        info!(
            run_id = %context.run_id(),
            files = changes.len(),
            iteration = context.iteration(),
            "code changes applied"
        );
        Ok(StageReport::success(StagePayload::Coding(CodeChanges {
            changes,
        })))
    }
}
