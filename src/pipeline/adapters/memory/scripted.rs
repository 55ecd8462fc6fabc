//! Scripted collaborators for tests and deterministic local flows.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use crate::pipeline::{
    domain::{
        AgentKind, CodeChanges, RepositoryContext, ResearchFindings, SecurityReport, StagePayload,
        StageReport, SubmissionReceipt, TestReport,
    },
    ports::{
        ChangeSubmitter, LanguageModel, LanguageModelError, StageAgent, StageAgentError,
        StageContext, SubmissionError, SubmissionRequest,
    },
};

type ScriptedResponse = Result<StageReport, StageAgentError>;

/// Stage agent that replays queued responses.
///
/// Responses are consumed in order; the last one repeats once the queue is
/// empty. With nothing queued the agent reports success with an empty
/// payload.
#[derive(Debug, Clone)]
pub struct ScriptedStageAgent {
    kind: AgentKind,
    state: Arc<RwLock<ScriptedAgentState>>,
}

#[derive(Debug, Default)]
struct ScriptedAgentState {
    queue: VecDeque<ScriptedResponse>,
    last: Option<ScriptedResponse>,
    contexts: Vec<StageContext>,
}

impl ScriptedStageAgent {
    /// Creates an agent that always succeeds.
    #[must_use]
    pub fn new(kind: AgentKind) -> Self {
        Self {
            kind,
            state: Arc::new(RwLock::new(ScriptedAgentState::default())),
        }
    }

    /// Queues a report.
    #[must_use]
    pub fn then_report(self, report: StageReport) -> Self {
        self.push(Ok(report));
        self
    }

    /// Queues an error raised past the agent boundary.
    #[must_use]
    pub fn then_error(self, error: StageAgentError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, response: ScriptedResponse) {
        if let Ok(mut state) = self.state.write() {
            state.queue.push_back(response);
        }
    }

    /// Returns a successful report with an empty payload for `kind`.
    #[must_use]
    pub fn success_report(kind: AgentKind) -> StageReport {
        let payload = match kind {
            AgentKind::Research => StagePayload::Research(ResearchFindings::default()),
            AgentKind::Context => StagePayload::Context(RepositoryContext::default()),
            AgentKind::Coding => StagePayload::Coding(CodeChanges::default()),
            AgentKind::Testing => StagePayload::Testing(TestReport {
                tests_run: 1,
                tests_passed: 1,
                exit_code: Some(0),
                ..TestReport::default()
            }),
            AgentKind::Security => StagePayload::Security(SecurityReport::default()),
            AgentKind::Submission => StagePayload::Submission(SubmissionReceipt {
                branch: "scripted".to_owned(),
                reference: "scripted".to_owned(),
                files_submitted: 0,
            }),
        };
        StageReport::success(payload)
    }

    /// Returns how many times the agent ran.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.state.read().map(|state| state.contexts.len()).unwrap_or(0)
    }

    /// Returns the contexts the agent received, oldest first.
    #[must_use]
    pub fn contexts(&self) -> Vec<StageContext> {
        self.state
            .read()
            .map(|state| state.contexts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StageAgent for ScriptedStageAgent {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn execute(&self, context: &StageContext) -> Result<StageReport, StageAgentError> {
        let mut state = self.state.write().map_err(|err| {
            StageAgentError::collaborator(std::io::Error::other(err.to_string()))
        })?;
        state.contexts.push(context.clone());
        if let Some(next) = state.queue.pop_front() {
            state.last = Some(next);
        }
        state
            .last
            .clone()
            .unwrap_or_else(|| Ok(Self::success_report(self.kind)))
    }
}

/// Language model returning queued completions and recording prompts.
///
/// The last completion repeats once the queue is empty.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLanguageModel {
    state: Arc<RwLock<ScriptedModelState>>,
}

#[derive(Debug, Default)]
struct ScriptedModelState {
    queue: VecDeque<Result<String, String>>,
    last: Option<Result<String, String>>,
    prompts: Vec<String>,
}

impl ScriptedLanguageModel {
    /// Creates a model answering `completion` to every prompt.
    #[must_use]
    pub fn new(completion: impl Into<String>) -> Self {
        Self::default().then(completion)
    }

    /// Queues a completion.
    #[must_use]
    pub fn then(self, completion: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.queue.push_back(Ok(completion.into()));
        }
        self
    }

    /// Queues an unavailability error.
    #[must_use]
    pub fn then_unavailable(self, reason: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.queue.push_back(Err(reason.into()));
        }
        self
    }

    /// Returns every prompt received, oldest first.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.state
            .read()
            .map(|state| state.prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String, LanguageModelError> {
        let mut state = self
            .state
            .write()
            .map_err(|err| LanguageModelError::client(std::io::Error::other(err.to_string())))?;
        state.prompts.push(prompt.to_owned());
        if let Some(next) = state.queue.pop_front() {
            state.last = Some(next);
        }
        match state.last.clone() {
            Some(Ok(completion)) => Ok(completion),
            Some(Err(reason)) => Err(LanguageModelError::Unavailable(reason)),
            None => Ok(String::new()),
        }
    }
}

/// Submitter that records requests and answers with a synthetic receipt.
#[derive(Debug, Clone, Default)]
pub struct RecordingChangeSubmitter {
    state: Arc<RwLock<SubmitterState>>,
}

#[derive(Debug, Default)]
struct SubmitterState {
    rejection: Option<String>,
    requests: Vec<SubmissionRequest>,
}

impl RecordingChangeSubmitter {
    /// Creates a submitter that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a submitter that rejects everything with `reason`.
    #[must_use]
    pub fn rejecting(reason: impl Into<String>) -> Self {
        let submitter = Self::default();
        if let Ok(mut state) = submitter.state.write() {
            state.rejection = Some(reason.into());
        }
        submitter
    }

    /// Returns every request received.
    #[must_use]
    pub fn requests(&self) -> Vec<SubmissionRequest> {
        self.state
            .read()
            .map(|state| state.requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChangeSubmitter for RecordingChangeSubmitter {
    async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let mut state = self
            .state
            .write()
            .map_err(|err| SubmissionError::transport(std::io::Error::other(err.to_string())))?;
        state.requests.push(request.clone());
        if let Some(reason) = state.rejection.clone() {
            return Err(SubmissionError::Rejected(reason));
        }
        Ok(SubmissionReceipt {
            branch: request.branch.clone(),
            reference: format!(
                "{}#{}",
                request.repository.full_name,
                state.requests.len()
            ),
            files_submitted: request.changes.changes.len(),
        })
    }
}
