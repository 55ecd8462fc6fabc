//! Port contracts for the orchestration engine.

pub mod agent;
pub mod checkpoint;
pub mod model;
pub mod notifier;
pub mod repository;
pub mod scanner;
pub mod submitter;

pub use agent::{StageAgent, StageAgentError, StageContext};
pub use checkpoint::{CheckpointStore, CheckpointStoreError, CheckpointStoreResult};
pub use model::{LanguageModel, LanguageModelError};
pub use notifier::{NotifierError, ProgressNotifier};
pub use repository::{TaskRunRepository, TaskRunRepositoryError, TaskRunRepositoryResult};
pub use scanner::{ScanError, SecretScanner};
pub use submitter::{ChangeSubmitter, SubmissionError, SubmissionRequest};
