//! In-memory adapters for tests and local development.

mod checkpoint;
mod notifier;
mod run;
mod scripted;

pub use checkpoint::InMemoryCheckpointStore;
pub use notifier::{ChannelProgressNotifier, RecordingProgressNotifier};
pub use run::InMemoryTaskRunRepository;
pub use scripted::{RecordingChangeSubmitter, ScriptedLanguageModel, ScriptedStageAgent};
