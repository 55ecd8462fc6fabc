//! Concrete stage agents.

mod coding;
mod context;
mod detection;
pub mod prompts;
mod research;
mod security;
mod submission;
mod testing;

pub use coding::{ChangeSetError, CodingAgent, parse_changes, resolve_inside};
pub use context::ContextAgent;
pub use detection::{KNOWN_FRAMEWORKS, TestDetector, TestFramework};
pub use research::ResearchAgent;
pub use security::SecurityAgent;
pub use submission::SubmissionAgent;
pub use testing::TestingAgent;
