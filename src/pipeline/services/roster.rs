//! Closed-set registry of stage agents.

use crate::pipeline::{domain::AgentKind, ports::StageAgent};
use std::fmt;
use std::sync::Arc;

use super::CoordinatorError;

/// One slot per agent kind; dispatch is a `match`, not a lookup table.
#[derive(Clone, Default)]
pub struct AgentRoster {
    research: Option<Arc<dyn StageAgent>>,
    context: Option<Arc<dyn StageAgent>>,
    coding: Option<Arc<dyn StageAgent>>,
    testing: Option<Arc<dyn StageAgent>>,
    security: Option<Arc<dyn StageAgent>>,
    submission: Option<Arc<dyn StageAgent>>,
}

impl AgentRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `agent` under the kind it reports, returning any agent it
    /// replaced.
    pub fn register(&mut self, agent: Arc<dyn StageAgent>) -> Option<Arc<dyn StageAgent>> {
        self.slot_mut(agent.kind()).replace(agent)
    }

    /// Builder form of [`Self::register`].
    #[must_use]
    pub fn with_agent(mut self, agent: Arc<dyn StageAgent>) -> Self {
        drop(self.register(agent));
        self
    }

    /// Returns the agent registered for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::AgentNotFound`] when the slot is empty.
    pub fn get(&self, kind: AgentKind) -> Result<Arc<dyn StageAgent>, CoordinatorError> {
        self.slot(kind)
            .map(Arc::clone)
            .ok_or(CoordinatorError::AgentNotFound(kind))
    }

    /// Returns the kinds that have an agent, in pipeline order.
    #[must_use]
    pub fn registered(&self) -> Vec<AgentKind> {
        AgentKind::ALL
            .into_iter()
            .filter(|kind| self.slot(*kind).is_some())
            .collect()
    }

    const fn slot(&self, kind: AgentKind) -> Option<&Arc<dyn StageAgent>> {
        match kind {
            AgentKind::Research => self.research.as_ref(),
            AgentKind::Context => self.context.as_ref(),
            AgentKind::Coding => self.coding.as_ref(),
            AgentKind::Testing => self.testing.as_ref(),
            AgentKind::Security => self.security.as_ref(),
            AgentKind::Submission => self.submission.as_ref(),
        }
    }

    const fn slot_mut(&mut self, kind: AgentKind) -> &mut Option<Arc<dyn StageAgent>> {
        match kind {
            AgentKind::Research => &mut self.research,
            AgentKind::Context => &mut self.context,
            AgentKind::Coding => &mut self.coding,
            AgentKind::Testing => &mut self.testing,
            AgentKind::Security => &mut self.security,
            AgentKind::Submission => &mut self.submission,
        }
    }
}

impl fmt::Debug for AgentRoster {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AgentRoster")
            .field("registered", &self.registered())
            .finish()
    }
}
