//! In-process progress notifiers.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

use crate::pipeline::{
    domain::{ProgressEvent, RunId},
    ports::{NotifierError, ProgressNotifier},
};

/// Broadcasts events to every live subscriber.
///
/// Events published while nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct ChannelProgressNotifier {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ChannelProgressNotifier {
    /// Creates a notifier buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns a new receiver for subsequent events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for ChannelProgressNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl ProgressNotifier for ChannelProgressNotifier {
    async fn notify(&self, event: &ProgressEvent) -> Result<(), NotifierError> {
        if self.sender.send(event.clone()).is_err() {
            debug!(run_id = %event.run_id, "no progress subscribers");
        }
        Ok(())
    }
}

/// Keeps every event it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingProgressNotifier {
    events: Arc<RwLock<Vec<ProgressEvent>>>,
}

impl RecordingProgressNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded event, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .read()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns the recorded events of one run.
    #[must_use]
    pub fn events_for(&self, run_id: RunId) -> Vec<ProgressEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.run_id == run_id)
            .collect()
    }
}

#[async_trait]
impl ProgressNotifier for RecordingProgressNotifier {
    async fn notify(&self, event: &ProgressEvent) -> Result<(), NotifierError> {
        let mut events = self
            .events
            .write()
            .map_err(|err| NotifierError::transport(std::io::Error::other(err.to_string())))?;
        events.push(event.clone());
        Ok(())
    }
}
