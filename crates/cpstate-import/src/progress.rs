//! Progress reporting for long-running import steps
//!
//! The importer announces each step through a [`ProgressReporter`]. The CLI
//! renders steps as spinners; library users get log lines by default.

use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info};

/// A running step of the import
pub trait ProgressStep: Send + Sync {
    fn update(&self, message: &str);
    fn success(&self, message: &str);
    fn fail(&self, message: &str);
}

/// Starts progress steps
pub trait ProgressReporter: Send + Sync {
    fn start(&self, message: &str) -> Box<dyn ProgressStep>;
}

/// Reports progress as tracing events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

struct TracingStep {
    title: String,
}

impl ProgressReporter for TracingProgress {
    fn start(&self, message: &str) -> Box<dyn ProgressStep> {
        let title = message.trim().to_string();
        info!("{}", title);
        Box::new(TracingStep { title })
    }
}

impl ProgressStep for TracingStep {
    fn update(&self, message: &str) {
        debug!("{} {}", self.title, message);
    }

    fn success(&self, message: &str) {
        info!("{} {}", self.title, message);
    }

    fn fail(&self, message: &str) {
        error!("{} {}", self.title, message);
    }
}

/// Progress event captured by [`RecordingProgress`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Start(String),
    Update(String),
    Success(String),
    Fail(String),
}

/// Keeps every progress event in order; used by tests and embedders
#[derive(Debug, Clone, Default)]
pub struct RecordingProgress {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl ProgressReporter for RecordingProgress {
    fn start(&self, message: &str) -> Box<dyn ProgressStep> {
        self.push(ProgressEvent::Start(message.to_string()));
        Box::new(self.clone())
    }
}

impl ProgressStep for RecordingProgress {
    fn update(&self, message: &str) {
        self.push(ProgressEvent::Update(message.to_string()));
    }

    fn success(&self, message: &str) {
        self.push(ProgressEvent::Success(message.to_string()));
    }

    fn fail(&self, message: &str) {
        self.push(ProgressEvent::Fail(message.to_string()));
    }
}
