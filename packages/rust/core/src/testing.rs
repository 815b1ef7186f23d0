//! Scripted completion service for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use lessonpath_completion::{CompletionError, CompletionService, PromptRequest};
use lessonpath_shared::ModelProfile;

type Responder = Box<dyn Fn(&PromptRequest) -> Result<String, CompletionError> + Send + Sync>;

/// Answers every request through a closure and records what it was asked.
pub(crate) struct ScriptedClient {
    responder: Responder,
    requests: Mutex<Vec<PromptRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new(
        responder: impl Fn(&PromptRequest) -> Result<String, CompletionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails as if the provider were unreachable.
    pub(crate) fn failing() -> Self {
        Self::new(|_| Err(CompletionError::Transport("connection refused".into())))
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().expect("lock").len()
    }

    pub(crate) fn calls_where(&self, predicate: impl Fn(&PromptRequest) -> bool) -> usize {
        self.requests
            .lock()
            .expect("lock")
            .iter()
            .filter(|r| predicate(r))
            .count()
    }
}

#[async_trait]
impl CompletionService for ScriptedClient {
    fn model_for(&self, profile: ModelProfile) -> String {
        format!("test/{profile}")
    }

    async fn complete(&self, request: &PromptRequest) -> Result<String, CompletionError> {
        self.requests.lock().expect("lock").push(request.clone());
        (self.responder)(request)
    }
}

pub(crate) fn is_topic(request: &PromptRequest) -> bool {
    request.prompt.starts_with("Extract a concise")
}

pub(crate) fn is_prerequisites(request: &PromptRequest) -> bool {
    request.prompt.starts_with("Identify the prerequisite")
}

pub(crate) fn is_pathway(request: &PromptRequest) -> bool {
    request.prompt.starts_with("Create a learning pathway")
}
