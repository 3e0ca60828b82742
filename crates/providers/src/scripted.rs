use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{ChatProvider, Completion, CompletionRequest, ProviderError};

/// In-process provider that replays queued completions.
///
/// Built with `new` it records every request for inspection. The `offline`
/// variant keeps nothing and never runs dry.
#[derive(Clone)]
pub struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<Result<Completion, String>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    record_requests: bool,
    fallback: Option<Completion>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            replies: Arc::default(),
            requests: Arc::default(),
            record_requests: true,
            fallback: None,
        }
    }

    pub fn with_replies(replies: impl IntoIterator<Item = Completion>) -> Self {
        let provider = Self::new();
        for reply in replies {
            provider.push_reply(reply);
        }
        provider
    }

    /// Replies with `text` whenever the queue is empty.
    pub fn offline(text: impl Into<String>) -> Self {
        Self {
            record_requests: false,
            fallback: Some(Completion::from_text(text)),
            ..Self::new()
        }
    }

    pub fn push_reply(&self, reply: Completion) {
        self.replies.lock().push_back(Ok(reply));
    }

    /// Queues an upstream failure, surfaced as a non-success status.
    pub fn push_failure(&self, body: impl Into<String>) {
        self.replies.lock().push_back(Err(body.into()));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        if self.record_requests {
            self.requests.lock().push(request.clone());
        }

        let next = self.replies.lock().pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(body)) => Err(ProviderError::Status {
                provider: "scripted",
                status: 503,
                body,
            }),
            None => self.fallback.clone().ok_or(ProviderError::Exhausted),
        }
    }
}
