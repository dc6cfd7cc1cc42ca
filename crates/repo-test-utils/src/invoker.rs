//! [`ScriptedInvoker`]: an [`AgentInvoker`] that replays canned results.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use repo_agent::{AgentError, AgentInvoker, AgentRequest, AgentResponse};
use serde_json::Value;

type Responder =
    Box<dyn Fn(&AgentRequest, usize) -> Result<AgentResponse, AgentError> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<Result<AgentResponse, AgentError>>>),
    Responder(Responder),
}

/// In-memory agent for orchestrator tests.
///
/// Results are handed out in call order. Every request is recorded so tests
/// can assert on what was sent and how many external calls happened.
///
/// # Example
///
/// ```rust,no_run
/// use repo_test_utils::ScriptedInvoker;
/// use serde_json::json;
///
/// let agent = ScriptedInvoker::new("gemini")
///     .fail_with_stderr("Rate limit exceeded")
///     .respond_json(json!({"response": "analysis text"}));
/// ```
pub struct ScriptedInvoker {
    name: String,
    script: Script,
    requests: Mutex<Vec<AgentRequest>>,
}

impl ScriptedInvoker {
    /// An invoker with an empty queue. Calls past the end of the queue fail
    /// with a permanent `MalformedResponse`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Script::Queue(Mutex::new(VecDeque::new())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// An invoker that computes each result from the request and the
    /// 0-based call index
    pub fn from_fn<F>(name: impl Into<String>, responder: F) -> Self
    where
        F: Fn(&AgentRequest, usize) -> Result<AgentResponse, AgentError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            script: Script::Responder(Box::new(responder)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful JSON reply.
    ///
    /// # Panics
    /// Panics if `payload` is not an object with a content field.
    pub fn respond_json(self, payload: Value) -> Self {
        let response = AgentResponse::from_value(&self.name, payload, 0)
            .unwrap_or_else(|e| panic!("ScriptedInvoker::respond_json: {e}"));
        self.push(Ok(response))
    }

    /// Queue a plain-text reply
    pub fn respond_text(self, text: &str) -> Self {
        self.push(Ok(AgentResponse::from_text(text, 0)))
    }

    /// Queue a failure
    pub fn fail(self, error: AgentError) -> Self {
        self.push(Err(error))
    }

    /// Queue a non-zero exit with `stderr`
    pub fn fail_with_stderr(self, stderr: &str) -> Self {
        let error = AgentError::process_execution(&self.name, 1, stderr, "");
        self.push(Err(error))
    }

    fn push(self, result: Result<AgentResponse, AgentError>) -> Self {
        match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push_back(result),
            Script::Responder(_) => {
                panic!("ScriptedInvoker: cannot queue results on a from_fn invoker")
            }
        }
        self
    }

    /// Number of invocations so far
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Every request received, in call order
    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of queued results not yet handed out
    pub fn remaining(&self) -> usize {
        match &self.script {
            Script::Queue(queue) => queue.lock().unwrap_or_else(|e| e.into_inner()).len(),
            Script::Responder(_) => usize::MAX,
        }
    }
}

#[async_trait]
impl AgentInvoker for ScriptedInvoker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: &AgentRequest) -> Result<AgentResponse, AgentError> {
        let index = {
            let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
            requests.push(request.clone());
            requests.len() - 1
        };

        match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
                .unwrap_or_else(|| {
                    Err(AgentError::malformed(
                        &self.name,
                        format!("script exhausted at call {}", index + 1),
                    ))
                }),
            Script::Responder(responder) => responder(request, index),
        }
    }
}
