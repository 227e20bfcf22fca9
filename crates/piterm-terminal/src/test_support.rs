//! Shared fixtures for this crate's unit tests.

use std::collections::VecDeque;

use piterm_config::Config;
use piterm_session::{Credentials, Session};
use piterm_types::{PitermError, Result};
use piterm_webapi::{HttpRequest, HttpResponse, HttpTransport, Record};

use crate::interpreter::{Environment, Prompter};
use crate::logbuf::LogBuffer;

/// Transport that refuses every request; command tests that never touch
/// the network use it to prove they never touch the network.
pub(crate) struct NullTransport;

impl HttpTransport for NullTransport {
    fn send(&self, _request: &HttpRequest) -> Result<HttpResponse> {
        Err(PitermError::WebApi("no network in tests".to_string()))
    }
}

/// Transport answering from a canned response queue.
pub(crate) struct QueueTransport {
    responses: std::cell::RefCell<VecDeque<HttpResponse>>,
}

impl QueueTransport {
    pub(crate) fn new(responses: Vec<HttpResponse>) -> Self {
        Self {
            responses: std::cell::RefCell::new(responses.into()),
        }
    }
}

impl HttpTransport for QueueTransport {
    fn send(&self, _request: &HttpRequest) -> Result<HttpResponse> {
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| PitermError::WebApi("canned responses exhausted".to_string()))
    }
}

/// JSON response helper for [`QueueTransport`].
pub(crate) fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: body.to_string().into_bytes(),
    }
}

/// Prompter answering from a script.
#[derive(Default)]
pub(crate) struct ScriptedPrompter {
    answers: VecDeque<String>,
}

impl ScriptedPrompter {
    pub(crate) fn with_answers(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&mut self, _label: &str) -> Result<String> {
        self.answers
            .pop_front()
            .ok_or_else(|| PitermError::Command("prompt script exhausted".to_string()))
    }

    fn prompt_secret(&mut self, label: &str) -> Result<String> {
        self.prompt(label)
    }
}

/// Everything an [`Environment`] borrows, owned in one place.
pub(crate) struct World {
    pub config: Config,
    pub session: Session,
    pub credentials: Credentials,
    pub results: Vec<Record>,
    pub logs: LogBuffer,
    pub transport: Box<dyn HttpTransport>,
    pub prompter: ScriptedPrompter,
    pub credentials_file: Option<std::path::PathBuf>,
    pub should_exit: bool,
}

impl World {
    pub(crate) fn new() -> Self {
        Self {
            config: Config::default(),
            session: Session::default(),
            credentials: Credentials::default(),
            results: Vec::new(),
            logs: LogBuffer::new(),
            transport: Box::new(NullTransport),
            prompter: ScriptedPrompter::default(),
            credentials_file: None,
            should_exit: false,
        }
    }

    pub(crate) fn env(&mut self) -> Environment<'_> {
        Environment {
            config: &mut self.config,
            session: &mut self.session,
            credentials: &mut self.credentials,
            results: &mut self.results,
            transport: self.transport.as_ref(),
            prompter: &mut self.prompter,
            logs: &self.logs,
            credentials_file: self.credentials_file.clone(),
            should_exit: &mut self.should_exit,
        }
    }
}
