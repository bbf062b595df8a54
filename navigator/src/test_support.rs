//! Test-only helpers: scripted model replies and fixture layouts.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::core::geometry::Point;
use crate::core::registry::{Location, LocationRegistry, default_locations};
use crate::io::llm::{ChatClient, ChatRequest};

/// One canned response for [`ScriptedChatClient`].
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Reply text returned as the model's message content.
    Text(String),
    /// Transport-level failure with the given message.
    Error(String),
}

/// Chat client that replays queued replies and records every request.
///
/// Running out of replies is reported as an error, so an unexpected extra
/// request shows up as a fallback plan rather than a panic.
#[derive(Debug, Default)]
pub struct ScriptedChatClient {
    replies: RefCell<VecDeque<ScriptedReply>>,
    requests: RefCell<Vec<ChatRequest>>,
}

impl ScriptedChatClient {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![ScriptedReply::Text(text.to_string())])
    }

    pub fn failing(message: &str) -> Self {
        Self::new(vec![ScriptedReply::Error(message.to_string())])
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl ChatClient for ScriptedChatClient {
    fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests.borrow_mut().push(request.clone());
        match self.replies.borrow_mut().pop_front() {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Error(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted client has no replies left")),
        }
    }
}

/// Registry with the default six-room layout.
pub fn house_registry() -> LocationRegistry {
    LocationRegistry::new(default_locations()).expect("default locations are valid")
}

/// Registry with a single location.
pub fn single_location(name: &str, x: f64, y: f64) -> LocationRegistry {
    LocationRegistry::new(vec![Location::new(name, Point::new(x, y))])
        .expect("single location is valid")
}

/// Convert string literals into owned tasks.
pub fn tasks(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}
