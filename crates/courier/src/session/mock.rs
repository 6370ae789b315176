use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use super::{ToolHost, ToolSession};
use crate::errors::{RelayError, RelayResult};
use crate::models::content::Content;
use crate::models::tool::Tool;

/// A mock tool host handing out scripted sessions for testing.
///
/// Records every `call_tool` invocation across the sessions it opens.
pub struct MockToolHost {
    tools: Vec<Tool>,
    results: Arc<Mutex<Vec<RelayResult<Vec<Content>>>>>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    connect_error: Option<String>,
}

impl MockToolHost {
    pub fn new(tools: Vec<Tool>, results: Vec<RelayResult<Vec<Content>>>) -> Self {
        Self {
            tools,
            results: Arc::new(Mutex::new(results)),
            calls: Arc::new(Mutex::new(Vec::new())),
            connect_error: None,
        }
    }

    /// A host whose handshake always fails
    pub fn unreachable<S: Into<String>>(message: S) -> Self {
        Self {
            tools: Vec::new(),
            results: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            connect_error: Some(message.into()),
        }
    }

    /// The (name, arguments) pairs invoked so far
    pub fn calls(&self) -> Arc<Mutex<Vec<(String, Value)>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ToolHost for MockToolHost {
    async fn connect(&self) -> RelayResult<Box<dyn ToolSession>> {
        if let Some(message) = &self.connect_error {
            return Err(RelayError::Upstream(message.clone()));
        }
        Ok(Box::new(MockSession {
            tools: self.tools.clone(),
            results: Arc::clone(&self.results),
            calls: Arc::clone(&self.calls),
        }))
    }
}

struct MockSession {
    tools: Vec<Tool>,
    results: Arc<Mutex<Vec<RelayResult<Vec<Content>>>>>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

#[async_trait]
impl ToolSession for MockSession {
    async fn list_tools(&mut self) -> RelayResult<Vec<Tool>> {
        Ok(self.tools.clone())
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> RelayResult<Vec<Content>> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            Ok(Vec::new())
        } else {
            results.remove(0)
        }
    }
}
