//! Scriptable data sources and formatters for integration tests.

#![allow(dead_code)] // Not every test binary uses every helper

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use relay_core::source::{DataSource, LookupKey, ResultFormatter, SourceError};

/// Data source that replays a scripted response sequence, then repeats
/// the final entry forever. Records how many times it was called.
pub struct ScriptedSource {
    name: String,
    script: Mutex<Vec<Result<Value, SourceError>>>,
    calls: AtomicU32,
    delay: Option<Duration>,
}

impl ScriptedSource {
    pub fn new(name: &str, script: Vec<Result<Value, SourceError>>) -> Self {
        assert!(!script.is_empty(), "script must have at least one entry");
        Self {
            name: name.to_string(),
            script: Mutex::new(script),
            calls: AtomicU32::new(0),
            delay: None,
        }
    }

    /// Single fixed response for every call.
    pub fn fixed(name: &str, response: Result<Value, SourceError>) -> Self {
        Self::new(name, vec![response])
    }

    /// Adds latency to every fetch, for admission and timeout tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _key: &LookupKey) -> Result<Value, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.script.lock();
        if script.len() > 1 {
            script.remove(0)
        } else {
            script[0].clone()
        }
    }
}

/// Formatter that renders strings bare, null as empty text, and
/// everything else as compact JSON.
pub struct PlainFormatter;

impl ResultFormatter for PlainFormatter {
    fn format(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
