//! Progress observers notified after each window.

use std::sync::Mutex;

/// Receives advisory "completed X/N" messages. Has no say in control flow.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn notify(&self, message: &str) {
        self(message)
    }
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn notify(&self, _message: &str) {}
}

/// Keeps messages in memory, for tests and UI collectors.
#[derive(Debug, Default)]
pub struct InMemoryProgressSink {
    messages: Mutex<Vec<String>>,
}

impl InMemoryProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProgressSink for InMemoryProgressSink {
    fn notify(&self, message: &str) {
        if let Ok(mut m) = self.messages.lock() {
            m.push(message.to_string());
        }
    }
}
