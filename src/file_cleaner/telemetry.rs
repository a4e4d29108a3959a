use log::Level;
use std::sync::{Arc, Mutex};

const TARGET: &str = "mac_cleaner";

/// Log handle passed into each component.
///
/// Every record goes to the `log` facade. A capturing handle additionally
/// keeps the records in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CleanupLog {
    captured: Option<Arc<Mutex<Vec<(Level, String)>>>>,
}

impl CleanupLog {
    pub fn new() -> Self {
        Self { captured: None }
    }

    pub fn capturing() -> Self {
        Self {
            captured: Some(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(Level::Info, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.record(Level::Warn, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(Level::Error, message.into());
    }

    pub fn records(&self) -> Vec<(Level, String)> {
        match &self.captured {
            Some(buf) => buf.lock().map(|b| b.clone()).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    fn record(&self, level: Level, message: String) {
        log::log!(target: TARGET, level, "{}", message);
        if let Some(buf) = &self.captured {
            if let Ok(mut buf) = buf.lock() {
                buf.push((level, message));
            }
        }
    }
}
