use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::error::{CleanerError, Result};
use super::patterns::{has_wildcard, GlobPattern};
use super::telemetry::CleanupLog;

/// Persisted document: category -> location templates, category -> name patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub locations: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub patterns: BTreeMap<String, Vec<String>>,
}

impl CatalogData {
    pub fn builtin() -> Self {
        let mut locations = BTreeMap::new();
        locations.insert(
            "temp".to_string(),
            strings(&["~/Library/Caches", "/tmp", "/var/tmp"]),
        );
        locations.insert("logs".to_string(), strings(&["~/Library/Logs", "/var/log"]));
        locations.insert(
            "cache".to_string(),
            strings(&[
                "~/Library/Caches",
                "~/Library/Application Support/*/Cache",
            ]),
        );

        let mut patterns = BTreeMap::new();
        patterns.insert("temp".to_string(), strings(&["*.tmp", "*.temp", "Temp*"]));
        patterns.insert("logs".to_string(), strings(&["*.log", "*.txt"]));
        patterns.insert("cache".to_string(), strings(&["Cache*", "*.cache"]));

        CatalogData {
            locations,
            patterns,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Where the catalog document lives.
pub trait CatalogStore: Send + Sync {
    fn load(&self) -> Result<Option<CatalogData>>;
    fn save(&self, data: &CatalogData) -> Result<()>;
}

/// Pretty-printed JSON file, created with the built-in defaults on first load.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogStore for JsonFileStore {
    fn load(&self) -> Result<Option<CatalogData>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let data = serde_json::from_str(&raw)?;
        Ok(Some(data))
    }

    fn save(&self, data: &CatalogData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-memory store; clones share the same document. Counts saves for tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Option<CatalogData>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: CatalogData) -> Self {
        MemoryStore {
            data: Arc::new(Mutex::new(Some(data))),
            saves: Arc::new(Mutex::new(0)),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }

    pub fn snapshot(&self) -> Option<CatalogData> {
        self.data.lock().ok().and_then(|d| d.clone())
    }
}

impl CatalogStore for MemoryStore {
    fn load(&self) -> Result<Option<CatalogData>> {
        let guard = self
            .data
            .lock()
            .map_err(|_| CleanerError::Catalog("memory store poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save(&self, data: &CatalogData) -> Result<()> {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| CleanerError::Catalog("memory store poisoned".into()))?;
        *guard = Some(data.clone());
        if let Ok(mut n) = self.saves.lock() {
            *n += 1;
        }
        Ok(())
    }
}

/// Category registry driving scans: locations to visit and name patterns to select.
pub struct PathCatalog {
    data: CatalogData,
    store: Box<dyn CatalogStore>,
    log: CleanupLog,
}

impl PathCatalog {
    /// Loads the document, seeding the store with the built-in defaults when empty.
    pub fn open(store: Box<dyn CatalogStore>, log: CleanupLog) -> Result<Self> {
        let data = match store.load()? {
            Some(data) => data,
            None => {
                let defaults = CatalogData::builtin();
                store.save(&defaults)?;
                log.info("Catalog store was empty; wrote built-in defaults");
                defaults
            }
        };
        Ok(PathCatalog { data, store, log })
    }

    /// Catalog over fixed data without persistence side effects on open.
    pub fn in_memory(data: CatalogData) -> Self {
        PathCatalog {
            store: Box::new(MemoryStore::with_data(data.clone())),
            data,
            log: CleanupLog::new(),
        }
    }

    pub fn data(&self) -> &CatalogData {
        &self.data
    }

    pub fn locations(&self) -> &BTreeMap<String, Vec<String>> {
        &self.data.locations
    }

    pub fn patterns(&self) -> &BTreeMap<String, Vec<String>> {
        &self.data.patterns
    }

    pub fn categories(&self) -> Vec<String> {
        self.data.locations.keys().cloned().collect()
    }

    pub fn locations_for(&self, category: &str) -> &[String] {
        self.data
            .locations
            .get(category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn patterns_for(&self, category: &str) -> &[String] {
        self.data
            .patterns
            .get(category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Appends a location; `Ok(false)` when it was already registered.
    pub fn add_location(&mut self, category: &str, location: &str) -> Result<bool> {
        require_non_empty("category", category)?;
        require_non_empty("location", location)?;
        let entry = self.data.locations.entry(category.to_string()).or_default();
        if entry.iter().any(|l| l == location) {
            return Ok(false);
        }
        entry.push(location.to_string());
        self.persist()?;
        Ok(true)
    }

    /// Appends a name pattern; `Ok(false)` when it was already registered.
    pub fn add_pattern(&mut self, category: &str, pattern: &str) -> Result<bool> {
        require_non_empty("category", category)?;
        GlobPattern::new(pattern).map_err(CleanerError::InvalidArgument)?;
        let entry = self.data.patterns.entry(category.to_string()).or_default();
        if entry.iter().any(|p| p == pattern) {
            return Ok(false);
        }
        entry.push(pattern.to_string());
        self.persist()?;
        Ok(true)
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&self.data).map_err(|e| {
            self.log.error(format!("Failed to persist catalog: {}", e));
            e
        })
    }

    /// Concrete paths a location template refers to. A template with
    /// wildcards yields only the existing matches, in sorted order.
    pub fn expand_location(template: &str) -> Vec<PathBuf> {
        if !has_wildcard(template) {
            return expand_home(template).into_iter().collect();
        }
        let Some(expanded) = glob_source(template) else {
            return Vec::new();
        };
        glob::glob(&expanded).into_iter().flatten().flatten().collect()
    }
}

/// Expands a leading `~` / `~/`. `None` when the home directory is unknown.
pub fn expand_home(input: &str) -> Option<PathBuf> {
    if input == "~" {
        return dirs::home_dir();
    }
    if let Some(rest) = input.strip_prefix("~/") {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    Some(PathBuf::from(input))
}

// The home prefix is escaped so its characters never act as wildcards.
fn glob_source(template: &str) -> Option<String> {
    match template.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            let home = dirs::home_dir()?;
            Some(format!("{}{}", Pattern::escape(&home.to_string_lossy()), rest))
        }
        _ => Some(template.to_string()),
    }
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CleanerError::InvalidArgument(format!("{} must not be empty", what)));
    }
    Ok(())
}
