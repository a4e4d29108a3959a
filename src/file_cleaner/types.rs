use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::CleanErrorKind;

/// Deterministic classification of a scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Log,
    Temp,
    Cache,
    Other,
}

impl FileKind {
    /// Extension wins over the parent directory name.
    pub fn classify(path: &Path) -> FileKind {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match ext.as_deref() {
            Some("log") | Some("txt") => return FileKind::Log,
            Some("tmp") | Some("temp") => return FileKind::Temp,
            _ => {}
        }

        let parent = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|n| n.to_lowercase());
        match parent.as_deref() {
            Some("cache") | Some("caches") => FileKind::Cache,
            _ => FileKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Log => "log",
            FileKind::Temp => "temp",
            FileKind::Cache => "cache",
            FileKind::Other => "other",
        }
    }
}

/// One candidate file found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub size: u64,
    #[serde(rename = "modified")]
    pub modified_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

/// Input to the cleaner: a path and, when the caller already measured it, its size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanItem {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl CleanItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CleanItem {
            path: path.into(),
            size: None,
        }
    }

    pub fn with_size(path: impl Into<PathBuf>, size: u64) -> Self {
        CleanItem {
            path: path.into(),
            size: Some(size),
        }
    }
}

impl From<&FileDescriptor> for CleanItem {
    fn from(file: &FileDescriptor) -> Self {
        CleanItem::with_size(file.path.clone(), file.size)
    }
}

impl From<FileDescriptor> for CleanItem {
    fn from(file: FileDescriptor) -> Self {
        CleanItem::with_size(file.path, file.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedItem {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub path: PathBuf,
    pub error: String,
    pub kind: CleanErrorKind,
}

/// Outcome of one cleaning invocation. `cleaned` and `failed` are disjoint
/// and together account for every input item, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanResult {
    pub cleaned: Vec<CleanedItem>,
    pub failed: Vec<FailedItem>,
}

impl CleanResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_cleaned(&mut self, path: &Path, size: Option<u64>) {
        self.cleaned.push(CleanedItem {
            path: path.to_path_buf(),
            size,
        });
    }

    pub(crate) fn record_failed(
        &mut self,
        path: &Path,
        error: impl Into<String>,
        kind: CleanErrorKind,
    ) {
        self.failed.push(FailedItem {
            path: path.to_path_buf(),
            error: error.into(),
            kind,
        });
    }

    pub fn freed_bytes(&self) -> u64 {
        self.cleaned.iter().filter_map(|c| c.size).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total_items(&self) -> usize {
        self.cleaned.len() + self.failed.len()
    }
}

/// Verdict of the path validator for a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error_message: String,
    pub requires_elevation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CleanErrorKind>,
}

impl ValidationResult {
    pub(crate) fn valid(requires_elevation: bool) -> Self {
        ValidationResult {
            is_valid: true,
            error_message: String::new(),
            requires_elevation,
            kind: None,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>, kind: CleanErrorKind) -> Self {
        ValidationResult {
            is_valid: false,
            error_message: message.into(),
            requires_elevation: false,
            kind: Some(kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PreviewContent {
    /// First characters of a text file.
    Text(String),
    Binary,
    Directory,
    Missing,
    PermissionDenied,
    Unreadable(String),
}

impl PreviewContent {
    pub fn describe(&self) -> String {
        match self {
            PreviewContent::Text(excerpt) => excerpt.clone(),
            PreviewContent::Binary => "[Binary file]".to_string(),
            PreviewContent::Directory => "[Directory]".to_string(),
            PreviewContent::Missing => "File does not exist".to_string(),
            PreviewContent::PermissionDenied => "Permission denied".to_string(),
            PreviewContent::Unreadable(err) => format!("Unreadable: {}", err),
        }
    }
}

/// What a pending cleanup would remove, read without touching anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePreview {
    pub path: PathBuf,
    pub size: Option<u64>,
    pub content: PreviewContent,
}

/// A concrete location and how much it currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationUsage {
    pub path: PathBuf,
    pub size: u64,
}

/// Human readable size, e.g. `1.0 KB`.
pub fn format_size(bytes: u64) -> String {
    bytesize::ByteSize::b(bytes).to_string()
}
