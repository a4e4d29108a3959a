use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

use super::catalog::{expand_home, PathCatalog};
use super::patterns::{compile_all, GlobPattern};
use super::telemetry::CleanupLog;
use super::types::{FileDescriptor, FileKind, LocationUsage};

/// Optional filters for a single directory scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Catalog category whose patterns a file name must match.
    pub file_type: Option<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_type(mut self, category: impl Into<String>) -> Self {
        self.file_type = Some(category.into());
        self
    }

    pub fn min_size(mut self, bytes: u64) -> Self {
        self.min_size = Some(bytes);
        self
    }

    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    fn size_allowed(&self, size: u64) -> bool {
        if let Some(min) = self.min_size {
            if size < min {
                return false;
            }
        }
        if let Some(max) = self.max_size {
            if size > max {
                return false;
            }
        }
        true
    }
}

/// Read-only walker producing candidate descriptors. Never deletes.
pub struct DirectoryScanner<'a> {
    catalog: &'a PathCatalog,
    log: CleanupLog,
}

impl<'a> DirectoryScanner<'a> {
    pub fn new(catalog: &'a PathCatalog, log: CleanupLog) -> Self {
        DirectoryScanner { catalog, log }
    }

    /// Best effort: a missing directory (or a plain file) yields nothing,
    /// walk errors are logged and skipped.
    pub fn scan(&self, directory: impl AsRef<Path>, options: &ScanOptions) -> Vec<FileDescriptor> {
        let Some(dir) = expand_dir(directory.as_ref()) else {
            self.log.warn(format!(
                "Cannot expand {}: home directory unknown",
                directory.as_ref().display()
            ));
            return Vec::new();
        };
        if !dir.is_dir() {
            return Vec::new();
        }

        let patterns = options
            .file_type
            .as_deref()
            .map(|category| self.patterns_for(category));

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(false) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    self.log
                        .warn(format!("Error scanning {}: {}", dir.display(), e));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    self.log
                        .warn(format!("Error reading {}: {}", entry.path().display(), e));
                    continue;
                }
            };

            let size = metadata.len();
            if !options.size_allowed(size) {
                continue;
            }

            if let Some(ref globs) = patterns {
                if !globs.iter().any(|g| g.matches_path(entry.path())) {
                    continue;
                }
            }

            let modified_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| DateTime::<Utc>::from(UNIX_EPOCH));

            files.push(FileDescriptor {
                path: entry.path().to_path_buf(),
                size,
                modified_at,
                kind: FileKind::classify(entry.path()),
            });
        }
        files
    }

    /// Unfiltered scans concatenated in input order, without deduplication.
    pub fn scan_multiple<P: AsRef<Path>>(&self, directories: &[P]) -> Vec<FileDescriptor> {
        let options = ScanOptions::default();
        directories
            .iter()
            .flat_map(|dir| self.scan(dir, &options))
            .collect()
    }

    /// Scans every registered location of the given categories (all when `None`).
    ///
    /// A category that has patterns in the catalog is filtered by them.
    pub fn scan_system(&self, categories: Option<&[&str]>) -> BTreeMap<String, Vec<FileDescriptor>> {
        let mut results = BTreeMap::new();
        for category in self.selected_categories(categories) {
            let options = if self.catalog.patterns_for(&category).is_empty() {
                ScanOptions::default()
            } else {
                ScanOptions::new().of_type(category.clone())
            };

            let mut files = Vec::new();
            for template in self.catalog.locations_for(&category) {
                for location in PathCatalog::expand_location(template) {
                    files.extend(self.scan(&location, &options));
                }
            }
            results.insert(category, files);
        }
        results
    }

    /// Total regular-file bytes held by each existing location of each category.
    pub fn location_sizes(&self, categories: Option<&[&str]>) -> BTreeMap<String, Vec<LocationUsage>> {
        let mut results = BTreeMap::new();
        for category in self.selected_categories(categories) {
            let usage = self
                .catalog
                .locations_for(&category)
                .iter()
                .flat_map(|template| PathCatalog::expand_location(template))
                .filter(|location| location.exists())
                .map(|location| LocationUsage {
                    size: directory_size(&location),
                    path: location,
                })
                .collect();
            results.insert(category, usage);
        }
        results
    }

    fn selected_categories(&self, categories: Option<&[&str]>) -> Vec<String> {
        match categories {
            Some(list) => list.iter().map(|c| c.to_string()).collect(),
            None => self.catalog.categories(),
        }
    }

    fn patterns_for(&self, category: &str) -> Vec<GlobPattern> {
        let (globs, errors) = compile_all(self.catalog.patterns_for(category));
        for err in errors {
            self.log.warn(format!("Skipping pattern for {}: {}", category, err));
        }
        globs
    }
}

/// Sum of regular file sizes below `path`; unreadable entries are skipped.
pub(crate) fn directory_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

fn expand_dir(directory: &Path) -> Option<PathBuf> {
    match directory.to_str() {
        Some(s) => expand_home(s),
        None => Some(directory.to_path_buf()),
    }
}
