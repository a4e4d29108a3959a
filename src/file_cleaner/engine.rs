use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::catalog::expand_home;
use super::error::{CleanErrorKind, CleanerError, Result};
use super::patterns::literal_suffix;
use super::removal::{remover_for, FileRemover, PrivilegedRemover, StdFileRemover, SudoRemover};
use super::scanner::directory_size;
use super::telemetry::CleanupLog;
use super::types::{
    CleanItem, CleanResult, FileDescriptor, FilePreview, PreviewContent,
};
use super::validation::PathValidator;
use crate::config::CleanerConfig;

const PREVIEW_CHARS: usize = 100;
// Enough bytes for PREVIEW_CHARS of 4-byte UTF-8.
const PREVIEW_BYTES: u64 = (PREVIEW_CHARS * 4) as u64;

const NOT_FOUND_MESSAGE: &str = "No such file or directory: path does not exist";
const NOT_PERMITTED_MESSAGE: &str = "Operation not permitted";

/// The only component that mutates the filesystem.
///
/// Items are removed one at a time and independently. A permission failure
/// gets exactly one privileged retry when elevation was authorized at
/// construction; otherwise it is terminal for that item.
pub struct FileCleaner {
    allow_elevation: bool,
    remover: Box<dyn FileRemover>,
    privileged: Box<dyn PrivilegedRemover>,
    validator: Option<PathValidator>,
    log: CleanupLog,
}

impl FileCleaner {
    pub fn new(allow_elevation: bool, log: CleanupLog) -> Self {
        FileCleaner {
            allow_elevation,
            remover: Box::new(StdFileRemover),
            privileged: Box::new(SudoRemover::new()),
            validator: None,
            log,
        }
    }

    /// Cleaner guarded by a validator over the configured protected paths.
    pub fn from_config(config: &CleanerConfig, log: CleanupLog) -> Result<Self> {
        let validator = PathValidator::new(config.protected_paths.iter().cloned())?
            .with_traversal_check(config.reject_traversal);
        Ok(Self::new(config.allow_elevation, log)
            .with_privileged_remover(remover_for(&config.elevation_program))
            .with_validator(validator))
    }

    pub fn with_privileged_remover(mut self, privileged: Box<dyn PrivilegedRemover>) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn with_file_remover(mut self, remover: Box<dyn FileRemover>) -> Self {
        self.remover = remover;
        self
    }

    /// Items that exist but fail validation are recorded as failed, never touched.
    pub fn with_validator(mut self, validator: PathValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn elevation_allowed(&self) -> bool {
        self.allow_elevation
    }

    /// Removes every item, recording each as cleaned or failed.
    ///
    /// Errors only on a broken call contract (an empty path), checked before
    /// anything is removed.
    pub fn clean_files(&self, items: &[CleanItem]) -> Result<CleanResult> {
        if let Some(idx) = items.iter().position(|i| i.path.as_os_str().is_empty()) {
            return Err(CleanerError::InvalidArgument(format!(
                "item {} has an empty path",
                idx
            )));
        }

        let mut result = CleanResult::new();
        for item in items {
            let path = item.path.as_path();

            let metadata = match fs::symlink_metadata(path) {
                Ok(m) => m,
                Err(e) => {
                    let (message, kind) = describe_lookup_error(&e);
                    self.log
                        .error(format!("Failed to clean {}: {}", path.display(), message));
                    result.record_failed(path, message, kind);
                    continue;
                }
            };

            if let Some(rejection) = self.rejection(path)? {
                result.record_failed(path, rejection.0, rejection.1);
                continue;
            }

            let is_dir = metadata.is_dir();
            let size = item.size.unwrap_or_else(|| {
                if is_dir {
                    directory_size(path)
                } else {
                    metadata.len()
                }
            });

            match self.remove_path(path, is_dir) {
                Ok(()) => result.record_cleaned(path, Some(size)),
                Err((message, kind)) => {
                    self.log
                        .error(format!("Failed to clean {}: {}", path.display(), message));
                    result.record_failed(path, message, kind);
                }
            }
        }

        self.log_summary("clean_files", &result);
        Ok(result)
    }

    /// Removes every file below `directory` whose name ends with the literal
    /// suffix of one of `patterns` (`*.tmp` -> `.tmp`).
    pub fn clean_by_pattern<S: AsRef<str>>(
        &self,
        directory: impl AsRef<Path>,
        patterns: &[S],
    ) -> CleanResult {
        let mut result = CleanResult::new();
        let directory = directory.as_ref();
        let dir = directory
            .to_str()
            .and_then(expand_home)
            .unwrap_or_else(|| directory.to_path_buf());

        if !dir.is_dir() {
            result.record_failed(&dir, "Directory does not exist", CleanErrorKind::NotFound);
            return result;
        }

        let suffixes: Vec<&str> = patterns
            .iter()
            .filter_map(|p| literal_suffix(p.as_ref()))
            .collect();
        if suffixes.is_empty() {
            self.log.warn(format!(
                "No usable patterns for {}; nothing to clean",
                dir.display()
            ));
            return result;
        }

        let mut targets: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(false) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) if e.depth() == 0 => {
                    self.log
                        .error(format!("Failed to walk {}: {}", dir.display(), e));
                    result.record_failed(&dir, e.to_string(), CleanErrorKind::Traversal);
                    break;
                }
                Err(e) => {
                    let failed = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.clone());
                    self.log
                        .warn(format!("Skipping {}: {}", failed.display(), e));
                    result.record_failed(&failed, e.to_string(), CleanErrorKind::Traversal);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if suffixes.iter().any(|suffix| name.ends_with(suffix)) {
                targets.push(entry.into_path());
            }
        }

        for path in targets {
            let size = match fs::symlink_metadata(&path) {
                Ok(m) => m.len(),
                Err(e) => {
                    let (message, kind) = describe_lookup_error(&e);
                    result.record_failed(&path, message, kind);
                    continue;
                }
            };

            let rejection = match self.rejection(&path) {
                Ok(r) => r,
                Err(e) => Some((e.to_string(), CleanErrorKind::Io)),
            };
            if let Some((message, kind)) = rejection {
                result.record_failed(&path, message, kind);
                continue;
            }

            match self.remove_path(&path, false) {
                Ok(()) => result.record_cleaned(&path, Some(size)),
                Err((message, kind)) => {
                    self.log
                        .error(format!("Failed to clean {}: {}", path.display(), message));
                    result.record_failed(&path, message, kind);
                }
            }
        }

        self.log_summary("clean_by_pattern", &result);
        result
    }

    /// Cleans the files of the selected categories of a system scan (all when `None`).
    pub fn clean_by_type(
        &self,
        scan_results: &BTreeMap<String, Vec<FileDescriptor>>,
        types: Option<&[&str]>,
    ) -> Result<CleanResult> {
        let items: Vec<CleanItem> = scan_results
            .iter()
            .filter(|(category, _)| types.map_or(true, |t| t.contains(&category.as_str())))
            .flat_map(|(_, files)| files.iter().map(CleanItem::from))
            .collect();
        self.clean_files(&items)
    }

    /// Size and a short excerpt of each item, without mutating anything.
    pub fn preview_files(&self, items: &[CleanItem]) -> Vec<FilePreview> {
        items
            .iter()
            .map(|item| {
                let path = item.path.as_path();
                let (size, content) = match fs::metadata(path) {
                    Err(e) => (None, preview_error(&e)),
                    Ok(m) if m.is_dir() => (Some(directory_size(path)), PreviewContent::Directory),
                    Ok(m) => (Some(m.len()), read_excerpt(path)),
                };
                FilePreview {
                    path: item.path.clone(),
                    size,
                    content,
                }
            })
            .collect()
    }

    /// Sum of known sizes; items without a size count as zero.
    pub fn estimate_space_saving(items: &[CleanItem]) -> u64 {
        items.iter().map(|i| i.size.unwrap_or(0)).sum()
    }

    /// True when no path reported as cleaned is still present.
    pub fn verify_cleaning(result: &CleanResult) -> bool {
        result
            .cleaned
            .iter()
            .all(|c| fs::symlink_metadata(&c.path).is_err())
    }

    fn rejection(&self, path: &Path) -> Result<Option<(String, CleanErrorKind)>> {
        let Some(validator) = &self.validator else {
            return Ok(None);
        };
        let verdict = validator.validate_entry(path)?;
        if verdict.is_valid {
            return Ok(None);
        }
        self.log.warn(format!(
            "Refusing to clean {}: {}",
            path.display(),
            verdict.error_message
        ));
        let kind = verdict.kind.unwrap_or(CleanErrorKind::ProtectedPath);
        Ok(Some((verdict.error_message, kind)))
    }

    fn remove_path(&self, path: &Path, is_dir: bool) -> std::result::Result<(), (String, CleanErrorKind)> {
        let plain = if is_dir {
            make_tree_writable(path);
            self.remover.remove_dir_all(path)
        } else {
            self.remover.remove_file(path)
        };

        match plain {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => self.remove_elevated(path),
            Err(e) => Err((e.to_string(), CleanErrorKind::from_io(&e))),
        }
    }

    fn remove_elevated(&self, path: &Path) -> std::result::Result<(), (String, CleanErrorKind)> {
        if !self.allow_elevation {
            return Err((
                NOT_PERMITTED_MESSAGE.to_string(),
                CleanErrorKind::PermissionDenied,
            ));
        }

        self.log
            .info(format!("Retrying {} with elevated privileges", path.display()));
        match self.privileged.remove(path) {
            Ok(()) if fs::symlink_metadata(path).is_err() => Ok(()),
            Ok(()) => Err((
                format!(
                    "{}: still present after privileged removal",
                    NOT_PERMITTED_MESSAGE
                ),
                CleanErrorKind::ElevationFailed,
            )),
            Err(e) => Err((
                format!("{}: {}", NOT_PERMITTED_MESSAGE, e),
                CleanErrorKind::ElevationFailed,
            )),
        }
    }

    fn log_summary(&self, operation: &str, result: &CleanResult) {
        self.log.info(format!(
            "{}: {} cleaned ({} bytes), {} failed",
            operation,
            result.cleaned.len(),
            result.freed_bytes(),
            result.failed.len()
        ));
    }
}

/// Best effort: grant the owner write access across the tree before removal.
fn make_tree_writable(root: &Path) {
    for entry in WalkDir::new(root).follow_links(false).into_iter().flatten() {
        if entry.file_type().is_symlink() {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let mut perms = metadata.permissions();
        let extra = if entry.file_type().is_dir() { 0o700 } else { 0o600 };
        let mode = perms.mode();
        if mode & extra != extra {
            perms.set_mode(mode | extra);
            let _ = fs::set_permissions(entry.path(), perms);
        }
    }
}

fn describe_lookup_error(err: &std::io::Error) -> (String, CleanErrorKind) {
    let unresolvable = matches!(err.raw_os_error(), Some(libc::ENOTDIR) | Some(libc::ELOOP));
    if err.kind() == ErrorKind::NotFound || unresolvable {
        (NOT_FOUND_MESSAGE.to_string(), CleanErrorKind::NotFound)
    } else {
        (err.to_string(), CleanErrorKind::from_io(err))
    }
}

fn preview_error(err: &std::io::Error) -> PreviewContent {
    match err.kind() {
        ErrorKind::NotFound => PreviewContent::Missing,
        ErrorKind::PermissionDenied => PreviewContent::PermissionDenied,
        _ if err.raw_os_error() == Some(libc::ENOTDIR) => PreviewContent::Missing,
        _ => PreviewContent::Unreadable(err.to_string()),
    }
}

fn read_excerpt(path: &Path) -> PreviewContent {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => return preview_error(&e),
    };
    let mut buf = Vec::new();
    if let Err(e) = file.take(PREVIEW_BYTES).read_to_end(&mut buf) {
        return preview_error(&e);
    }

    let text = match std::str::from_utf8(&buf) {
        Ok(s) => s,
        // Cut mid-character at the read boundary: keep the valid prefix.
        Err(e) if e.error_len().is_none() => match std::str::from_utf8(&buf[..e.valid_up_to()]) {
            Ok(s) => s,
            Err(_) => return PreviewContent::Binary,
        },
        Err(_) => return PreviewContent::Binary,
    };
    PreviewContent::Text(text.chars().take(PREVIEW_CHARS).collect())
}
