use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::MetadataExt;
use std::path::{Component, Path, PathBuf};

use super::error::{CleanErrorKind, CleanerError, Result};
use super::types::ValidationResult;

/// Gatekeeper deciding whether a path may ever be mutated.
///
/// Protected prefixes are fixed at construction and compared as strings
/// against the fully resolved (symlink-followed) path.
#[derive(Debug, Clone)]
pub struct PathValidator {
    protected_paths: Vec<PathBuf>,
    reject_traversal: bool,
}

impl PathValidator {
    /// Fails when any protected prefix is relative.
    pub fn new<I, P>(protected_paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let protected_paths: Vec<PathBuf> = protected_paths.into_iter().map(Into::into).collect();
        if let Some(relative) = protected_paths.iter().find(|p| !p.is_absolute()) {
            return Err(CleanerError::RelativeProtectedPath(relative.clone()));
        }
        Ok(PathValidator {
            protected_paths,
            reject_traversal: true,
        })
    }

    /// Toggles the `..` check on resolved paths (on by default).
    pub fn with_traversal_check(mut self, enabled: bool) -> Self {
        self.reject_traversal = enabled;
        self
    }

    pub fn protected_paths(&self) -> &[PathBuf] {
        &self.protected_paths
    }

    pub fn validate(&self, path: &Path) -> Result<ValidationResult> {
        if path.as_os_str().is_empty() {
            return Err(CleanerError::InvalidArgument(
                "path to validate must not be empty".into(),
            ));
        }

        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => return Ok(Self::from_io_error(&e)),
        };

        let resolved = match fs::canonicalize(path) {
            Ok(p) => p,
            Err(e) => return Ok(Self::from_io_error(&e)),
        };

        Ok(self.check_resolved(&resolved, metadata.uid()))
    }

    /// Like [`validate`](Self::validate), but a dangling symlink is judged by
    /// where the link itself lives instead of failing as missing.
    pub fn validate_entry(&self, path: &Path) -> Result<ValidationResult> {
        let verdict = self.validate(path)?;
        if verdict.kind != Some(CleanErrorKind::NotFound) {
            return Ok(verdict);
        }

        let link = match fs::symlink_metadata(path) {
            Ok(m) if m.file_type().is_symlink() => m,
            _ => return Ok(verdict),
        };
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return Ok(verdict);
        };
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        match fs::canonicalize(parent) {
            Ok(dir) => Ok(self.check_resolved(&dir.join(name), link.uid())),
            Err(e) => Ok(Self::from_io_error(&e)),
        }
    }

    /// Validates each path independently, preserving order.
    pub fn validate_many<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<ValidationResult>> {
        paths.iter().map(|p| self.validate(p.as_ref())).collect()
    }

    /// Fails closed: a path that cannot be resolved counts as protected.
    pub fn is_protected(&self, path: &Path) -> bool {
        match fs::canonicalize(path) {
            Ok(resolved) => self.protecting_prefix(&resolved).is_some(),
            Err(_) => true,
        }
    }

    fn check_resolved(&self, resolved: &Path, owner: u32) -> ValidationResult {
        if self.reject_traversal
            && resolved
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return ValidationResult::invalid(
                "Path traversal detected",
                CleanErrorKind::TraversalDetected,
            );
        }

        if let Some(prefix) = self.protecting_prefix(resolved) {
            return ValidationResult::invalid(
                format!("Protected system path: {}", prefix.display()),
                CleanErrorKind::ProtectedPath,
            );
        }

        ValidationResult::valid(owner == 0)
    }

    fn protecting_prefix(&self, resolved: &Path) -> Option<&Path> {
        let resolved = resolved.to_string_lossy();
        self.protected_paths
            .iter()
            .find(|prefix| resolved.starts_with(prefix.to_string_lossy().as_ref()))
            .map(|p| p.as_path())
    }

    fn from_io_error(err: &std::io::Error) -> ValidationResult {
        // A dangling component or a symlink loop means nothing resolvable is there.
        let unresolvable = matches!(err.raw_os_error(), Some(libc::ENOTDIR) | Some(libc::ELOOP));
        match err.kind() {
            ErrorKind::NotFound => {
                ValidationResult::invalid("Path does not exist", CleanErrorKind::NotFound)
            }
            _ if unresolvable => {
                ValidationResult::invalid("Path does not exist", CleanErrorKind::NotFound)
            }
            ErrorKind::PermissionDenied => ValidationResult {
                requires_elevation: true,
                ..ValidationResult::invalid("Permission denied", CleanErrorKind::PermissionDenied)
            },
            _ => ValidationResult::invalid(err.to_string(), CleanErrorKind::Io),
        }
    }
}
