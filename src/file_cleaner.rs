pub mod catalog;
mod engine;
pub mod error;
pub mod patterns;
pub mod removal;
mod scanner;
pub mod telemetry;
pub mod types;
mod validation;


pub use catalog::{CatalogData, CatalogStore, JsonFileStore, MemoryStore, PathCatalog};
pub use engine::FileCleaner;
pub use error::{CleanErrorKind, CleanerError, Result};
pub use removal::{FileRemover, PrivilegedRemover, StdFileRemover, SudoRemover};
pub use scanner::{DirectoryScanner, ScanOptions};
pub use telemetry::CleanupLog;
pub use types::{
    format_size, CleanItem, CleanResult, CleanedItem, FailedItem, FileDescriptor, FileKind,
    FilePreview, LocationUsage, PreviewContent, ValidationResult,
};
pub use validation::PathValidator;
