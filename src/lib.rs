pub mod config;
mod file_cleaner;

pub use config::CleanerConfig;
pub use file_cleaner::{
    format_size, CatalogData, CatalogStore, CleanErrorKind, CleanItem, CleanResult, CleanedItem,
    CleanerError, CleanupLog, DirectoryScanner, FailedItem, FileCleaner, FileDescriptor,
    FileKind, FilePreview, FileRemover, JsonFileStore, LocationUsage, MemoryStore, PathCatalog,
    PathValidator, PreviewContent, PrivilegedRemover, Result, ScanOptions, StdFileRemover,
    SudoRemover, ValidationResult,
};
pub use file_cleaner::patterns::GlobPattern;
pub use file_cleaner::removal::running_as_root;
