use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;

/// Ordinary, unprivileged removal.
pub trait FileRemover: Send + Sync {
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileRemover;

impl FileRemover for StdFileRemover {
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }
}

/// Removal with escalated privileges after an ordinary attempt was denied.
///
/// On failure the error carries the command's own error text.
pub trait PrivilegedRemover: Send + Sync {
    fn remove(&self, path: &Path) -> Result<(), String>;
}

/// `sudo -n rm -rf -- <path>`. Non-interactive, so it fails instead of prompting
/// when no cached credentials exist.
#[derive(Debug, Clone)]
pub struct SudoRemover {
    program: String,
}

impl SudoRemover {
    pub fn new() -> Self {
        Self::with_program("sudo")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        SudoRemover {
            program: program.into(),
        }
    }
}

impl Default for SudoRemover {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivilegedRemover for SudoRemover {
    fn remove(&self, path: &Path) -> Result<(), String> {
        let output = Command::new(&self.program)
            .arg("-n")
            .arg("rm")
            .arg("-rf")
            .arg("--")
            .arg(path)
            .output()
            .map_err(|e| format!("Failed to run {}: {}", self.program, e))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(format!(
                "{} failed (status: {:?}): {}",
                self.program,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }
}

/// One administrator prompt per item through `osascript`.
#[cfg(target_os = "macos")]
#[derive(Debug, Clone, Default)]
pub struct AdminPromptRemover;

#[cfg(target_os = "macos")]
impl PrivilegedRemover for AdminPromptRemover {
    fn remove(&self, path: &Path) -> Result<(), String> {
        let escaped = path
            .to_string_lossy()
            .replace('\\', "\\\\")
            .replace('"', "\\\"");
        let script = format!(
            "do shell script \"rm -rf \" & quoted form of POSIX path of \"{}\" with administrator privileges",
            escaped
        );

        let output = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .output()
            .map_err(|e| format!("Failed to run osascript: {}", e))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(format!(
                "osascript failed (status: {:?}): {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }
}

/// Remover for the configured program name; `osascript` selects the admin prompt on macOS.
pub fn remover_for(program: &str) -> Box<dyn PrivilegedRemover> {
    #[cfg(target_os = "macos")]
    if program == "osascript" {
        return Box::new(AdminPromptRemover);
    }
    Box::new(SudoRemover::with_program(program))
}

/// True when the process already runs with root privileges.
pub fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}
