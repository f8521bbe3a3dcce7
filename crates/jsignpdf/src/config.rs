//! Where the signing tool lives and how long it may run.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_JAVA: &str = "JSIGNPDF_JAVA";
pub const ENV_HOME: &str = "JSIGNPDF_HOME";
pub const ENV_JAR: &str = "JSIGNPDF_JAR";
pub const ENV_TIMEOUT_SECS: &str = "JSIGNPDF_TIMEOUT_SECS";

/// How to launch JSignPdf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Program to execute, normally the Java launcher.
    pub program: PathBuf,
    /// Arguments placed before the signing arguments.
    pub program_args: Vec<OsString>,
    /// Working directory of the tool: its installation directory.
    pub working_dir: PathBuf,
    /// Kill the tool after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// [`crate::DEFAULT_INSTALL_DIR`] next to the running executable, so the
/// default does not depend on the caller's current directory.
pub fn default_install_dir() -> PathBuf {
    let exe = std::env::current_exe().ok();
    install_dir_beside(exe.as_deref().and_then(Path::parent))
}

fn install_dir_beside(exe_dir: Option<&Path>) -> PathBuf {
    let relative = Path::new(crate::DEFAULT_INSTALL_DIR);
    match exe_dir {
        Some(dir) => dir.join(relative),
        None => std::path::absolute(relative).unwrap_or_else(|_| relative.to_path_buf()),
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self::java(crate::DEFAULT_JAVA, default_install_dir(), crate::DEFAULT_JAR)
    }
}

impl ToolConfig {
    /// `<java> -jar <jar>` run from `install_dir`.
    pub fn java(
        java: impl Into<PathBuf>,
        install_dir: impl Into<PathBuf>,
        jar: impl Into<OsString>,
    ) -> Self {
        Self {
            program: java.into(),
            program_args: vec!["-jar".into(), jar.into()],
            working_dir: install_dir.into(),
            timeout: None,
        }
    }

    /// Defaults overridden by `JSIGNPDF_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::java(
            get(ENV_JAVA).unwrap_or_else(|| crate::DEFAULT_JAVA.to_string()),
            get(ENV_HOME).map_or_else(default_install_dir, PathBuf::from),
            get(ENV_JAR).unwrap_or_else(|| crate::DEFAULT_JAR.to_string()),
        );

        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => {}
                Ok(secs) => config.timeout = Some(Duration::from_secs(secs)),
                Err(_) => {
                    tracing::warn!(value = %raw, "Ignoring unparsable {}", ENV_TIMEOUT_SECS)
                }
            }
        }
        config
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program name for diagnostics.
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

/// What happens to staged files once a call finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    /// Leave the files in the scratch directory.
    #[default]
    Keep,
    /// Delete inputs and output whatever the outcome.
    Remove,
}
