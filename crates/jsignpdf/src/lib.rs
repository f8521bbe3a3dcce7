//! JSignPdf backend: signs PDFs by running the JSignPdf tool as a subprocess.

pub mod config;
pub mod invoker;
pub mod sign;

pub use config::{CleanupPolicy, ToolConfig};
pub use invoker::{InvocationOutcome, ProcessInvoker, ToolInvoker};
pub use sign::{Signer, SigningRequest, sign_pdf};

/// Defaults for locating the tool.
pub const DEFAULT_JAVA: &str = "java";
pub const DEFAULT_JAR: &str = "JSignPdf.jar";
/// Install directory, relative to the directory of the running executable
/// (see [`config::default_install_dir`]).
pub const DEFAULT_INSTALL_DIR: &str = "lib/jsignpdf-2.3.0";
