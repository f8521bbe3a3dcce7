//! Error taxonomy for a signing call.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the signing crates.
pub type SignResult<T> = Result<T, SignError>;

/// Failure of one signing call. The first fatal condition ends the call.
#[derive(Error, Debug)]
pub enum SignError {
    /// Writing an input to the scratch area failed.
    #[error("Failed to stage {}", .path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The signing tool could not be started or awaited.
    #[error("Failed to run signing tool {program}")]
    Invocation {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Signing tool did not finish within {after:?}")]
    TimedOut { after: Duration },

    #[error("Signing was cancelled")]
    Cancelled,

    /// The tool exited but its output document could not be read. Usually the
    /// tool rejected the keystore, the passphrase or the input document.
    ///
    /// `diagnostics` is the tool's stderr, or its stdout when stderr was empty.
    #[error(
        "Signed output {} is unavailable{}",
        .path.display(),
        describe_exit(.exit_code, .diagnostics)
    )]
    OutputUnavailable {
        path: PathBuf,
        exit_code: Option<i32>,
        diagnostics: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid option value: {0}")]
    InvalidOption(String),
}

fn describe_exit(exit_code: &Option<i32>, diagnostics: &str) -> String {
    let mut out = match exit_code {
        Some(code) => format!(" (tool exited with code {code})"),
        None => String::new(),
    };
    let last_line = diagnostics.lines().rev().find(|l| !l.trim().is_empty());
    if let Some(line) = last_line {
        out.push_str(": ");
        out.push_str(line.trim());
    }
    out
}
