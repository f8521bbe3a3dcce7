//! Run identifiers and the staged artifact paths they name.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Prefix shared by every staged file.
pub const RUN_ID_PREFIX: &str = "jsignpdf-";

/// Suffix JSignPdf substitutes for `.pdf` when naming its output.
pub const SIGNED_SUFFIX: &str = "_signed.pdf";

/// Identifier naming the staged files of one signing call.
///
/// The epoch milliseconds keep files sortable; the random token keeps calls
/// within the same millisecond apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let token = uuid::Uuid::new_v4().simple();
        Self(format!("{RUN_ID_PREFIX}{millis}-{token}"))
    }

    /// Use a caller-chosen identifier, e.g. for deterministic tests.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three files of one signing call, all inside the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPaths {
    pub dir: PathBuf,
    pub input: PathBuf,
    pub keystore: PathBuf,
    pub output: PathBuf,
}

impl StagedPaths {
    pub fn new(dir: &Path, run_id: &RunId) -> Self {
        let input = dir.join(format!("{run_id}.pdf"));
        let output = signed_output_path(&input);
        let keystore = dir.join(format!("{run_id}.pfx"));
        Self {
            dir: dir.to_path_buf(),
            input,
            keystore,
            output,
        }
    }

    /// All staged files, inputs first.
    pub fn all(&self) -> [&Path; 3] {
        [&self.input, &self.keystore, &self.output]
    }
}

/// Path JSignPdf writes for `input`: a trailing `.pdf` becomes `_signed.pdf`.
pub fn signed_output_path(input: &Path) -> PathBuf {
    let mut name: OsString = match input.file_name() {
        Some(n) => n.to_os_string(),
        None => return input.join(SIGNED_SUFFIX.trim_start_matches('_')),
    };
    if let Some(text) = name.to_str()
        && let Some(stem) = text.strip_suffix(".pdf")
    {
        name = OsString::from(stem);
    }
    name.push(SIGNED_SUFFIX);
    input.with_file_name(name)
}
