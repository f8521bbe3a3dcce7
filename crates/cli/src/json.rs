//! JSON output formats.

use serde::Serialize;

#[derive(Serialize)]
pub struct SignJson<'a> {
    pub status: &'a str,
    pub command: &'a str,
    pub input: String,
    pub output: String,
    pub input_size: usize,
    pub output_size: usize,
    /// SRI digest of the unsigned input.
    pub input_digest: String,
    /// SRI digest of the signed output.
    pub output_digest: String,
    pub elapsed_ms: u128,
}

#[derive(Serialize)]
pub struct DryRunJson<'a> {
    pub status: &'a str,
    pub command: &'a str,
    pub working_dir: String,
    /// Full command line, passphrase masked.
    pub args: Vec<String>,
}

#[derive(Serialize)]
pub struct ErrorJson<'a> {
    pub status: &'a str,
    pub error: String,
    pub causes: Vec<String>,
}
