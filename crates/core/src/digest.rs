//! Document digests for reporting, encoded SRI-style.

use crate::error::SignError;
use base64::Engine;
use sha2::{Digest as _, Sha256, Sha512};

/// Digest algorithms available for reporting on input and signed documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    Sha256,
    #[default]
    Sha512,
}

impl DigestAlgorithm {
    /// Lowercase name used as the SRI prefix.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    /// Parse `sha256`/`sha512`, case-insensitively, with or without a dash.
    pub fn from_name(s: &str) -> Result<Self, SignError> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(SignError::InvalidOption(format!(
                "unsupported digest algorithm: {s}"
            ))),
        }
    }
}

#[tracing::instrument(skip(data), fields(data_len = data.len(), alg = ?algorithm))]
pub fn compute_digest(algorithm: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
    }
}

/// Encode a digest as `<alg>-<base64>`.
pub fn encode_sri(algorithm: DigestAlgorithm, digest: &[u8]) -> String {
    format!(
        "{}-{}",
        algorithm.name(),
        base64::engine::general_purpose::STANDARD.encode(digest)
    )
}

/// Digest `data` and encode it in one step.
pub fn document_sri(algorithm: DigestAlgorithm, data: &[u8]) -> String {
    encode_sri(algorithm, &compute_digest(algorithm, data))
}
