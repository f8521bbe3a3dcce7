//! Core primitives for pdf-signer: the signing options record, its mapping to
//! JSignPdf arguments, run identifiers, scratch storage and the error taxonomy.
//!
//! This crate never spawns processes; see `pdf-signer-jsignpdf` for that.

pub mod args;
pub mod digest;
pub mod error;
pub mod options;
pub mod scratch;
pub mod staging;

pub use args::{KEYSTORE_TYPE, build_arguments, option_arguments, redact, redacted};
pub use digest::{DigestAlgorithm, compute_digest, document_sri, encode_sri};
pub use error::{SignError, SignResult};
pub use options::{
    CertificationLevel, HashAlgorithm, PageSelection, RenderMode, SignatureBox, SigningOptions,
};
pub use scratch::{FsScratch, MemoryScratch, ScratchStorage};
pub use staging::{RunId, StagedPaths, signed_output_path};
