use clap::{Args, Parser, Subcommand};
use pdf_signer_core::{
    CertificationLevel, DigestAlgorithm, HashAlgorithm, PageSelection, RenderMode, SignError,
};
use std::str::FromStr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pdf-signer",
    about = "Sign PDFs with a PKCS#12 keystore through JSignPdf",
    long_about = "Sign PDFs with a PKCS#12 keystore. The signing itself is done by JSignPdf, \
                  which must be installed together with a Java runtime."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output machine-readable JSON to stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging (sets RUST_LOG=debug if not already set)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign a PDF file
    Sign(SignArgs),
}

#[derive(Args)]
pub struct SignArgs {
    /// Path to the PDF file to sign
    pub input: PathBuf,

    /// PKCS#12 keystore (.p12 / .pfx) holding the signing key
    #[arg(short, long)]
    pub keystore: PathBuf,

    /// Output path for signed PDF (default: <input>_signed.pdf)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keystore passphrase
    #[arg(long, env = "PDF_SIGNER_KEYSTORE_PASS", hide_env_values = true)]
    pub keystore_pass: Option<String>,

    /// JSON file with signing options; individual flags override its fields
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,

    #[command(flatten)]
    pub signature: SignatureArgs,

    #[command(flatten)]
    pub tool: ToolArgs,

    /// Keep the staged files in the scratch directory
    #[arg(long)]
    pub keep_temp: bool,

    /// Print the JSignPdf arguments instead of signing
    #[arg(long)]
    pub dry_run: bool,

    /// Digest reported for the input and signed documents (sha256 or sha512)
    #[arg(long, default_value = "sha512", value_parser = parse_digest)]
    pub digest: DigestAlgorithm,
}

#[derive(Args, Default)]
#[command(next_help_heading = "Signature options")]
pub struct SignatureArgs {
    /// Append the signature instead of rewriting the document
    #[arg(long)]
    pub append: bool,

    /// Add a visible signature
    #[arg(long)]
    pub visible: bool,

    /// Background image of the visible signature
    #[arg(long)]
    pub bg_path: Option<String>,

    /// Background image scale (-1 stretches, 0 keeps the tool default)
    #[arg(long, allow_negative_numbers = true)]
    pub bg_scale: Option<f64>,

    /// Signer contact information
    #[arg(long)]
    pub contact: Option<String>,

    /// NOT_CERTIFIED, CERTIFIED_NO_CHANGES_ALLOWED, CERTIFIED_FORM_FILLING or
    /// CERTIFIED_FORM_FILLING_AND_ANNOTATIONS
    #[arg(long, value_name = "LEVEL", value_parser = parse_tool_name::<CertificationLevel>)]
    pub certification_level: Option<CertificationLevel>,

    /// Font size of the visible signature text
    #[arg(long)]
    pub font_size: Option<f64>,

    /// Hash inside the signature: SHA1, SHA256, SHA384, SHA512 or RIPEMD160
    #[arg(long, value_name = "ALG", value_parser = parse_tool_name::<HashAlgorithm>)]
    pub hash_algorithm: Option<HashAlgorithm>,

    /// Image shown in the visible signature
    #[arg(long)]
    pub img_path: Option<String>,

    /// Signing location
    #[arg(long)]
    pub location: Option<String>,

    /// Signature text (layer 2)
    #[arg(long = "l2-text", value_name = "TEXT")]
    pub signature_text: Option<String>,

    /// Status text (layer 4)
    #[arg(long = "l4-text", value_name = "TEXT")]
    pub status_text: Option<String>,

    /// Visible signature rectangle
    #[arg(
        long,
        num_args = 4,
        value_names = ["LLX", "LLY", "URX", "URY"],
        allow_negative_numbers = true
    )]
    pub signature_box: Option<Vec<f64>>,

    /// Page for the visible signature: a page number or ALL
    #[arg(long, value_parser = parse_page)]
    pub page: Option<PageSelection>,

    /// Signing reason
    #[arg(long)]
    pub reason: Option<String>,

    /// DESCRIPTION_ONLY, GRAPHIC_AND_DESCRIPTION or SIGNAME_AND_DESCRIPTION
    #[arg(long, value_name = "MODE", value_parser = parse_tool_name::<RenderMode>)]
    pub render_mode: Option<RenderMode>,
}

#[derive(Args)]
#[command(next_help_heading = "JSignPdf")]
pub struct ToolArgs {
    /// Java launcher (default: $JSIGNPDF_JAVA or `java`)
    #[arg(long)]
    pub java: Option<PathBuf>,

    /// JSignPdf installation directory (default: $JSIGNPDF_HOME, else
    /// lib/jsignpdf-2.3.0 next to the pdf-signer executable)
    #[arg(long)]
    pub jsignpdf_home: Option<PathBuf>,

    /// Kill JSignPdf after this many seconds (default: $JSIGNPDF_TIMEOUT_SECS or none)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directory for staged files (default: the system temp directory)
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,
}

fn parse_page(s: &str) -> Result<PageSelection, String> {
    s.parse().map_err(|e: SignError| e.to_string())
}

/// Tool enum names; case and `-`/`_` are not significant.
fn parse_tool_name<T: FromStr<Err = SignError>>(s: &str) -> Result<T, String> {
    s.parse().map_err(|e: SignError| e.to_string())
}

fn parse_digest(s: &str) -> Result<DigestAlgorithm, String> {
    DigestAlgorithm::from_name(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> SignArgs {
        let cli = Cli::try_parse_from(std::iter::once("pdf-signer").chain(args.iter().copied()))
            .unwrap();
        match cli.command {
            Commands::Sign(args) => args,
        }
    }

    #[test]
    fn parses_signature_flags() {
        let args = parse(&[
            "sign",
            "in.pdf",
            "--keystore",
            "id.p12",
            "--visible",
            "--signature-box",
            "10",
            "-20",
            "200",
            "80",
            "--page",
            "ALL",
            "--hash-algorithm",
            "SHA256",
            "--certification-level",
            "CERTIFIED_FORM_FILLING",
            "--l2-text",
            "Signed",
            "--bg-scale",
            "-1",
        ]);
        let sig = &args.signature;
        assert!(sig.visible);
        assert_eq!(sig.signature_box.as_deref(), Some(&[10.0, -20.0, 200.0, 80.0][..]));
        assert_eq!(sig.page, Some(PageSelection::All));
        assert_eq!(sig.hash_algorithm, Some(HashAlgorithm::Sha256));
        assert_eq!(
            sig.certification_level,
            Some(CertificationLevel::CertifiedFormFilling)
        );
        assert_eq!(sig.signature_text.as_deref(), Some("Signed"));
        assert_eq!(sig.bg_scale, Some(-1.0));
    }

    #[test]
    fn rejects_bad_page() {
        let result = Cli::try_parse_from([
            "pdf-signer",
            "sign",
            "in.pdf",
            "--keystore",
            "id.p12",
            "--page",
            "last",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn tool_names_parse_leniently() {
        let args = parse(&[
            "sign",
            "in.pdf",
            "-k",
            "id.p12",
            "--hash-algorithm",
            "sha384",
            "--render-mode",
            "graphic-and-description",
            "--certification-level",
            "not_certified",
        ]);
        let sig = &args.signature;
        assert_eq!(sig.hash_algorithm, Some(HashAlgorithm::Sha384));
        assert_eq!(sig.render_mode, Some(RenderMode::GraphicAndDescription));
        assert_eq!(sig.certification_level, Some(CertificationLevel::NotCertified));

        let err = Cli::try_parse_from([
            "pdf-signer",
            "sign",
            "in.pdf",
            "-k",
            "id.p12",
            "--hash-algorithm",
            "MD5",
        ])
        .err()
        .unwrap();
        assert!(err.to_string().contains("unknown hash algorithm"), "{err}");
    }

    #[test]
    fn digest_defaults_to_sha512() {
        let args = parse(&["sign", "in.pdf", "-k", "id.p12"]);
        assert_eq!(args.digest, DigestAlgorithm::Sha512);

        let args = parse(&["sign", "in.pdf", "-k", "id.p12", "--digest", "SHA-256"]);
        assert_eq!(args.digest, DigestAlgorithm::Sha256);

        assert!(
            Cli::try_parse_from(["pdf-signer", "sign", "in.pdf", "-k", "id.p12", "--digest", "md5"])
                .is_err()
        );
    }
}
