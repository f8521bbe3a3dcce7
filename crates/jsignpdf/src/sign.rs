//! Staging, invoking JSignPdf and collecting the signed document.

use crate::config::{CleanupPolicy, ToolConfig};
use crate::invoker::{InvocationOutcome, ProcessInvoker, ToolInvoker};
use pdf_signer_core::{
    FsScratch, RunId, ScratchStorage, SignError, SignResult, SigningOptions, StagedPaths,
    build_arguments,
};
use std::io;
use tokio_util::sync::CancellationToken;

/// Inputs of one signing call.
#[derive(Debug, Clone, Copy)]
pub struct SigningRequest<'a> {
    pub document: &'a [u8],
    /// PKCS#12 keystore holding the signing key and chain.
    pub keystore: &'a [u8],
    pub options: &'a SigningOptions,
    pub passphrase: Option<&'a str>,
}

/// Orchestrates signing calls over a scratch storage and a tool invoker.
#[derive(Debug, Clone)]
pub struct Signer<S, I> {
    storage: S,
    invoker: I,
    cleanup: CleanupPolicy,
}

impl Signer<FsScratch, ProcessInvoker> {
    /// Signer staging in the platform temp directory and running the tool
    /// described by `config`.
    pub fn with_config(config: ToolConfig) -> Self {
        Self::new(FsScratch::temp_dir(), ProcessInvoker::new(config))
    }
}

impl<S, I> Signer<S, I>
where
    S: ScratchStorage,
    I: ToolInvoker,
{
    pub fn new(storage: S, invoker: I) -> Self {
        Self {
            storage,
            invoker,
            cleanup: CleanupPolicy::default(),
        }
    }

    pub fn with_cleanup(mut self, cleanup: CleanupPolicy) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Sign one document and return the signed bytes.
    #[tracing::instrument(
        skip_all,
        fields(
            document_len = request.document.len(),
            keystore_len = request.keystore.len(),
            run_id = tracing::field::Empty,
        )
    )]
    pub async fn sign(
        &self,
        request: SigningRequest<'_>,
        cancel: &CancellationToken,
    ) -> SignResult<Vec<u8>> {
        let run_id = RunId::generate();
        tracing::Span::current().record("run_id", run_id.as_str());
        let paths = StagedPaths::new(self.storage.dir(), &run_id);

        let result = self.run(&request, &paths, cancel).await;

        if self.cleanup == CleanupPolicy::Remove {
            self.remove_artifacts(&paths).await;
        }

        match &result {
            Ok(signed) => tracing::info!(signed_len = signed.len(), "Document signed"),
            Err(e) => tracing::debug!(error = %e, "Signing failed"),
        }
        result
    }

    async fn run(
        &self,
        request: &SigningRequest<'_>,
        paths: &StagedPaths,
        cancel: &CancellationToken,
    ) -> SignResult<Vec<u8>> {
        self.stage(request, paths).await?;

        let args = build_arguments(request.options, request.passphrase, paths);
        let outcome = self.invoker.invoke(&args, cancel).await?;

        self.collect(paths, outcome).await
    }

    async fn stage(&self, request: &SigningRequest<'_>, paths: &StagedPaths) -> SignResult<()> {
        tracing::debug!(dir = %paths.dir.display(), "Staging inputs");
        self.storage
            .prepare()
            .await
            .map_err(|source| SignError::Staging {
                path: paths.dir.clone(),
                source,
            })?;

        let document = async {
            self.storage
                .write(&paths.input, request.document)
                .await
                .map_err(|source| SignError::Staging {
                    path: paths.input.clone(),
                    source,
                })
        };
        let keystore = async {
            self.storage
                .write(&paths.keystore, request.keystore)
                .await
                .map_err(|source| SignError::Staging {
                    path: paths.keystore.clone(),
                    source,
                })
        };
        tokio::try_join!(document, keystore)?;
        Ok(())
    }

    async fn collect(
        &self,
        paths: &StagedPaths,
        outcome: InvocationOutcome,
    ) -> SignResult<Vec<u8>> {
        match self.storage.read(&paths.output).await {
            Ok(signed) => {
                if !outcome.success() {
                    tracing::warn!(
                        exit_code = ?outcome.exit_code,
                        "Signing tool reported failure but produced output"
                    );
                }
                Ok(signed)
            }
            Err(source) => Err(SignError::OutputUnavailable {
                path: paths.output.clone(),
                exit_code: outcome.exit_code,
                diagnostics: outcome.diagnostics().to_string(),
                source,
            }),
        }
    }

    async fn remove_artifacts(&self, paths: &StagedPaths) {
        for path in paths.all() {
            match self.storage.remove(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged file")
                }
            }
        }
    }
}

/// Sign `pdf` with the PKCS#12 keystore `p12`, using the tool configured by
/// the `JSIGNPDF_*` environment and the platform temp directory.
///
/// Staged files are left in place.
pub async fn sign_pdf(
    pdf: &[u8],
    p12: &[u8],
    options: &SigningOptions,
    passphrase: Option<&str>,
) -> SignResult<Vec<u8>> {
    let signer = Signer::with_config(ToolConfig::from_env());
    let request = SigningRequest {
        document: pdf,
        keystore: p12,
        options,
        passphrase,
    };
    signer.sign(request, &CancellationToken::new()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pdf_signer_core::{MemoryScratch, PageSelection};
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const KEYSTORE: &[u8] = b"PKCS12-KEYSTORE";

    /// Stands in for JSignPdf: signs by appending a marker that names the
    /// options it was given, provided the keystore it finds is the expected one.
    struct FakeTool {
        scratch: Arc<MemoryScratch>,
        calls: AtomicUsize,
        seen: Mutex<Vec<Vec<String>>>,
    }

    impl FakeTool {
        fn new(scratch: Arc<MemoryScratch>) -> Self {
            Self {
                scratch,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn value_after(args: &[String], flag: &str) -> Option<String> {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1).cloned())
        }
    }

    #[async_trait]
    impl ToolInvoker for FakeTool {
        async fn invoke(
            &self,
            args: &[OsString],
            _cancel: &CancellationToken,
        ) -> SignResult<InvocationOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let args: Vec<String> = args
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect();
            self.seen.lock().unwrap().push(args.clone());

            let input = PathBuf::from(args.last().unwrap());
            let keystore = Self::value_after(&args, "--keystore-file").unwrap();
            if self.scratch.get(Path::new(&keystore)).as_deref() != Some(KEYSTORE) {
                return Ok(InvocationOutcome {
                    exit_code: Some(2),
                    stderr: "SEVERE: Keystore could not be loaded".to_string(),
                    ..Default::default()
                });
            }

            let mut signed = self.scratch.get(&input).unwrap();
            let reason = Self::value_after(&args, "--reason").unwrap_or_default();
            signed.extend_from_slice(format!("\n%SIGNED reason={reason}").as_bytes());
            self.scratch
                .insert(pdf_signer_core::signed_output_path(&input), signed);
            Ok(InvocationOutcome {
                exit_code: Some(0),
                ..Default::default()
            })
        }
    }

    /// Forwards to a shared `MemoryScratch` so tests can inspect it afterwards.
    struct SharedScratch(Arc<MemoryScratch>);

    #[async_trait]
    impl ScratchStorage for SharedScratch {
        fn dir(&self) -> &Path {
            self.0.dir()
        }
        async fn prepare(&self) -> io::Result<()> {
            self.0.prepare().await
        }
        async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
            self.0.write(path, bytes).await
        }
        async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.0.read(path).await
        }
        async fn remove(&self, path: &Path) -> io::Result<()> {
            self.0.remove(path).await
        }
    }

    /// Scratch storage whose writes always fail.
    struct ReadOnlyScratch;

    #[async_trait]
    impl ScratchStorage for ReadOnlyScratch {
        fn dir(&self) -> &Path {
            Path::new("/read-only")
        }
        async fn prepare(&self) -> io::Result<()> {
            Ok(())
        }
        async fn write(&self, _path: &Path, _bytes: &[u8]) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        }
        async fn read(&self, _path: &Path) -> io::Result<Vec<u8>> {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }
        async fn remove(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    fn fake_signer() -> (Signer<SharedScratch, FakeTool>, Arc<MemoryScratch>) {
        let scratch = Arc::new(MemoryScratch::new("/scratch"));
        let signer = Signer::new(
            SharedScratch(scratch.clone()),
            FakeTool::new(scratch.clone()),
        );
        (signer, scratch)
    }

    fn request<'a>(
        document: &'a [u8],
        keystore: &'a [u8],
        options: &'a SigningOptions,
        passphrase: Option<&'a str>,
    ) -> SigningRequest<'a> {
        SigningRequest {
            document,
            keystore,
            options,
            passphrase,
        }
    }

    #[tokio::test]
    async fn returns_the_tool_output() {
        let (signer, scratch) = fake_signer();
        let options = SigningOptions {
            reason: Some("Approval".into()),
            ..Default::default()
        };
        let signed = signer
            .sign(
                request(b"%PDF-1.7 body", KEYSTORE, &options, Some("secret")),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!signed.is_empty());
        assert_ne!(signed, b"%PDF-1.7 body");
        assert!(signed.ends_with(b"%SIGNED reason=Approval"));

        // Default policy keeps all three staged files.
        let staged = scratch.paths();
        assert_eq!(staged.len(), 3);
        assert!(staged.iter().any(|p| p.to_string_lossy().ends_with(".pfx")));
        assert!(
            staged
                .iter()
                .any(|p| p.to_string_lossy().ends_with("_signed.pdf"))
        );
    }

    #[tokio::test]
    async fn passes_the_staged_paths_to_the_tool() {
        let (signer, scratch) = fake_signer();
        let options = SigningOptions {
            append: true,
            visible: true,
            page_number: Some(PageSelection::All),
            ..Default::default()
        };
        signer
            .sign(
                request(b"%PDF", KEYSTORE, &options, None),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let seen = signer.invoker().seen.lock().unwrap().clone();
        let args = &seen[0];
        assert_eq!(&args[..4], ["--keystore-type", "PKCS12", "--out-directory", "/scratch"]);
        assert!(!args.iter().any(|a| a == "--keystore-pass"));
        for flag in ["--append", "--visible"] {
            assert!(args.iter().any(|a| a == flag), "missing {flag}");
        }
        assert_eq!(FakeTool::value_after(args, "--page").as_deref(), Some("ALL"));

        let input = PathBuf::from(args.last().unwrap());
        assert_eq!(scratch.get(&input).as_deref(), Some(&b"%PDF"[..]));
    }

    #[tokio::test]
    async fn unreadable_keystore_fails_at_the_output_read() {
        let (signer, _scratch) = fake_signer();
        let err = signer
            .sign(
                request(b"%PDF", b"not a keystore", &SigningOptions::default(), None),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            SignError::OutputUnavailable {
                exit_code,
                diagnostics,
                ..
            } => {
                assert_eq!(exit_code, Some(2));
                assert!(diagnostics.contains("Keystore"));
            }
            other => panic!("expected OutputUnavailable, got {other:?}"),
        }
    }

    /// Fails the way JSignPdf does for a wrong passphrase: message on stdout,
    /// nothing written.
    struct StdoutOnlyFailure;

    #[async_trait]
    impl ToolInvoker for StdoutOnlyFailure {
        async fn invoke(
            &self,
            _args: &[OsString],
            _cancel: &CancellationToken,
        ) -> SignResult<InvocationOutcome> {
            Ok(InvocationOutcome {
                exit_code: Some(1),
                stdout: "INFO Loading keystore\nSEVERE Wrong password\n".to_string(),
                stderr: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn stdout_explains_failure_when_stderr_is_empty() {
        let signer = Signer::new(MemoryScratch::new("/scratch"), StdoutOnlyFailure);
        let err = signer
            .sign(
                request(b"%PDF", KEYSTORE, &SigningOptions::default(), Some("wrong")),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SignError::OutputUnavailable { .. }), "{err:?}");
        let msg = err.to_string();
        assert!(msg.contains("code 1"), "{msg}");
        assert!(msg.ends_with("SEVERE Wrong password"), "{msg}");
    }

    #[tokio::test]
    async fn staging_failure_never_launches_the_tool() {
        let scratch = Arc::new(MemoryScratch::new("/unused"));
        let signer = Signer::new(ReadOnlyScratch, FakeTool::new(scratch));
        let err = signer
            .sign(
                request(b"%PDF", KEYSTORE, &SigningOptions::default(), None),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SignError::Staging { .. }), "{err:?}");
        assert_eq!(signer.invoker().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_calls_do_not_interfere() {
        let (signer, _scratch) = fake_signer();
        let first = SigningOptions {
            reason: Some("first".into()),
            ..Default::default()
        };
        let second = SigningOptions {
            reason: Some("second".into()),
            ..Default::default()
        };
        let cancel = CancellationToken::new();

        let (a, b) = tokio::join!(
            signer.sign(request(b"%PDF same", KEYSTORE, &first, None), &cancel),
            signer.sign(request(b"%PDF same", KEYSTORE, &second, None), &cancel),
        );

        assert!(a.unwrap().ends_with(b"reason=first"));
        assert!(b.unwrap().ends_with(b"reason=second"));
    }

    #[tokio::test]
    async fn remove_policy_cleans_up_on_success_and_failure() {
        let (signer, scratch) = fake_signer();
        let signer = signer.with_cleanup(CleanupPolicy::Remove);

        signer
            .sign(
                request(b"%PDF", KEYSTORE, &SigningOptions::default(), None),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(scratch.paths().is_empty());

        signer
            .sign(
                request(b"%PDF", b"bad", &SigningOptions::default(), None),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(scratch.paths().is_empty());
    }

    /// `sh` stand-in that copies the staged input to `<input>_signed.pdf` and
    /// appends a marker.
    #[cfg(unix)]
    fn copying_tool(working_dir: &Path) -> ProcessInvoker {
        let script = r#"
            for last; do :; done
            out="${last%.pdf}_signed.pdf"
            cp "$last" "$out" && printf '%%SIGNED' >> "$out"
        "#;
        ProcessInvoker::new(ToolConfig {
            program: PathBuf::from("sh"),
            program_args: vec!["-c".into(), script.into(), "sh".into()],
            working_dir: working_dir.to_path_buf(),
            timeout: Some(std::time::Duration::from_secs(30)),
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn signs_through_a_real_process_and_filesystem() {
        let tmp = tempfile::tempdir().unwrap();
        let signer = Signer::new(
            FsScratch::new(tmp.path().join("scratch")),
            copying_tool(tmp.path()),
        )
        .with_cleanup(CleanupPolicy::Remove);

        let signed = signer
            .sign(
                request(b"%PDF-1.4\n%%EOF\n", KEYSTORE, &SigningOptions::default(), Some("pw")),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(signed, b"%PDF-1.4\n%%EOF\n%SIGNED");
        let leftovers = std::fs::read_dir(tmp.path().join("scratch")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn relative_scratch_dir_works_from_another_working_dir() {
        let local = tempfile::tempdir_in(".").unwrap();
        let relative = local
            .path()
            .strip_prefix(std::env::current_dir().unwrap())
            .unwrap_or(local.path())
            .join("scratch");
        assert!(relative.is_relative());
        let tool_home = tempfile::tempdir().unwrap();

        let signer = Signer::new(FsScratch::new(&relative), copying_tool(tool_home.path()));
        let signed = signer
            .sign(
                request(b"%PDF-1.7\n", KEYSTORE, &SigningOptions::default(), None),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(signed, b"%PDF-1.7\n%SIGNED");
        assert!(std::fs::read_dir(tool_home.path()).unwrap().next().is_none());
    }
}
