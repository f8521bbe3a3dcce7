//! Sign command: stage, run JSignPdf, write the signed document.

use anyhow::{Context, Result, bail};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_signer_core::{
    FsScratch, RunId, ScratchStorage, SignatureBox, SigningOptions, StagedPaths,
    build_arguments, document_sri, redact,
};
use pdf_signer_jsignpdf::{CleanupPolicy, ProcessInvoker, Signer, SigningRequest, ToolConfig};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::cli::{SignArgs, SignatureArgs, ToolArgs};
use crate::json::{DryRunJson, SignJson};
use crate::util::{format_bytes, format_elapsed};

fn default_signed_output_path(input: &Path) -> Result<PathBuf> {
    let mut p = input.to_path_buf();
    let stem = p
        .file_stem()
        .context("Input path must include a file name (cannot derive default output path)")?;
    let mut name: OsString = stem.to_os_string();
    name.push("_signed.pdf");
    p.set_file_name(name);
    Ok(p)
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message);
    spinner
}

fn read_file(path: &Path, what: &str) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut file = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open {what}: {}", path.display()))?,
    );
    file.read_to_end(&mut data)
        .with_context(|| format!("Failed to read {what}: {}", path.display()))?;
    Ok(data)
}

fn load_options(path: Option<&Path>) -> Result<SigningOptions> {
    let Some(path) = path else {
        return Ok(SigningOptions::default());
    };
    let data = read_file(path, "options file")?;
    serde_json::from_slice(&data)
        .with_context(|| format!("Invalid signing options in {}", path.display()))
}

impl SignatureArgs {
    fn into_options(self) -> Result<SigningOptions> {
        let signature_box = match self.signature_box {
            Some(coords) => {
                let Ok(coords) = <[f64; 4]>::try_from(coords.as_slice()) else {
                    bail!("--signature-box takes exactly four numbers: LLX LLY URX URY");
                };
                Some(SignatureBox::from(coords))
            }
            None => None,
        };

        Ok(SigningOptions {
            append: self.append,
            bg_path: self.bg_path,
            bg_scale: self.bg_scale,
            contact: self.contact,
            certification_level: self.certification_level,
            font_size: self.font_size,
            hash_algorithm: self.hash_algorithm,
            img_path: self.img_path,
            location: self.location,
            signature_text: self.signature_text,
            status_text: self.status_text,
            signature_box,
            page_number: self.page,
            reason: self.reason,
            render_mode: self.render_mode,
            visible: self.visible,
        })
    }
}

impl ToolArgs {
    fn tool_config(&self) -> ToolConfig {
        let mut config = ToolConfig::from_env();
        if let Some(java) = &self.java {
            config.program = java.clone();
        }
        if let Some(home) = &self.jsignpdf_home {
            config.working_dir = home.clone();
        }
        match self.timeout {
            Some(0) => config.timeout = None,
            Some(secs) => config.timeout = Some(Duration::from_secs(secs)),
            None => {}
        }
        config
    }

    fn scratch(&self) -> FsScratch {
        match &self.scratch_dir {
            Some(dir) => FsScratch::new(dir),
            None => FsScratch::temp_dir(),
        }
    }
}

pub fn sign(args: SignArgs, json: bool) -> Result<()> {
    let options = load_options(args.options.as_deref())?.merge(args.signature.into_options()?);
    let config = args.tool.tool_config();
    let scratch = args.tool.scratch();
    tracing::debug!(?options, ?config, "Resolved signing configuration");

    if args.dry_run {
        return print_dry_run(&config, &scratch, &options, args.keystore_pass.as_deref(), json);
    }

    eprintln!("{}", style("==> Signing PDF with JSignPdf").cyan().bold());

    let sp = spinner(format!("Reading PDF {}", style(args.input.display()).cyan()));
    let pdf_data = read_file(&args.input, "PDF")?;
    let keystore = read_file(&args.keystore, "keystore")?;
    sp.finish_with_message(format!(
        "[OK] Read PDF ({}) and keystore ({})",
        style(format_bytes(pdf_data.len())).cyan(),
        style(format_bytes(keystore.len())).cyan()
    ));

    let output_path = match args.output {
        Some(p) => p,
        None => default_signed_output_path(&args.input)?,
    };

    eprintln!(
        "    Tool: {} {}",
        style(config.program.display()).dim(),
        style(format!("(in {})", config.working_dir.display())).dim()
    );

    let cleanup = if args.keep_temp {
        CleanupPolicy::Keep
    } else {
        CleanupPolicy::Remove
    };
    let signer = Signer::new(scratch, ProcessInvoker::new(config)).with_cleanup(cleanup);
    let request = SigningRequest {
        document: &pdf_data,
        keystore: &keystore,
        options: &options,
        passphrase: args.keystore_pass.as_deref(),
    };

    let sp = spinner("Running JSignPdf...".to_string());
    let started = Instant::now();

    let rt = tokio::runtime::Runtime::new()?;
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    rt.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });
    let signed = match rt.block_on(signer.sign(request, &cancel)) {
        Ok(signed) => signed,
        Err(e) => {
            sp.finish_and_clear();
            return Err(e).context("JSignPdf could not sign the document");
        }
    };
    let elapsed = started.elapsed();

    sp.finish_with_message(format!(
        "[OK] Signed in {} ({})",
        style(format_elapsed(elapsed)).cyan(),
        style(format_bytes(signed.len())).cyan()
    ));

    if signed == pdf_data {
        eprintln!(
            "{} {}",
            style("Warning:").yellow().bold(),
            style("Signed output is identical to the input.").dim()
        );
    }

    let sp = spinner(format!(
        "Writing signed PDF to {}",
        style(output_path.display()).cyan()
    ));
    let mut out = BufWriter::new(
        File::create(&output_path)
            .with_context(|| format!("Failed to create output file: {}", output_path.display()))?,
    );
    out.write_all(&signed)?;
    out.flush()?;
    sp.finish_and_clear();

    eprintln!(
        "\n{} {}",
        style("[SUCCESS]").green().bold(),
        style("Signed successfully").cyan()
    );

    if json {
        let payload = SignJson {
            status: "ok",
            command: "sign",
            input: args.input.display().to_string(),
            output: output_path.display().to_string(),
            input_size: pdf_data.len(),
            output_size: signed.len(),
            input_digest: document_sri(args.digest, &pdf_data),
            output_digest: document_sri(args.digest, &signed),
            elapsed_ms: elapsed.as_millis(),
        };
        println!("{}", serde_json::to_string(&payload)?);
    } else {
        println!("{}", output_path.display());
    }

    Ok(())
}

/// Full command line the signer would run, passphrase masked.
fn dry_run_command(
    config: &ToolConfig,
    scratch: &FsScratch,
    options: &SigningOptions,
    passphrase: Option<&str>,
) -> Vec<String> {
    let paths = StagedPaths::new(scratch.dir(), &RunId::generate());
    let mut full: Vec<OsString> = vec![config.program.clone().into_os_string()];
    full.extend(config.program_args.iter().cloned());
    full.extend(build_arguments(options, passphrase, &paths));
    redact(&full)
}

fn print_dry_run(
    config: &ToolConfig,
    scratch: &FsScratch,
    options: &SigningOptions,
    passphrase: Option<&str>,
    json: bool,
) -> Result<()> {
    let shown = dry_run_command(config, scratch, options, passphrase);

    if json {
        let payload = DryRunJson {
            status: "ok",
            command: "sign",
            working_dir: config.working_dir.display().to_string(),
            args: shown,
        };
        println!("{}", serde_json::to_string(&payload)?);
    } else {
        eprintln!(
            "    Would run in {}:",
            style(config.working_dir.display()).dim()
        );
        println!("{}", shown.join(" "));
    }
    Ok(())
}
