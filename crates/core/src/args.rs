//! Translation of signing options into JSignPdf command-line arguments.
//!
//! The mapping is a fixed table evaluated in order, so the same options always
//! produce the same argument sequence. A field contributes nothing when it is
//! unset *or* falsy: `false`, an empty string, `0` and `NaN` are all omitted.
//! A zero font size or background scale therefore falls back to the tool
//! default. The signature box is the exception: when present, all four
//! coordinates are emitted whatever their values.

use crate::options::SigningOptions;
use crate::staging::StagedPaths;
use std::ffi::OsString;

/// Keystore format passed to the tool; the staged keystore is always PKCS#12.
pub const KEYSTORE_TYPE: &str = "PKCS12";

const PASSPHRASE_FLAG: &str = "--keystore-pass";

enum FlagRule {
    /// Flag without a value, emitted when the predicate holds.
    Switch {
        flag: &'static str,
        enabled: fn(&SigningOptions) -> bool,
    },
    /// Flag followed by one value, emitted when a value is produced.
    Value {
        flag: &'static str,
        value: fn(&SigningOptions) -> Option<String>,
    },
    /// Four flag/value pairs emitted together or not at all.
    Quad {
        flags: [&'static str; 4],
        values: fn(&SigningOptions) -> Option<[f64; 4]>,
    },
}

const OPTION_RULES: &[FlagRule] = &[
    FlagRule::Switch {
        flag: "--append",
        enabled: |o| o.append,
    },
    FlagRule::Switch {
        flag: "--visible",
        enabled: |o| o.visible,
    },
    FlagRule::Value {
        flag: "--bg-path",
        value: |o| text(&o.bg_path),
    },
    FlagRule::Value {
        flag: "--bg-scale",
        value: |o| number(o.bg_scale),
    },
    FlagRule::Value {
        flag: "--contact",
        value: |o| text(&o.contact),
    },
    FlagRule::Value {
        flag: "--certification-level",
        value: |o| o.certification_level.map(|v| v.as_str().to_string()),
    },
    FlagRule::Value {
        flag: "--font-size",
        value: |o| number(o.font_size),
    },
    FlagRule::Value {
        flag: "--hash-algorithm",
        value: |o| o.hash_algorithm.map(|v| v.as_str().to_string()),
    },
    FlagRule::Value {
        flag: "--img-path",
        value: |o| text(&o.img_path),
    },
    FlagRule::Value {
        flag: "--location",
        value: |o| text(&o.location),
    },
    FlagRule::Value {
        flag: "--l2-text",
        value: |o| text(&o.signature_text),
    },
    FlagRule::Value {
        flag: "--l4-text",
        value: |o| text(&o.status_text),
    },
    FlagRule::Quad {
        flags: ["-llx", "-lly", "-urx", "-ury"],
        values: |o| o.signature_box.map(|b| b.coordinates()),
    },
    FlagRule::Value {
        flag: "--page",
        value: |o| o.page_number.and_then(|p| p.as_flag_value()),
    },
    FlagRule::Value {
        flag: "--reason",
        value: |o| text(&o.reason),
    },
    FlagRule::Value {
        flag: "--render-mode",
        value: |o| o.render_mode.map(|v| v.as_str().to_string()),
    },
];

fn text(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

fn number(value: Option<f64>) -> Option<String> {
    value
        .filter(|n| *n != 0.0 && !n.is_nan())
        .map(format_number)
}

/// Shortest decimal rendering: `1`, `1.5`, `-1`.
fn format_number(n: f64) -> String {
    format!("{n}")
}

/// Build the full argument list for one signing call.
///
/// The list starts with the fixed keystore and output-directory arguments and
/// ends with the staged input document.
pub fn build_arguments(
    options: &SigningOptions,
    passphrase: Option<&str>,
    paths: &StagedPaths,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--keystore-type".into(),
        KEYSTORE_TYPE.into(),
        "--out-directory".into(),
        paths.dir.clone().into_os_string(),
        "--keystore-file".into(),
        paths.keystore.clone().into_os_string(),
    ];

    if let Some(pass) = passphrase.filter(|p| !p.is_empty()) {
        args.push(PASSPHRASE_FLAG.into());
        args.push(pass.into());
    }

    args.extend(option_arguments(options).into_iter().map(OsString::from));
    args.push(paths.input.clone().into_os_string());
    args
}

/// Arguments contributed by `options` alone, in table order.
pub fn option_arguments(options: &SigningOptions) -> Vec<String> {
    let mut args = Vec::new();
    for rule in OPTION_RULES {
        match rule {
            FlagRule::Switch { flag, enabled } => {
                if enabled(options) {
                    args.push((*flag).to_string());
                }
            }
            FlagRule::Value { flag, value } => {
                if let Some(v) = value(options) {
                    args.push((*flag).to_string());
                    args.push(v);
                }
            }
            FlagRule::Quad { flags, values } => {
                if let Some(vs) = values(options) {
                    for (flag, v) in flags.iter().zip(vs) {
                        args.push((*flag).to_string());
                        args.push(format_number(v));
                    }
                }
            }
        }
    }
    args
}

/// Argument list with the keystore passphrase masked, for logs and display.
pub fn redact(args: &[OsString]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            out.push("********".to_string());
            mask_next = false;
            continue;
        }
        mask_next = arg == PASSPHRASE_FLAG;
        out.push(arg.to_string_lossy().into_owned());
    }
    out
}

/// [`redact`] joined into one line.
pub fn redacted(args: &[OsString]) -> String {
    redact(args).join(" ")
}
