//! Signing options understood by JSignPdf.
//!
//! Every field is optional; an unset field leaves the decision to the tool.

use crate::error::SignError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Visual and cryptographic signature parameters.
///
/// Field names follow the camelCase JSON shape used for options files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SigningOptions {
    #[serde(default)]
    pub append: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification_level: Option<CertificationLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_algorithm: Option<HashAlgorithm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Layer 2 text of the visible signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_text: Option<String>,
    /// Layer 4 (status) text of the visible signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_box: Option<SignatureBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<PageSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_mode: Option<RenderMode>,
    #[serde(default)]
    pub visible: bool,
}

/// Placement of a visible signature in PDF user space.
///
/// Serialized as the array `[llx, lly, urx, ury]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct SignatureBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl SignatureBox {
    pub fn new(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self { llx, lly, urx, ury }
    }

    /// Coordinates in flag order: left, bottom, right, top.
    pub fn coordinates(&self) -> [f64; 4] {
        [self.llx, self.lly, self.urx, self.ury]
    }
}

impl From<[f64; 4]> for SignatureBox {
    fn from([llx, lly, urx, ury]: [f64; 4]) -> Self {
        Self { llx, lly, urx, ury }
    }
}

impl From<SignatureBox> for [f64; 4] {
    fn from(b: SignatureBox) -> Self {
        b.coordinates()
    }
}

/// Page receiving the visible signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelection {
    All,
    Number(u32),
}

impl PageSelection {
    /// Value passed to `--page`, or `None` when the selection is the zero page.
    pub fn as_flag_value(&self) -> Option<String> {
        match self {
            PageSelection::All => Some("ALL".to_string()),
            PageSelection::Number(0) => None,
            PageSelection::Number(n) => Some(n.to_string()),
        }
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSelection::All => f.write_str("ALL"),
            PageSelection::Number(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for PageSelection {
    type Err = SignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }
        s.parse::<u32>()
            .map(PageSelection::Number)
            .map_err(|_| SignError::InvalidOption(format!("page must be a number or ALL, got {s:?}")))
    }
}

impl Serialize for PageSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageSelection::All => serializer.serialize_str("ALL"),
            PageSelection::Number(n) => serializer.serialize_u32(*n),
        }
    }
}

impl<'de> Deserialize<'de> for PageSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(PageSelection::Number(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Declares a tool enum whose wire name is its SCREAMING_SNAKE_CASE spelling.
macro_rules! tool_enum {
    ($(#[$meta:meta])* $name:ident, $what:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Name passed to JSignPdf.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = SignError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().replace('-', "_");
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(&wanted))
                    .ok_or_else(|| SignError::InvalidOption(format!("unknown {} {:?}", $what, s)))
            }
        }
    };
}

tool_enum!(
    /// Certification level of the signature (DocMDP permissions).
    CertificationLevel, "certification level" {
        NotCertified => "NOT_CERTIFIED",
        CertifiedNoChangesAllowed => "CERTIFIED_NO_CHANGES_ALLOWED",
        CertifiedFormFilling => "CERTIFIED_FORM_FILLING",
        CertifiedFormFillingAndAnnotations => "CERTIFIED_FORM_FILLING_AND_ANNOTATIONS",
    }
);

tool_enum!(
    /// Digest algorithm used inside the PDF signature.
    HashAlgorithm, "hash algorithm" {
        Sha1 => "SHA1",
        Sha256 => "SHA256",
        Sha384 => "SHA384",
        Sha512 => "SHA512",
        Ripemd160 => "RIPEMD160",
    }
);

tool_enum!(
    /// Content of a visible signature.
    RenderMode, "render mode" {
        DescriptionOnly => "DESCRIPTION_ONLY",
        GraphicAndDescription => "GRAPHIC_AND_DESCRIPTION",
        SignameAndDescription => "SIGNAME_AND_DESCRIPTION",
    }
);

impl SigningOptions {
    /// Overlay every populated field of `other` onto `self`.
    ///
    /// Switches are OR-ed; `Some` values replace existing ones.
    pub fn merge(mut self, other: SigningOptions) -> Self {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        self.append |= other.append;
        self.visible |= other.visible;
        take(&mut self.bg_path, other.bg_path);
        take(&mut self.bg_scale, other.bg_scale);
        take(&mut self.contact, other.contact);
        take(&mut self.certification_level, other.certification_level);
        take(&mut self.font_size, other.font_size);
        take(&mut self.hash_algorithm, other.hash_algorithm);
        take(&mut self.img_path, other.img_path);
        take(&mut self.location, other.location);
        take(&mut self.signature_text, other.signature_text);
        take(&mut self.status_text, other.status_text);
        take(&mut self.signature_box, other.signature_box);
        take(&mut self.page_number, other.page_number);
        take(&mut self.reason, other.reason);
        take(&mut self.render_mode, other.render_mode);
        self
    }
}
