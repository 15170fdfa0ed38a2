//! Codecs for the intermediate representations the OSC chain edits
//!
//! - systemd unit files <-> ordered [`UnitOption`]s
//! - inline file content <-> raw bytes (plain or `b64`)
//! - kubelet configuration file <-> [`KubeletConfiguration`]
//!
//! Each codec sits behind a trait so the mutator can be built with fakes.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use extensions_common::apis::FileContentInline;
use extensions_common::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Encoding marker for base64 inline content
pub const ENCODING_BASE64: &str = "b64";

// =============================================================================
// systemd units
// =============================================================================

/// One `Name=Value` line of a systemd unit, with its section
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitOption {
    /// Section the option belongs to (e.g. `Service`)
    pub section: String,
    /// Option name (e.g. `ExecStart`)
    pub name: String,
    /// Option value; continuation lines are kept as `\` + newline + line
    pub value: String,
}

impl UnitOption {
    /// Build an option
    pub fn new(section: &str, name: &str, value: &str) -> Self {
        Self {
            section: section.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Find the first option with the given section and name
pub fn unit_option_with_section_and_name<'a>(
    opts: &'a [UnitOption],
    section: &str,
    name: &str,
) -> Option<&'a UnitOption> {
    opts.iter().find(|o| o.section == section && o.name == name)
}

/// Converts unit file content to options and back
pub trait UnitSerializer: Send + Sync {
    /// Parse unit file content
    fn deserialize(&self, content: &str) -> Result<Vec<UnitOption>>;
    /// Render options as unit file content
    fn serialize(&self, opts: &[UnitOption]) -> Result<String>;
}

/// systemd unit file format
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemdUnitSerializer;

impl UnitSerializer for SystemdUnitSerializer {
    fn deserialize(&self, content: &str) -> Result<Vec<UnitOption>> {
        let mut opts: Vec<UnitOption> = Vec::new();
        let mut section: Option<String> = None;
        let mut continuing = false;

        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.trim_end();
            if continuing && line.trim_start().is_empty() {
                continuing = false;
                continue;
            }
            if continuing {
                // Only reachable after an option was pushed
                if let Some(last) = opts.last_mut() {
                    last.value.push('\n');
                    last.value.push_str(line);
                }
                continuing = line.ends_with('\\');
                continue;
            }

            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                section = Some(name.to_string());
                continue;
            }

            let current = section.as_deref().ok_or_else(|| {
                Error::decode(
                    "unit",
                    "unit content",
                    format!("line {}: option outside of a section", lineno + 1),
                )
            })?;
            let (name, value) = trimmed.split_once('=').ok_or_else(|| {
                Error::decode(
                    "unit",
                    "unit content",
                    format!("line {}: expected Name=Value", lineno + 1),
                )
            })?;
            let value = value.trim();
            continuing = value.ends_with('\\');
            opts.push(UnitOption::new(current, name.trim(), value));
        }
        Ok(opts)
    }

    fn serialize(&self, opts: &[UnitOption]) -> Result<String> {
        let mut out = String::new();
        let mut current: Option<&str> = None;
        for opt in opts {
            if current != Some(opt.section.as_str()) {
                if current.is_some() {
                    out.push('\n');
                }
                out.push('[');
                out.push_str(&opt.section);
                out.push_str("]\n");
                current = Some(opt.section.as_str());
            }
            out.push_str(&opt.name);
            out.push('=');
            out.push_str(&opt.value);
            out.push('\n');
            // A dangling continuation must not swallow the next option
            if opt.value.ends_with('\\') {
                out.push('\n');
            }
        }
        Ok(out)
    }
}

// =============================================================================
// Inline file content
// =============================================================================

/// Converts inline file content to bytes and back
pub trait FileContentInlineCodec: Send + Sync {
    /// Decode inline content according to its encoding
    fn decode(&self, inline: &FileContentInline) -> Result<Vec<u8>>;
    /// Encode bytes with the given encoding (`""` or `b64`)
    fn encode(&self, data: &[u8], encoding: &str) -> Result<FileContentInline>;
}

/// Plain and base64 inline content
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultFileContentInlineCodec;

impl FileContentInlineCodec for DefaultFileContentInlineCodec {
    fn decode(&self, inline: &FileContentInline) -> Result<Vec<u8>> {
        match inline.encoding.as_str() {
            "" => Ok(inline.data.clone().into_bytes()),
            ENCODING_BASE64 => STANDARD
                .decode(inline.data.trim())
                .map_err(|e| Error::decode("inline content", "file", e)),
            other => Err(Error::validation(format!(
                "unsupported file content encoding '{other}'"
            ))),
        }
    }

    fn encode(&self, data: &[u8], encoding: &str) -> Result<FileContentInline> {
        let data = match encoding {
            "" => String::from_utf8(data.to_vec())
                .map_err(|e| Error::encode("inline content", e))?,
            ENCODING_BASE64 => STANDARD.encode(data),
            other => {
                return Err(Error::encode(
                    "inline content",
                    format!("unsupported encoding '{other}'"),
                ))
            }
        };
        Ok(FileContentInline {
            encoding: encoding.to_string(),
            data,
        })
    }
}

// =============================================================================
// Kubelet configuration
// =============================================================================

/// Kubelet configuration file (`kubelet.config.k8s.io/v1beta1`)
///
/// Feature gates are typed; every other field is carried through untouched.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KubeletConfiguration {
    /// API version of the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Kind of the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Kubelet feature gates; an explicit `null` reads as no gates
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub feature_gates: BTreeMap<String, bool>,

    /// Remaining fields
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_yaml::Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, bool>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Converts the kubelet configuration file to its typed form and back
pub trait KubeletConfigCodec: Send + Sync {
    /// Decode inline kubelet configuration
    fn decode(&self, inline: &FileContentInline) -> Result<KubeletConfiguration>;
    /// Encode kubelet configuration with the given encoding
    fn encode(&self, config: &KubeletConfiguration, encoding: &str) -> Result<FileContentInline>;
}

/// YAML kubelet configuration on top of a [`FileContentInlineCodec`]
#[derive(Clone, Copy, Debug, Default)]
pub struct YamlKubeletConfigCodec<C = DefaultFileContentInlineCodec> {
    inline: C,
}

impl<C: FileContentInlineCodec> YamlKubeletConfigCodec<C> {
    /// Codec using `inline` for the file encoding
    pub fn new(inline: C) -> Self {
        Self { inline }
    }
}

impl<C: FileContentInlineCodec> KubeletConfigCodec for YamlKubeletConfigCodec<C> {
    fn decode(&self, inline: &FileContentInline) -> Result<KubeletConfiguration> {
        let data = self.inline.decode(inline)?;
        serde_yaml::from_slice(&data)
            .map_err(|e| Error::decode("kubelet configuration", "file", e))
    }

    fn encode(&self, config: &KubeletConfiguration, encoding: &str) -> Result<FileContentInline> {
        let data = serde_yaml::to_string(config)
            .map_err(|e| Error::encode("kubelet configuration", e))?;
        self.inline.encode(data.as_bytes(), encoding)
    }
}
