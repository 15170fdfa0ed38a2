//! Extension resources (`extensions.gardener.cloud/v1alpha1`)
//!
//! These are the objects the provider extensions act on: the cluster-scoped
//! `Cluster` bundle, `OperatingSystemConfig`s mutated by the webhook, and the
//! `ControlPlane`/`Infrastructure` resources values are computed from.

use k8s_openapi::api::core::v1::SecretReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Cluster
// =============================================================================

/// Raw CloudProfile, Seed and Shoot of one shoot, keyed by its seed namespace
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Cluster",
    root = "ClusterResource",
    plural = "clusters",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Encoded CloudProfile
    #[serde(default)]
    pub cloud_profile: serde_json::Value,

    /// Encoded Seed
    #[serde(default)]
    pub seed: serde_json::Value,

    /// Encoded Shoot
    #[serde(default)]
    pub shoot: serde_json::Value,
}

// =============================================================================
// OperatingSystemConfig
// =============================================================================

/// Purpose of an OperatingSystemConfig
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystemConfigPurpose {
    /// Initial provisioning of a machine
    #[default]
    Provision,
    /// Ongoing reconciliation of a machine's configuration
    Reconcile,
}

/// Systemd units and files to place on a shoot's worker machines
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "OperatingSystemConfig",
    plural = "operatingsystemconfigs",
    shortname = "osc",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct OperatingSystemConfigSpec {
    /// Operating system type
    #[serde(rename = "type", default)]
    pub type_: String,

    /// Whether the config provisions or reconciles a machine
    #[serde(default)]
    pub purpose: OperatingSystemConfigPurpose,

    /// Systemd units, keyed by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<Unit>,

    /// Files, keyed by path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,

    /// Path the rendered cloud-config is reloaded from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload_config_file_path: Option<String>,

    /// Provider-specific configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,
}

/// A systemd unit
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Unit name (e.g. `kubelet.service`)
    pub name: String,

    /// Systemd command to run on the unit (start, restart, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Whether the unit is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,

    /// Unit file content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Drop-in files for the unit
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drop_ins: Vec<DropIn>,
}

/// A drop-in file for a systemd unit
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct DropIn {
    /// Drop-in file name
    pub name: String,
    /// Drop-in content
    pub content: String,
}

/// A file placed on the machine
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Absolute path of the file
    pub path: String,

    /// Octal file mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<i32>,

    /// Where the content comes from
    #[serde(default)]
    pub content: FileContent,
}

/// Content source of a file
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    /// Content taken from a secret key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<FileContentSecretRef>,

    /// Content inlined in the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<FileContentInline>,
}

/// Reference to a secret key holding file content
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileContentSecretRef {
    /// Secret name
    pub name: String,
    /// Key within the secret's data
    pub data_key: String,
}

/// Inline file content
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct FileContentInline {
    /// Encoding of `data`; empty for plain text, `b64` for base64
    #[serde(default)]
    pub encoding: String,
    /// The (possibly encoded) content
    pub data: String,
}

// =============================================================================
// ControlPlane
// =============================================================================

/// Provider control plane of a shoot
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "ControlPlane",
    plural = "controlplanes",
    shortname = "cp",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneSpec {
    /// Provider type
    #[serde(rename = "type", default)]
    pub type_: String,

    /// Region of the shoot
    #[serde(default)]
    pub region: String,

    /// Secret holding the infrastructure credentials
    #[serde(default)]
    pub secret_ref: SecretReference,

    /// Provider-specific control plane configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,

    /// Provider status of the shoot's Infrastructure resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_provider_status: Option<serde_json::Value>,
}

// =============================================================================
// Infrastructure
// =============================================================================

/// Provider infrastructure of a shoot
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Infrastructure",
    plural = "infrastructures",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSpec {
    /// Provider type
    #[serde(rename = "type", default)]
    pub type_: String,

    /// Region of the shoot
    #[serde(default)]
    pub region: String,

    /// Secret holding the infrastructure credentials
    #[serde(default)]
    pub secret_ref: SecretReference,

    /// Public SSH key installed on the worker machines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,

    /// Provider-specific infrastructure configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,
}
