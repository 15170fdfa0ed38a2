//! Gardener core resources as embedded in the `Cluster` extension resource
//!
//! Only the fields the extensions read are modelled; unknown fields are
//! ignored on decode.

use k8s_openapi::api::core::v1::SecretReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Cloud profile of the shoot's infrastructure
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfile {
    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Cloud profile specification
    #[serde(default)]
    pub spec: CloudProfileSpec,
}

/// Cloud profile specification
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileSpec {
    /// Provider type (aws, gcp, azure, openstack, packet)
    #[serde(rename = "type", default)]
    pub type_: String,

    /// Provider-specific cloud profile configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,

    /// Regions offered by the profile
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<Region>,
}

/// A region offered by a cloud profile
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// Region name
    pub name: String,

    /// Availability zones of the region
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<AvailabilityZone>,
}

/// An availability zone within a region
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AvailabilityZone {
    /// Zone name
    pub name: String,
}

/// Seed cluster hosting the shoot's control plane
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Seed specification
    #[serde(default)]
    pub spec: SeedSpec,
}

/// Seed specification
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeedSpec {
    /// Infrastructure the seed runs on
    #[serde(default)]
    pub provider: SeedProvider,

    /// Backup profile; absent when etcd backups are disabled for the seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<SeedBackup>,
}

/// Infrastructure the seed runs on
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeedProvider {
    /// Provider type
    #[serde(rename = "type", default)]
    pub type_: String,

    /// Region of the seed
    #[serde(default)]
    pub region: String,
}

/// Backup profile of a seed
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeedBackup {
    /// Provider storing the backups
    #[serde(default)]
    pub provider: String,

    /// Region of the backup bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Credentials for the backup infrastructure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretReference>,
}

/// Tenant cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Shoot {
    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Shoot specification
    #[serde(default)]
    pub spec: ShootSpec,

    /// Shoot status
    #[serde(default)]
    pub status: ShootStatus,
}

/// Shoot specification
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootSpec {
    /// Kubernetes settings
    #[serde(default)]
    pub kubernetes: Kubernetes,

    /// Network ranges of the shoot
    #[serde(default)]
    pub networking: Networking,

    /// Maintenance settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<Maintenance>,

    /// Hibernation settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hibernation: Option<Hibernation>,

    /// Region the shoot runs in
    #[serde(default)]
    pub region: String,
}

/// Kubernetes settings of a shoot
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Kubernetes {
    /// Semantic Kubernetes version (e.g. `1.13.4`)
    #[serde(default)]
    pub version: String,
}

/// Network ranges of a shoot
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    /// Network plugin type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Pod CIDR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<String>,

    /// Node CIDR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<String>,

    /// Service CIDR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
}

/// Maintenance settings of a shoot
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Maintenance {
    /// Daily window in which maintenance operations run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<MaintenanceTimeWindow>,
}

/// Daily maintenance window, formatted `HHMMSS+ZZZZ`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct MaintenanceTimeWindow {
    /// Window start
    pub begin: String,
    /// Window end
    pub end: String,
}

/// Hibernation settings of a shoot
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Hibernation {
    /// Whether the shoot is hibernated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Shoot status
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ShootStatus {
    /// Technical ID of the shoot, which is also its seed namespace
    #[serde(rename = "technicalID", default)]
    pub technical_id: String,

    /// Unique ID of the shoot
    #[serde(default)]
    pub uid: String,
}
