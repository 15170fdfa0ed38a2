//! Azure provider configuration and status types

use serde::{Deserialize, Serialize};

/// API version of the provider types
pub const API_VERSION: &str = "azure.provider.extensions.gardener.cloud/v1alpha1";

/// Purpose of the resources used by the worker nodes
pub const PURPOSE_NODES: &str = "nodes";

/// Provider configuration of an Azure `Infrastructure`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureConfig {
    /// Existing resource group to use; a new one is created otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<ResourceGroup>,

    /// Network layout
    #[serde(default)]
    pub networks: NetworkConfig,

    /// Whether the shoot spreads over availability zones
    #[serde(default)]
    pub zoned: bool,
}

/// Network layout of the shoot
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Virtual network of the shoot
    #[serde(default)]
    pub vnet: VNet,

    /// CIDR of the worker subnet
    #[serde(default)]
    pub workers: String,

    /// Service endpoints of the worker subnet
    #[serde(default)]
    pub service_endpoints: Vec<String>,
}

/// Virtual network: an existing one by name, or a new one with a CIDR
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct VNet {
    /// Name of an existing virtual network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// CIDR of the virtual network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
}

/// A resource group
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ResourceGroup {
    /// Resource group name
    pub name: String,
}

/// Provider configuration of an Azure `CloudProfile`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileConfig {
    /// Fault domain counts per region
    #[serde(default)]
    pub count_fault_domains: Vec<DomainCount>,

    /// Update domain counts per region
    #[serde(default)]
    pub count_update_domains: Vec<DomainCount>,
}

/// Number of domains in a region
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct DomainCount {
    /// Region name
    pub region: String,
    /// Domain count
    pub count: i32,
}

/// Count for `region`, if the profile lists one
pub fn find_domain_count(counts: &[DomainCount], region: &str) -> Option<i32> {
    counts.iter().find(|c| c.region == region).map(|c| c.count)
}

/// Provider status of an Azure `Infrastructure`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    /// Always [`API_VERSION`] when written by the extension
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    /// Always `InfrastructureStatus` when written by the extension
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Resource group of the shoot
    #[serde(default)]
    pub resource_group: ResourceGroup,

    /// Networks of the shoot
    #[serde(default)]
    pub networks: NetworkStatus,

    /// Availability sets; empty for zoned shoots
    #[serde(default)]
    pub availability_sets: Vec<AvailabilitySet>,

    /// Route tables
    #[serde(default)]
    pub route_tables: Vec<RouteTable>,

    /// Security groups
    #[serde(default)]
    pub security_groups: Vec<SecurityGroup>,

    /// Whether the shoot spreads over availability zones
    #[serde(default)]
    pub zoned: bool,
}

/// Networks of the shoot
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    /// Virtual network
    #[serde(default)]
    pub vnet: VNetStatus,

    /// Subnets
    #[serde(default)]
    pub subnets: Vec<Subnet>,
}

/// Virtual network of the shoot
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct VNetStatus {
    /// Name
    pub name: String,
}

/// A subnet with a purpose
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Subnet {
    /// Name
    pub name: String,
    /// What the subnet is used for
    pub purpose: String,
}

/// An availability set with a purpose
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AvailabilitySet {
    /// Name
    pub name: String,
    /// Resource ID
    pub id: String,
    /// What the availability set is used for
    pub purpose: String,
}

/// A route table with a purpose
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RouteTable {
    /// Name
    pub name: String,
    /// What the route table is used for
    pub purpose: String,
}

/// A security group with a purpose
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SecurityGroup {
    /// Name
    pub name: String,
    /// What the security group is used for
    pub purpose: String,
}
