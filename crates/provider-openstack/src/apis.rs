//! OpenStack provider configuration and status types
//!
//! These arrive as raw JSON inside `ControlPlane`, `Infrastructure` and
//! `CloudProfile` resources (`openstack.provider.extensions.gardener.cloud`).

use std::collections::BTreeMap;

use extensions_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// API version of the provider types
pub const API_VERSION: &str = "openstack.provider.extensions.gardener.cloud/v1alpha1";

/// Purpose of the resources used by the worker nodes
pub const PURPOSE_NODES: &str = "nodes";

/// Name of the default load balancer class
pub const DEFAULT_LOAD_BALANCER_CLASS: &str = "default";

/// Name of the private load balancer class
pub const PRIVATE_LOAD_BALANCER_CLASS: &str = "private";

// =============================================================================
// ControlPlaneConfig
// =============================================================================

/// Provider configuration of an OpenStack `ControlPlane`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneConfig {
    /// Octavia or neutron load balancer provider
    #[serde(default)]
    pub load_balancer_provider: String,

    /// Availability zone of the shoot's volumes
    #[serde(default)]
    pub zone: String,

    /// Load balancer classes; falls back to the floating pool's classes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_classes: Option<Vec<LoadBalancerClass>>,

    /// Cloud controller manager settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_controller_manager: Option<CloudControllerManagerConfig>,
}

/// A named set of load balancer network settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoadBalancerClass {
    /// Class name
    pub name: String,

    /// Subnet of the floating IPs
    #[serde(rename = "floatingSubnetID", default, skip_serializing_if = "Option::is_none")]
    pub floating_subnet_id: Option<String>,

    /// Network of the floating IPs
    #[serde(rename = "floatingNetworkID", default, skip_serializing_if = "Option::is_none")]
    pub floating_network_id: Option<String>,

    /// Subnet of the load balancer
    #[serde(rename = "subnetID", default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
}

/// Cloud controller manager settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudControllerManagerConfig {
    /// Feature gates of the cloud controller manager
    #[serde(default)]
    pub feature_gates: BTreeMap<String, bool>,
}

// =============================================================================
// CloudProfileConfig
// =============================================================================

/// Provider configuration of an OpenStack `CloudProfile`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileConfig {
    /// Keystone endpoint
    #[serde(rename = "keystoneURL", default)]
    pub keystone_url: String,

    /// DNS servers of the shoot networks
    #[serde(default)]
    pub dns_servers: Vec<String>,

    /// DHCP domain handed to the cloud provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp_domain: Option<String>,

    /// Request timeout of the cloud provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,

    /// Constraints for shoots of this profile
    #[serde(default)]
    pub constraints: Constraints,
}

/// Constraints of an OpenStack cloud profile
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    /// Floating pools shoots may use
    #[serde(default)]
    pub floating_pools: Vec<FloatingPool>,
}

/// A floating pool offered by the cloud profile
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FloatingPool {
    /// Pool name
    pub name: String,

    /// Load balancer classes available with this pool
    #[serde(default)]
    pub load_balancer_classes: Vec<LoadBalancerClass>,
}

// =============================================================================
// InfrastructureConfig / InfrastructureStatus
// =============================================================================

/// Provider configuration of an OpenStack `Infrastructure`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureConfig {
    /// Floating pool of the shoot
    #[serde(default)]
    pub floating_pool_name: String,

    /// Network layout
    #[serde(default)]
    pub networks: Networks,
}

/// Network layout of the shoot
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Networks {
    /// Existing router to use; a new one is created otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<Router>,

    /// CIDR of the worker network
    #[serde(default)]
    pub worker: String,
}

/// Reference to an existing router
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Router {
    /// Router ID
    pub id: String,
}

/// Provider status of an OpenStack `Infrastructure`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    /// Always [`API_VERSION`] when written by the extension
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    /// Always `InfrastructureStatus` when written by the extension
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Created networks
    #[serde(default)]
    pub networks: NetworkStatus,

    /// Created security groups
    #[serde(default)]
    pub security_groups: Vec<SecurityGroup>,

    /// Node settings
    #[serde(default)]
    pub node: NodeStatus,
}

/// Networks created for the shoot
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    /// Network ID
    #[serde(default)]
    pub id: String,

    /// Router of the network
    #[serde(default)]
    pub router: RouterStatus,

    /// Floating pool of the network
    #[serde(default)]
    pub floating_pool: FloatingPoolStatus,

    /// Subnets of the network
    #[serde(default)]
    pub subnets: Vec<Subnet>,
}

/// Router of the shoot network
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RouterStatus {
    /// Router ID
    #[serde(default)]
    pub id: String,
}

/// Floating pool of the shoot network
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct FloatingPoolStatus {
    /// Floating network ID
    #[serde(default)]
    pub id: String,

    /// Floating pool name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// A subnet with a purpose
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Subnet {
    /// What the subnet is used for
    pub purpose: String,

    /// Subnet ID
    pub id: String,
}

/// A security group with a purpose
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SecurityGroup {
    /// What the security group is used for
    pub purpose: String,

    /// Security group ID
    pub id: String,

    /// Security group name
    pub name: String,
}

/// Settings of the worker nodes
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    /// SSH key pair name
    #[serde(default)]
    pub key_name: String,
}

/// First subnet with the given purpose
pub fn find_subnet_by_purpose<'a>(subnets: &'a [Subnet], purpose: &str) -> Result<&'a Subnet> {
    subnets
        .iter()
        .find(|s| s.purpose == purpose)
        .ok_or_else(|| Error::validation(format!("cannot find subnet with purpose {purpose:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_balancer_classes_use_upper_case_ids() {
        let config: ControlPlaneConfig = serde_json::from_value(json!({
            "loadBalancerProvider": "haproxy",
            "zone": "eu-1a",
            "loadBalancerClasses": [
                {"name": "default", "floatingSubnetID": "fs", "subnetID": "s"}
            ],
            "cloudControllerManager": {"featureGates": {"CustomResourceValidation": true}}
        }))
        .unwrap();

        let classes = config.load_balancer_classes.unwrap();
        assert_eq!(classes[0].floating_subnet_id.as_deref(), Some("fs"));
        assert_eq!(classes[0].floating_network_id, None);
        assert_eq!(classes[0].subnet_id.as_deref(), Some("s"));
        assert_eq!(
            config.cloud_controller_manager.unwrap().feature_gates["CustomResourceValidation"],
            true
        );
    }

    #[test]
    fn cloud_profile_config_decodes_keystone_url() {
        let config: CloudProfileConfig = serde_json::from_value(json!({
            "keystoneURL": "https://keystone",
            "dnsServers": ["a", "b"],
            "constraints": {"floatingPools": [{"name": "fip"}]}
        }))
        .unwrap();
        assert_eq!(config.keystone_url, "https://keystone");
        assert_eq!(config.dns_servers, ["a", "b"]);
        assert!(config.dhcp_domain.is_none());
        assert_eq!(config.constraints.floating_pools[0].name, "fip");
    }

    #[test]
    fn subnet_lookup_by_purpose() {
        let subnets = vec![
            Subnet {
                purpose: "public".to_string(),
                id: "1".to_string(),
            },
            Subnet {
                purpose: PURPOSE_NODES.to_string(),
                id: "2".to_string(),
            },
        ];
        assert_eq!(find_subnet_by_purpose(&subnets, PURPOSE_NODES).unwrap().id, "2");
        assert!(find_subnet_by_purpose(&subnets[..1], PURPOSE_NODES).is_err());
    }
}
