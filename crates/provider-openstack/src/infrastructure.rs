//! Terraform variables and state of the OpenStack infrastructure

use extensions_common::apis::{decode_provider_config, Infrastructure};
use extensions_common::terraform::{output_variable, Outputs};
use extensions_common::values::Values;
use extensions_common::{Cluster, Error, ObjectKey, Result};
use serde_json::json;

use crate::apis::{
    CloudProfileConfig, FloatingPoolStatus, InfrastructureConfig, InfrastructureStatus,
    NetworkStatus, NodeStatus, RouterStatus, SecurityGroup, Subnet, API_VERSION, PURPOSE_NODES,
};
use crate::Credentials;

/// Router ID Terraform computes when the router is created
pub const DEFAULT_ROUTER_ID: &str = "${openstack_networking_router_v2.router.id}";

/// Output key of the SSH key pair name
pub const TERRAFORM_OUTPUT_KEY_SSH_KEY_NAME: &str = "key_name";
/// Output key of the router ID
pub const TERRAFORM_OUTPUT_KEY_ROUTER_ID: &str = "router_id";
/// Output key of the network ID
pub const TERRAFORM_OUTPUT_KEY_NETWORK_ID: &str = "network_id";
/// Output key of the security group ID
pub const TERRAFORM_OUTPUT_KEY_SECURITY_GROUP_ID: &str = "security_group_id";
/// Output key of the security group name
pub const TERRAFORM_OUTPUT_KEY_SECURITY_GROUP_NAME: &str = "security_group_name";
/// Output key of the floating network ID
pub const TERRAFORM_OUTPUT_KEY_FLOATING_NETWORK_ID: &str = "floating_network_id";
/// Output key of the subnet ID
pub const TERRAFORM_OUTPUT_KEY_SUBNET_ID: &str = "subnet_id";

/// Decode the provider configuration of `infra`
pub fn infrastructure_config(infra: &Infrastructure) -> Result<InfrastructureConfig> {
    decode_provider_config(
        infra.spec.provider_config.as_ref(),
        "providerConfig",
        format!("infrastructure '{}'", ObjectKey::from_meta(&infra.metadata)),
    )
}

/// Variables of the Terraform configuration that creates the shoot network
pub fn compute_terraformer_chart_values(
    infra: &Infrastructure,
    credentials: &Credentials,
    config: &InfrastructureConfig,
    cluster: &Cluster,
) -> Result<Values> {
    let infra_key = ObjectKey::from_meta(&infra.metadata);
    let raw = cluster.cloud_profile_provider_config().ok_or_else(|| {
        Error::validation(format!(
            "cloud profile of infrastructure '{infra_key}' has no provider config"
        ))
    })?;
    let cloud_profile_config: CloudProfileConfig = decode_provider_config(
        Some(raw),
        "providerConfig",
        format!("cloudProfile for '{infra_key}'"),
    )?;

    let (create_router, router_id) = match &config.networks.router {
        Some(router) => (false, router.id.as_str()),
        None => (true, DEFAULT_ROUTER_ID),
    };

    let values = json!({
        "openstack": {
            "authURL": cloud_profile_config.keystone_url,
            "domainName": credentials.domain_name,
            "tenantName": credentials.tenant_name,
            "region": infra.spec.region,
            "floatingPoolName": config.floating_pool_name,
        },
        "create": {
            "router": create_router,
        },
        "dnsServers": cloud_profile_config.dns_servers,
        "sshPublicKey": infra.spec.ssh_public_key.as_deref().unwrap_or_default(),
        "router": {
            "id": router_id,
        },
        "clusterName": infra.metadata.namespace,
        "networks": {
            "worker": config.networks.worker,
        },
        "outputKeys": {
            "routerID": TERRAFORM_OUTPUT_KEY_ROUTER_ID,
            "networkID": TERRAFORM_OUTPUT_KEY_NETWORK_ID,
            "keyName": TERRAFORM_OUTPUT_KEY_SSH_KEY_NAME,
            "securityGroupID": TERRAFORM_OUTPUT_KEY_SECURITY_GROUP_ID,
            "securityGroupName": TERRAFORM_OUTPUT_KEY_SECURITY_GROUP_NAME,
            "floatingNetworkID": TERRAFORM_OUTPUT_KEY_FLOATING_NETWORK_ID,
            "subnetID": TERRAFORM_OUTPUT_KEY_SUBNET_ID,
        },
    });
    match values {
        serde_json::Value::Object(values) => Ok(values),
        _ => Err(Error::encode("terraform values", "not an object")),
    }
}

/// Outputs of the applied OpenStack Terraform configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TerraformState {
    /// SSH key pair name
    pub ssh_key_name: String,
    /// Router ID
    pub router_id: String,
    /// Network ID
    pub network_id: String,
    /// Subnet ID
    pub subnet_id: String,
    /// Floating network ID
    pub floating_network_id: String,
    /// Security group ID
    pub security_group_id: String,
    /// Security group name
    pub security_group_name: String,
}

impl TerraformState {
    /// Read the state from Terraform outputs
    pub fn from_outputs(outputs: &Outputs) -> Result<Self> {
        Ok(Self {
            ssh_key_name: output_variable(outputs, TERRAFORM_OUTPUT_KEY_SSH_KEY_NAME)?,
            router_id: output_variable(outputs, TERRAFORM_OUTPUT_KEY_ROUTER_ID)?,
            network_id: output_variable(outputs, TERRAFORM_OUTPUT_KEY_NETWORK_ID)?,
            subnet_id: output_variable(outputs, TERRAFORM_OUTPUT_KEY_SUBNET_ID)?,
            floating_network_id: output_variable(
                outputs,
                TERRAFORM_OUTPUT_KEY_FLOATING_NETWORK_ID,
            )?,
            security_group_id: output_variable(outputs, TERRAFORM_OUTPUT_KEY_SECURITY_GROUP_ID)?,
            security_group_name: output_variable(
                outputs,
                TERRAFORM_OUTPUT_KEY_SECURITY_GROUP_NAME,
            )?,
        })
    }
}

/// Infrastructure status for the given Terraform state
pub fn status_from_terraform_state(state: &TerraformState) -> InfrastructureStatus {
    InfrastructureStatus {
        api_version: API_VERSION.to_string(),
        kind: "InfrastructureStatus".to_string(),
        networks: NetworkStatus {
            id: state.network_id.clone(),
            router: RouterStatus {
                id: state.router_id.clone(),
            },
            floating_pool: FloatingPoolStatus {
                id: state.floating_network_id.clone(),
                ..Default::default()
            },
            subnets: vec![Subnet {
                purpose: PURPOSE_NODES.to_string(),
                id: state.subnet_id.clone(),
            }],
        },
        security_groups: vec![SecurityGroup {
            purpose: PURPOSE_NODES.to_string(),
            id: state.security_group_id.clone(),
            name: state.security_group_name.clone(),
        }],
        node: NodeStatus {
            key_name: state.ssh_key_name.clone(),
        },
    }
}
