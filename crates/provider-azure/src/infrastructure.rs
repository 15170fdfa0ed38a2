//! Terraform variables and state of the Azure infrastructure

use extensions_common::apis::{decode_provider_config, Infrastructure};
use extensions_common::terraform::{output_variable, Outputs};
use extensions_common::values::Values;
use extensions_common::{Cluster, Error, ObjectKey, Result};
use serde_json::{json, Value};

use crate::apis::{
    find_domain_count, AvailabilitySet, CloudProfileConfig, InfrastructureConfig,
    InfrastructureStatus, NetworkStatus, ResourceGroup, RouteTable, SecurityGroup, Subnet,
    VNetStatus, API_VERSION, PURPOSE_NODES,
};
use crate::ClientAuth;

/// Output key of the resource group name
pub const TERRAFORMER_OUTPUT_KEY_RESOURCE_GROUP_NAME: &str = "resourceGroupName";
/// Output key of the virtual network name
pub const TERRAFORMER_OUTPUT_KEY_VNET_NAME: &str = "vnetName";
/// Output key of the worker subnet name
pub const TERRAFORMER_OUTPUT_KEY_SUBNET_NAME: &str = "subnetName";
/// Output key of the availability set ID
pub const TERRAFORMER_OUTPUT_KEY_AVAILABILITY_SET_ID: &str = "availabilitySetID";
/// Output key of the availability set name
pub const TERRAFORMER_OUTPUT_KEY_AVAILABILITY_SET_NAME: &str = "availabilitySetName";
/// Output key of the route table name
pub const TERRAFORMER_OUTPUT_KEY_ROUTE_TABLE_NAME: &str = "routeTableName";
/// Output key of the security group name
pub const TERRAFORMER_OUTPUT_KEY_SECURITY_GROUP_NAME: &str = "securityGroupName";

/// Decode the provider configuration of `infra`
pub fn infrastructure_config(infra: &Infrastructure) -> Result<InfrastructureConfig> {
    decode_provider_config(
        infra.spec.provider_config.as_ref(),
        "providerConfig",
        format!("infrastructure '{}'", ObjectKey::from_meta(&infra.metadata)),
    )
}

/// Variables of the Terraform configuration that creates the shoot network
///
/// Non-zoned shoots get an availability set sized by the region's fault and
/// update domain counts from the cloud profile.
pub fn compute_terraformer_chart_values(
    infra: &Infrastructure,
    client_auth: &ClientAuth,
    config: &InfrastructureConfig,
    cluster: &Cluster,
) -> Result<Values> {
    let infra_key = ObjectKey::from_meta(&infra.metadata);
    let namespace = infra.metadata.namespace.clone().unwrap_or_default();
    let region = infra.spec.region.as_str();

    let mut azure = Values::new();
    azure.insert("subscriptionID".to_string(), json!(client_auth.subscription_id));
    azure.insert("tenantID".to_string(), json!(client_auth.tenant_id));
    azure.insert("region".to_string(), json!(region));

    let mut output_keys = Values::new();
    for (name, key) in [
        ("resourceGroupName", TERRAFORMER_OUTPUT_KEY_RESOURCE_GROUP_NAME),
        ("vnetName", TERRAFORMER_OUTPUT_KEY_VNET_NAME),
        ("subnetName", TERRAFORMER_OUTPUT_KEY_SUBNET_NAME),
        ("routeTableName", TERRAFORMER_OUTPUT_KEY_ROUTE_TABLE_NAME),
        ("securityGroupName", TERRAFORMER_OUTPUT_KEY_SECURITY_GROUP_NAME),
    ] {
        output_keys.insert(name.to_string(), json!(key));
    }

    let create_availability_set = !config.zoned;
    if create_availability_set {
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
        let count_update_domains =
            find_domain_count(&cloud_profile_config.count_update_domains, region).ok_or_else(
                || Error::validation(format!("could not determine update domain count for region {region}")),
            )?;
        let count_fault_domains =
            find_domain_count(&cloud_profile_config.count_fault_domains, region).ok_or_else(
                || Error::validation(format!("could not determine fault domain count for region {region}")),
            )?;
        azure.insert("countUpdateDomains".to_string(), json!(count_update_domains));
        azure.insert("countFaultDomains".to_string(), json!(count_fault_domains));
        output_keys.insert(
            "availabilitySetID".to_string(),
            json!(TERRAFORMER_OUTPUT_KEY_AVAILABILITY_SET_ID),
        );
        output_keys.insert(
            "availabilitySetName".to_string(),
            json!(TERRAFORMER_OUTPUT_KEY_AVAILABILITY_SET_NAME),
        );
    }

    let (create_resource_group, resource_group_name) = match &config.resource_group {
        Some(rg) => (false, rg.name.clone()),
        None => (true, namespace.clone()),
    };

    let vnet = &config.networks.vnet;
    let create_vnet = vnet.name.is_none();
    let vnet_values = json!({
        "name": vnet.name.clone().unwrap_or_else(|| namespace.clone()),
        "cidr": vnet.cidr.clone().unwrap_or_else(|| config.networks.workers.clone()),
    });

    let mut values = Values::new();
    values.insert("azure".to_string(), Value::Object(azure));
    values.insert(
        "create".to_string(),
        json!({
            "resourceGroup": create_resource_group,
            "vnet": create_vnet,
            "availabilitySet": create_availability_set,
        }),
    );
    values.insert(
        "resourceGroup".to_string(),
        json!({
            "name": resource_group_name,
            "vnet": vnet_values,
            "subnet": {
                "serviceEndpoints": config.networks.service_endpoints,
            },
        }),
    );
    values.insert("clusterName".to_string(), json!(namespace));
    values.insert(
        "networks".to_string(),
        json!({"worker": config.networks.workers}),
    );
    values.insert("outputKeys".to_string(), Value::Object(output_keys));
    Ok(values)
}

/// Outputs of the applied Azure Terraform configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TerraformState {
    /// Virtual network name
    pub vnet_name: String,
    /// Worker subnet name
    pub subnet_name: String,
    /// Route table name
    pub route_table_name: String,
    /// Availability set ID; empty for zoned shoots
    pub availability_set_id: String,
    /// Availability set name; empty for zoned shoots
    pub availability_set_name: String,
    /// Security group name
    pub security_group_name: String,
    /// Resource group name
    pub resource_group_name: String,
}

impl TerraformState {
    /// Read the state from Terraform outputs
    ///
    /// Availability set outputs only exist for non-zoned shoots.
    pub fn from_outputs(outputs: &Outputs, zoned: bool) -> Result<Self> {
        let mut state = Self {
            vnet_name: output_variable(outputs, TERRAFORMER_OUTPUT_KEY_VNET_NAME)?,
            subnet_name: output_variable(outputs, TERRAFORMER_OUTPUT_KEY_SUBNET_NAME)?,
            route_table_name: output_variable(outputs, TERRAFORMER_OUTPUT_KEY_ROUTE_TABLE_NAME)?,
            security_group_name: output_variable(
                outputs,
                TERRAFORMER_OUTPUT_KEY_SECURITY_GROUP_NAME,
            )?,
            resource_group_name: output_variable(
                outputs,
                TERRAFORMER_OUTPUT_KEY_RESOURCE_GROUP_NAME,
            )?,
            ..Default::default()
        };
        if !zoned {
            state.availability_set_id =
                output_variable(outputs, TERRAFORMER_OUTPUT_KEY_AVAILABILITY_SET_ID)?;
            state.availability_set_name =
                output_variable(outputs, TERRAFORMER_OUTPUT_KEY_AVAILABILITY_SET_NAME)?;
        }
        Ok(state)
    }
}

/// Infrastructure status for the given Terraform state
///
/// A state without availability set ID belongs to a zoned shoot.
pub fn status_from_terraform_state(state: &TerraformState) -> InfrastructureStatus {
    let zoned = state.availability_set_id.is_empty();
    let availability_sets = if zoned {
        Vec::new()
    } else {
        vec![AvailabilitySet {
            name: state.availability_set_name.clone(),
            id: state.availability_set_id.clone(),
            purpose: PURPOSE_NODES.to_string(),
        }]
    };

    InfrastructureStatus {
        api_version: API_VERSION.to_string(),
        kind: "InfrastructureStatus".to_string(),
        resource_group: ResourceGroup {
            name: state.resource_group_name.clone(),
        },
        networks: NetworkStatus {
            vnet: VNetStatus {
                name: state.vnet_name.clone(),
            },
            subnets: vec![Subnet {
                name: state.subnet_name.clone(),
                purpose: PURPOSE_NODES.to_string(),
            }],
        },
        availability_sets,
        route_tables: vec![RouteTable {
            name: state.route_table_name.clone(),
            purpose: PURPOSE_NODES.to_string(),
        }],
        security_groups: vec![SecurityGroup {
            name: state.security_group_name.clone(),
            purpose: PURPOSE_NODES.to_string(),
        }],
        zoned,
    }
}
