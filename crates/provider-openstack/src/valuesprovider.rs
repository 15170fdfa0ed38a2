//! Chart values for the OpenStack control plane

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use extensions_common::apis::{decode_provider_config, ControlPlane};
use extensions_common::values::{set_string_value, Chart, Values, ValuesProvider};
use extensions_common::{
    Cluster, Error, ObjectKey, RequestContext, Result, SeedClient, SECRET_NAME_CLOUD_PROVIDER,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::apis::{
    find_subnet_by_purpose, CloudProfileConfig, ControlPlaneConfig, InfrastructureStatus,
    LoadBalancerClass, DEFAULT_LOAD_BALANCER_CLASS, PRIVATE_LOAD_BALANCER_CLASS, PURPOSE_NODES,
};
use crate::credentials::get_credentials;
use crate::{
    CLOUD_CONTROLLER_IMAGE_NAME, CLOUD_PROVIDER_CONFIG_CLOUD_CONTROLLER_MANAGER_NAME,
    CLOUD_PROVIDER_CONFIG_KUBE_CONTROLLER_MANAGER_NAME,
};

const CLOUD_CONTROLLER_MANAGER_DEPLOYMENT_NAME: &str = "cloud-controller-manager";
const CLOUD_CONTROLLER_MANAGER_SERVER_NAME: &str = "cloud-controller-manager-server";

/// Charts of the OpenStack control plane
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlPlaneCharts {
    /// Cloud provider configuration
    pub config: Chart,
    /// Cloud controller manager in the seed
    pub control_plane: Chart,
    /// RBAC for the cloud controller manager in the shoot
    pub control_plane_shoot: Chart,
    /// Storage classes in the shoot
    pub storage_classes: Chart,
}

/// Descriptors of the charts under `charts_path`
pub fn control_plane_charts(charts_path: &Path) -> ControlPlaneCharts {
    ControlPlaneCharts {
        config: Chart::new(charts_path, "cloud-provider-config")
            .with_object("ConfigMap", CLOUD_PROVIDER_CONFIG_CLOUD_CONTROLLER_MANAGER_NAME)
            .with_object("ConfigMap", CLOUD_PROVIDER_CONFIG_KUBE_CONTROLLER_MANAGER_NAME),
        control_plane: Chart::new(charts_path, "cloud-controller-manager")
            .with_images(&[CLOUD_CONTROLLER_IMAGE_NAME])
            .with_object("Service", CLOUD_CONTROLLER_MANAGER_DEPLOYMENT_NAME)
            .with_object("Deployment", CLOUD_CONTROLLER_MANAGER_DEPLOYMENT_NAME)
            .with_object("ConfigMap", "cloud-controller-manager-monitoring-config"),
        control_plane_shoot: Chart::new(charts_path, "cloud-controller-manager-shoot")
            .with_object("ClusterRole", "system:controller:cloud-node-controller")
            .with_object("ClusterRoleBinding", "system:controller:cloud-node-controller"),
        storage_classes: Chart::new(charts_path, "shoot-storageclasses"),
    }
}

/// Values provider for the OpenStack control plane charts
pub struct OpenStackValuesProvider {
    client: Arc<dyn SeedClient>,
}

impl OpenStackValuesProvider {
    /// Create a values provider reading secrets through `client`
    pub fn new(client: Arc<dyn SeedClient>) -> Self {
        Self { client }
    }
}

fn control_plane_name(cp: &ControlPlane) -> String {
    format!("controlplane '{}'", ObjectKey::from_meta(&cp.metadata))
}

fn control_plane_config(cp: &ControlPlane) -> Result<ControlPlaneConfig> {
    decode_provider_config(
        cp.spec.provider_config.as_ref(),
        "providerConfig",
        control_plane_name(cp),
    )
}

fn cloud_profile_config(cp: &ControlPlane, cluster: &Cluster) -> Result<Option<CloudProfileConfig>> {
    cluster
        .cloud_profile_provider_config()
        .map(|raw| {
            decode_provider_config(
                Some(raw),
                "providerConfig",
                format!("cloudProfile for '{}'", ObjectKey::from_meta(&cp.metadata)),
            )
        })
        .transpose()
}

/// Last class named `name`
fn load_balancer_class<'a>(
    classes: &'a [LoadBalancerClass],
    name: &str,
) -> Option<&'a LoadBalancerClass> {
    classes.iter().rev().find(|c| c.name == name)
}

fn is_empty(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn config_chart_values(
    mut cp_config: ControlPlaneConfig,
    infra_status: &InfrastructureStatus,
    cloud_profile_config: Option<&CloudProfileConfig>,
    cp: &ControlPlane,
    credentials: &crate::Credentials,
    cluster: &Cluster,
) -> Result<Values> {
    let subnet = find_subnet_by_purpose(&infra_status.networks.subnets, PURPOSE_NODES).map_err(|e| {
        Error::validation(format!(
            "could not determine subnet from infrastructureProviderStatus of {}: {e}",
            control_plane_name(cp)
        ))
    })?;
    let floating_pool = &infra_status.networks.floating_pool;

    let mut values = Values::new();
    values.insert("kubernetesVersion".to_string(), json!(cluster.kubernetes_version()));
    values.insert("domainName".to_string(), json!(credentials.domain_name));
    values.insert("tenantName".to_string(), json!(credentials.tenant_name));
    values.insert("username".to_string(), json!(credentials.username));
    values.insert("password".to_string(), json!(credentials.password));
    values.insert("lbProvider".to_string(), json!(cp_config.load_balancer_provider));
    values.insert("floatingNetworkID".to_string(), json!(floating_pool.id));
    values.insert("subnetID".to_string(), json!(subnet.id));
    values.insert(
        "authUrl".to_string(),
        json!(cloud_profile_config.map_or("", |c| c.keystone_url.as_str())),
    );
    set_string_value(
        &mut values,
        "dhcpDomain",
        cloud_profile_config.and_then(|c| c.dhcp_domain.as_deref()),
    );
    set_string_value(
        &mut values,
        "requestTimeout",
        cloud_profile_config.and_then(|c| c.request_timeout.as_deref()),
    );

    // Without explicit classes, use those of the shoot's floating pool
    if cp_config.load_balancer_classes.is_none() && cluster.shoot.is_some() {
        if let Some(pool) = cloud_profile_config.and_then(|c| {
            c.constraints
                .floating_pools
                .iter()
                .find(|p| p.name == floating_pool.name)
        }) {
            cp_config.load_balancer_classes = Some(pool.load_balancer_classes.clone());
        }
    }
    let classes = cp_config.load_balancer_classes.unwrap_or_default();

    if let Some(class) = load_balancer_class(&classes, DEFAULT_LOAD_BALANCER_CLASS) {
        set_string_value(&mut values, "floatingNetworkID", class.floating_network_id.as_deref());
        set_string_value(&mut values, "floatingSubnetID", class.floating_subnet_id.as_deref());
        set_string_value(&mut values, "subnetID", class.subnet_id.as_deref());
    }
    if let Some(class) = load_balancer_class(&classes, PRIVATE_LOAD_BALANCER_CLASS) {
        set_string_value(&mut values, "subnetID", class.subnet_id.as_deref());
    }

    let floating_classes: Vec<Value> = classes
        .iter()
        .map(|class| {
            let mut floating_class = Values::new();
            floating_class.insert("name".to_string(), json!(class.name));
            if !is_empty(&class.floating_subnet_id) && is_empty(&class.floating_network_id) {
                floating_class.insert("floatingNetworkID".to_string(), json!(floating_pool.id));
            } else {
                set_string_value(
                    &mut floating_class,
                    "floatingNetworkID",
                    class.floating_network_id.as_deref(),
                );
            }
            set_string_value(
                &mut floating_class,
                "floatingSubnetID",
                class.floating_subnet_id.as_deref(),
            );
            set_string_value(&mut floating_class, "subnetID", class.subnet_id.as_deref());
            Value::Object(floating_class)
        })
        .collect();
    if !floating_classes.is_empty() {
        values.insert("floatingClasses".to_string(), Value::Array(floating_classes));
    }

    Ok(values)
}

fn ccm_chart_values(
    cp_config: &ControlPlaneConfig,
    cp: &ControlPlane,
    cluster: &Cluster,
    checksums: &BTreeMap<String, String>,
    scaled_down: bool,
) -> Values {
    let checksum = |name: &str| checksums.get(name).cloned().unwrap_or_default();

    let mut values = Values::new();
    values.insert(
        "replicas".to_string(),
        json!(cluster.control_plane_replicas(scaled_down, 1)),
    );
    values.insert("clusterName".to_string(), json!(cp.metadata.namespace));
    values.insert("kubernetesVersion".to_string(), json!(cluster.kubernetes_version()));
    set_string_value(&mut values, "podNetwork", cluster.pod_network());
    values.insert(
        "podAnnotations".to_string(),
        json!({
            "checksum/secret-cloud-controller-manager": checksum(CLOUD_CONTROLLER_MANAGER_DEPLOYMENT_NAME),
            "checksum/secret-cloud-controller-manager-server": checksum(CLOUD_CONTROLLER_MANAGER_SERVER_NAME),
            "checksum/secret-cloudprovider": checksum(SECRET_NAME_CLOUD_PROVIDER),
            "checksum/configmap-cloud-provider-config-cloud-controller-manager":
                checksum(CLOUD_PROVIDER_CONFIG_CLOUD_CONTROLLER_MANAGER_NAME),
        }),
    );
    if let Some(ccm) = &cp_config.cloud_controller_manager {
        values.insert("featureGates".to_string(), json!(ccm.feature_gates));
    }
    values
}

#[async_trait]
impl ValuesProvider for OpenStackValuesProvider {
    async fn get_config_chart_values(
        &self,
        ctx: &RequestContext,
        cp: &ControlPlane,
        cluster: &Cluster,
    ) -> Result<Option<Values>> {
        let cp_config = control_plane_config(cp)?;
        let infra_status: InfrastructureStatus = decode_provider_config(
            cp.spec.infrastructure_provider_status.as_ref(),
            "infrastructureProviderStatus",
            control_plane_name(cp),
        )?;
        let cloud_profile_config = cloud_profile_config(cp, cluster)?;

        let namespace = cp.metadata.namespace.as_deref().unwrap_or_default();
        let credentials =
            get_credentials(ctx, self.client.as_ref(), &cp.spec.secret_ref, namespace).await?;
        debug!(
            namespace = %namespace,
            tenant = %credentials.tenant_name,
            "Computing cloud provider config values"
        );

        config_chart_values(
            cp_config,
            &infra_status,
            cloud_profile_config.as_ref(),
            cp,
            &credentials,
            cluster,
        )
        .map(Some)
    }

    async fn get_control_plane_chart_values(
        &self,
        _ctx: &RequestContext,
        cp: &ControlPlane,
        cluster: &Cluster,
        checksums: &BTreeMap<String, String>,
        scaled_down: bool,
    ) -> Result<Option<Values>> {
        let cp_config = control_plane_config(cp)?;
        Ok(Some(ccm_chart_values(
            &cp_config,
            cp,
            cluster,
            checksums,
            scaled_down,
        )))
    }

    async fn get_storage_classes_chart_values(
        &self,
        _ctx: &RequestContext,
        cp: &ControlPlane,
        _cluster: &Cluster,
    ) -> Result<Option<Values>> {
        let cp_config = control_plane_config(cp)?;
        let mut values = Values::new();
        values.insert("availability".to_string(), json!(cp_config.zone));
        Ok(Some(values))
    }
}
