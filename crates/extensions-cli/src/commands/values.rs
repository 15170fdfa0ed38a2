//! Compute the control plane chart values of a ControlPlane

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use extensions_common::apis::{ClusterResource, ControlPlane};
use extensions_common::imagevector::ImageVector;
use extensions_common::values::{NoopValuesProvider, Values, ValuesProvider};
use extensions_common::{Cluster, RequestContext, Result, SeedClient};
use serde::Serialize;
use tracing::info;

use crate::{ExtensionConfig, Provider};

/// Values arguments
#[derive(Args, Debug)]
pub struct ValuesArgs {
    /// ControlPlane manifest
    #[arg(long = "control-plane")]
    pub control_plane: PathBuf,

    /// Cluster manifest of the shoot
    #[arg(long = "cluster")]
    pub cluster: PathBuf,

    /// Checksum of a deployed secret or config map, as `name=checksum`
    #[arg(long = "checksum", value_parser = parse_checksum)]
    pub checksums: Vec<(String, String)>,

    /// Compute values for a control plane scaled down to zero
    #[arg(long)]
    pub scaled_down: bool,
}

fn parse_checksum(arg: &str) -> std::result::Result<(String, String), String> {
    let (name, checksum) = arg
        .split_once('=')
        .ok_or_else(|| format!("invalid checksum '{arg}': expected name=checksum"))?;
    if name.is_empty() {
        return Err(format!("invalid checksum '{arg}': empty name"));
    }
    Ok((name.to_string(), checksum.to_string()))
}

/// Values of every control plane chart; charts a provider ships no values for are absent
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartValues {
    /// Cloud provider config chart
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Values>,
    /// Control plane chart in the seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<Values>,
    /// Control plane chart in the shoot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_plane_shoot: Option<Values>,
    /// Storage classes chart in the shoot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_classes: Option<Values>,
}

/// The values provider of `provider`
pub fn build_values_provider(
    provider: Provider,
    client: Arc<dyn SeedClient>,
) -> Arc<dyn ValuesProvider> {
    match provider {
        Provider::Packet => Arc::new(provider_packet::PacketValuesProvider::new(client)),
        Provider::Openstack => Arc::new(provider_openstack::OpenStackValuesProvider::new(client)),
        Provider::Aws | Provider::Gcp | Provider::Azure => Arc::new(NoopValuesProvider),
    }
}

/// Ask `provider` for the values of every chart
pub async fn compute(
    provider: &dyn ValuesProvider,
    ctx: &RequestContext,
    cp: &ControlPlane,
    cluster: &Cluster,
    checksums: &BTreeMap<String, String>,
    scaled_down: bool,
) -> Result<ChartValues> {
    Ok(ChartValues {
        config: provider.get_config_chart_values(ctx, cp, cluster).await?,
        control_plane: provider
            .get_control_plane_chart_values(ctx, cp, cluster, checksums, scaled_down)
            .await?,
        control_plane_shoot: provider
            .get_control_plane_shoot_chart_values(ctx, cp, cluster)
            .await?,
        storage_classes: provider
            .get_storage_classes_chart_values(ctx, cp, cluster)
            .await?,
    })
}

/// Resolve the images of the OpenStack control plane chart into its values
fn inject_images(
    config: &ExtensionConfig,
    image_vector: &ImageVector,
    cluster: &Cluster,
    values: &mut ChartValues,
) -> Result<()> {
    if config.provider != Provider::Openstack {
        return Ok(());
    }
    let Some(control_plane) = values.control_plane.as_mut() else {
        return Ok(());
    };
    let charts = provider_openstack::control_plane_charts(&config.charts_path);
    charts
        .control_plane
        .inject_images(control_plane, image_vector, cluster.kubernetes_version())
}

/// Run the values command
pub async fn run(config: &ExtensionConfig, args: ValuesArgs) -> anyhow::Result<()> {
    let cp: ControlPlane = super::read_manifest(&args.control_plane).await?;
    let resource: ClusterResource = super::read_manifest(&args.cluster).await?;
    let cluster = Cluster::from_resource(&resource)?;
    let checksums: BTreeMap<String, String> = args.checksums.into_iter().collect();

    let provider = build_values_provider(config.provider, super::seed_client().await?);
    let mut values = compute(
        provider.as_ref(),
        &RequestContext::new(),
        &cp,
        &cluster,
        &checksums,
        args.scaled_down,
    )
    .await?;
    inject_images(config, &config.image_vector().await?, &cluster, &mut values)?;

    info!(
        namespace = ?cp.metadata.namespace,
        name = ?cp.metadata.name,
        provider = ?config.provider,
        "Computed control plane chart values"
    );
    print!("{}", serde_yaml::to_string(&values)?);
    Ok(())
}
