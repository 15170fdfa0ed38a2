//! Terraform variables and status of an Infrastructure

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use extensions_common::apis::{ClusterResource, Infrastructure};
use extensions_common::terraform::Outputs;
use extensions_common::values::Values;
use extensions_common::{Cluster, RequestContext, SeedClient};
use serde_json::Value;
use tracing::info;

use crate::{ExtensionConfig, Provider};

/// Terraform arguments
#[derive(Args, Debug)]
pub struct TerraformArgs {
    /// Infrastructure manifest
    #[arg(long = "infrastructure")]
    pub infrastructure: PathBuf,

    /// Cluster manifest of the shoot
    #[arg(long = "cluster")]
    pub cluster: PathBuf,

    /// Terraform outputs (JSON or YAML map); prints the infrastructure status
    /// instead of the Terraform variables
    #[arg(long = "state")]
    pub state: Option<PathBuf>,
}

/// Terraform variables for `infra`, with credentials read from the seed
pub async fn terraform_values(
    provider: Provider,
    ctx: &RequestContext,
    client: &dyn SeedClient,
    infra: &Infrastructure,
    cluster: &Cluster,
) -> anyhow::Result<Values> {
    let namespace = infra.metadata.namespace.clone().unwrap_or_default();
    let values = match provider {
        Provider::Openstack => {
            use provider_openstack::infrastructure::{
                compute_terraformer_chart_values, infrastructure_config,
            };
            let config = infrastructure_config(infra)?;
            let credentials = provider_openstack::credentials::get_credentials(
                ctx,
                client,
                &infra.spec.secret_ref,
                &namespace,
            )
            .await?;
            compute_terraformer_chart_values(infra, &credentials, &config, cluster)?
        }
        Provider::Azure => {
            use provider_azure::infrastructure::{
                compute_terraformer_chart_values, infrastructure_config,
            };
            let config = infrastructure_config(infra)?;
            let auth = provider_azure::auth::get_client_auth(
                ctx,
                client,
                &infra.spec.secret_ref,
                &namespace,
            )
            .await?;
            compute_terraformer_chart_values(infra, &auth, &config, cluster)?
        }
        other => bail!("provider {other:?} has no Terraform configuration"),
    };
    Ok(values)
}

/// Infrastructure status for the outputs of an applied configuration
pub fn infrastructure_status(
    provider: Provider,
    infra: &Infrastructure,
    outputs: &Outputs,
) -> anyhow::Result<Value> {
    let status = match provider {
        Provider::Openstack => {
            use provider_openstack::infrastructure::{status_from_terraform_state, TerraformState};
            serde_json::to_value(status_from_terraform_state(&TerraformState::from_outputs(
                outputs,
            )?))?
        }
        Provider::Azure => {
            use provider_azure::infrastructure::{
                infrastructure_config, status_from_terraform_state, TerraformState,
            };
            let config = infrastructure_config(infra)?;
            serde_json::to_value(status_from_terraform_state(&TerraformState::from_outputs(
                outputs,
                config.zoned,
            )?))?
        }
        other => bail!("provider {other:?} has no Terraform configuration"),
    };
    Ok(status)
}

/// Run the terraform command
pub async fn run(config: &ExtensionConfig, args: TerraformArgs) -> anyhow::Result<()> {
    let infra: Infrastructure = super::read_manifest(&args.infrastructure).await?;

    let output = match &args.state {
        Some(path) => {
            let outputs: Outputs = super::read_manifest(path).await?;
            let status = infrastructure_status(config.provider, &infra, &outputs)?;
            info!(name = ?infra.metadata.name, "Computed infrastructure status");
            serde_yaml::to_string(&status)?
        }
        None => {
            let resource: ClusterResource = super::read_manifest(&args.cluster).await?;
            let cluster = Cluster::from_resource(&resource)?;
            let client = super::seed_client().await?;
            let values = terraform_values(
                config.provider,
                &RequestContext::new(),
                client.as_ref(),
                &infra,
                &cluster,
            )
            .await?;
            info!(name = ?infra.metadata.name, "Computed Terraform variables");
            serde_yaml::to_string(&values)?
        }
    };
    print!("{output}");
    Ok(())
}
