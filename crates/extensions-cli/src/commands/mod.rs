//! CLI subcommands

pub mod mutate;
pub mod terraform;
pub mod values;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use extensions_common::{KubeSeedClient, SeedClient};
use serde::de::DeserializeOwned;

/// Seed client for the ambient kubeconfig
pub async fn seed_client() -> anyhow::Result<Arc<dyn SeedClient>> {
    let client = kube::Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;
    Ok(Arc::new(KubeSeedClient::new(client)))
}

/// Read a YAML (or JSON) manifest
pub async fn read_manifest<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}
