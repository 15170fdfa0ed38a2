//! Extension config file
//!
//! ```yaml
//! provider: openstack
//! etcd:
//!   backup:
//!     schedule: "0 */24 * * *"
//! imageVectorPath: charts/images.yaml
//! chartsPath: charts
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use extensions_common::imagevector::ImageVector;
use extensions_webhook::controlplane::backup::EtcdBackupConfig;
use serde::Deserialize;
use tracing::debug;

/// Cloud provider an extension runs for
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Amazon Web Services
    Aws,
    /// Google Cloud Platform
    Gcp,
    /// Packet bare metal
    Packet,
    /// OpenStack
    Openstack,
    /// Microsoft Azure
    Azure,
}

/// etcd settings
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct EtcdConfig {
    /// Backup-restore sidecar settings
    #[serde(default)]
    pub backup: EtcdBackupConfig,
}

/// Contents of the extension config file
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionConfig {
    /// Provider to run
    pub provider: Provider,

    /// etcd settings
    #[serde(default)]
    pub etcd: EtcdConfig,

    /// `images.yaml` to resolve images from; no images resolve without it
    #[serde(default)]
    pub image_vector_path: Option<PathBuf>,

    /// Directory holding the provider charts
    #[serde(default = "default_charts_path")]
    pub charts_path: PathBuf,
}

fn default_charts_path() -> PathBuf {
    PathBuf::from("charts")
}

impl ExtensionConfig {
    /// Read and parse the config file at `path`
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&data)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), provider = ?config.provider, "Loaded extension config");
        Ok(config)
    }

    /// Parse the config file contents
    pub fn from_yaml(data: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    /// The image vector the config points at, else an empty one
    pub async fn image_vector(&self) -> anyhow::Result<ImageVector> {
        let Some(path) = &self.image_vector_path else {
            return Ok(ImageVector::default());
        };
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read image vector {}", path.display()))?;
        Ok(ImageVector::from_yaml(&data)?)
    }
}
