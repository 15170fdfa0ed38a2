//! Values-provider protocol and chart descriptors
//!
//! A values provider turns a `ControlPlane` and its `Cluster` into the flat
//! value maps the (external) chart renderer consumes. Chart descriptors are
//! plain structs built once at startup and handed to whoever renders them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::apis::ControlPlane;
use crate::client::RequestContext;
use crate::imagevector::ImageVector;
use crate::{Cluster, Result};

/// Chart values
pub type Values = serde_json::Map<String, Value>;

/// Insert `key` only when `value` is present and non-empty
pub fn set_string_value(values: &mut Values, key: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        values.insert(key.to_string(), Value::String(v.to_string()));
    }
}

/// Provider-specific values for the charts of a control plane
///
/// Every method defaults to "no values" so providers only implement the
/// charts they ship.
#[async_trait]
pub trait ValuesProvider: Send + Sync {
    /// Values for the cloud-provider config chart
    async fn get_config_chart_values(
        &self,
        _ctx: &RequestContext,
        _cp: &ControlPlane,
        _cluster: &Cluster,
    ) -> Result<Option<Values>> {
        Ok(None)
    }

    /// Values for the control plane chart deployed into the seed
    async fn get_control_plane_chart_values(
        &self,
        _ctx: &RequestContext,
        _cp: &ControlPlane,
        _cluster: &Cluster,
        _checksums: &BTreeMap<String, String>,
        _scaled_down: bool,
    ) -> Result<Option<Values>> {
        Ok(None)
    }

    /// Values for the control plane chart deployed into the shoot
    async fn get_control_plane_shoot_chart_values(
        &self,
        _ctx: &RequestContext,
        _cp: &ControlPlane,
        _cluster: &Cluster,
    ) -> Result<Option<Values>> {
        Ok(None)
    }

    /// Values for the storage classes chart deployed into the shoot
    async fn get_storage_classes_chart_values(
        &self,
        _ctx: &RequestContext,
        _cp: &ControlPlane,
        _cluster: &Cluster,
    ) -> Result<Option<Values>> {
        Ok(None)
    }
}

/// Values provider that provides no values for any chart
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopValuesProvider;

impl ValuesProvider for NoopValuesProvider {}

/// Kind and name of an object a chart renders
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartObject {
    /// Kubernetes kind
    pub kind: String,
    /// Object name
    pub name: String,
}

/// Descriptor of a chart shipped with an extension
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chart {
    /// Chart name
    pub name: String,
    /// Directory of the chart
    pub path: PathBuf,
    /// Image vector names injected under `images`
    pub images: Vec<String>,
    /// Objects the chart renders, for the consumer that applies it
    pub objects: Vec<ChartObject>,
}

impl Chart {
    /// Chart `name` located at `<charts_path>/<name>`
    pub fn new(charts_path: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: charts_path.join(name),
            images: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Add the image names this chart deploys
    pub fn with_images(mut self, images: &[&str]) -> Self {
        self.images = images.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add an object the chart renders
    pub fn with_object(mut self, kind: &str, name: &str) -> Self {
        self.objects.push(ChartObject {
            kind: kind.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Resolve the chart's images and add them to `values` under `images`
    pub fn inject_images(
        &self,
        values: &mut Values,
        image_vector: &ImageVector,
        target_version: &str,
    ) -> Result<()> {
        if self.images.is_empty() {
            return Ok(());
        }
        let mut images = Values::new();
        for name in &self.images {
            let image = image_vector.find_image(name, Some(target_version))?;
            images.insert(name.clone(), Value::String(image.to_string()));
        }
        values.insert("images".to_string(), Value::Object(images));
        Ok(())
    }
}
