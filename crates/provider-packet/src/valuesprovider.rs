//! Chart values for the Packet control plane

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use extensions_common::apis::{decode_provider_config, ControlPlane};
use extensions_common::values::{set_string_value, Values, ValuesProvider};
use extensions_common::{
    Cluster, Error, ObjectKey, RequestContext, Result, SeedClient, SECRET_NAME_CLOUD_PROVIDER,
};
use k8s_openapi::api::core::v1::Secret;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{API_TOKEN, PROJECT_ID};

/// Provider configuration of a Packet `ControlPlane`
///
/// Packet has no control plane settings yet; decoding still rejects a
/// malformed configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneConfig {}

/// Credentials read from the cloud provider secret
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    /// Packet API token
    pub api_token: Vec<u8>,
    /// Packet project ID
    pub project_id: Vec<u8>,
}

impl Credentials {
    /// Read the credentials from `secret`
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let field = |key: &str| {
            secret
                .data
                .as_ref()
                .and_then(|d| d.get(key))
                .map(|v| v.0.clone())
                .ok_or_else(|| Error::validation(format!("missing {key} field in secret")))
        };
        Ok(Self {
            api_token: field(API_TOKEN)?,
            project_id: field(PROJECT_ID)?,
        })
    }
}

/// Values provider for the Packet control plane charts
pub struct PacketValuesProvider {
    client: Arc<dyn SeedClient>,
}

impl PacketValuesProvider {
    /// Create a values provider reading secrets through `client`
    pub fn new(client: Arc<dyn SeedClient>) -> Self {
        Self { client }
    }
}

fn pod_annotations(checksums: &BTreeMap<String, String>, secrets: &[&str]) -> Value {
    let annotations: Values = secrets
        .iter()
        .map(|name| {
            let checksum = checksums.get(*name).cloned().unwrap_or_default();
            (format!("checksum/secret-{name}"), Value::String(checksum))
        })
        .collect();
    Value::Object(annotations)
}

fn control_plane_chart_values(
    cp: &ControlPlane,
    cluster: &Cluster,
    checksums: &BTreeMap<String, String>,
    scaled_down: bool,
) -> Values {
    let replicas = cluster.control_plane_replicas(scaled_down, 1);
    let namespace = cp.metadata.namespace.as_deref().unwrap_or_default();

    let mut ccm = Values::new();
    ccm.insert("replicas".to_string(), json!(replicas));
    ccm.insert("clusterName".to_string(), json!(namespace));
    ccm.insert("kubernetesVersion".to_string(), json!(cluster.kubernetes_version()));
    set_string_value(&mut ccm, "podNetwork", cluster.pod_network());
    ccm.insert(
        "podAnnotations".to_string(),
        pod_annotations(checksums, &["cloud-controller-manager", SECRET_NAME_CLOUD_PROVIDER]),
    );

    let csi = json!({
        "replicas": replicas,
        "kubernetesVersion": cluster.kubernetes_version(),
        "regionID": cp.spec.region,
        "podAnnotations": pod_annotations(
            checksums,
            &["csi-attacher", "csi-provisioner", SECRET_NAME_CLOUD_PROVIDER],
        ),
    });

    let mut values = Values::new();
    values.insert("packet-cloud-controller-manager".to_string(), Value::Object(ccm));
    values.insert("csi-packet".to_string(), csi);
    values
}

#[async_trait]
impl ValuesProvider for PacketValuesProvider {
    async fn get_control_plane_chart_values(
        &self,
        _ctx: &RequestContext,
        cp: &ControlPlane,
        cluster: &Cluster,
        checksums: &BTreeMap<String, String>,
        scaled_down: bool,
    ) -> Result<Option<Values>> {
        let _config: ControlPlaneConfig = decode_provider_config(
            cp.spec.provider_config.as_ref(),
            "providerConfig",
            format!("controlplane '{}'", ObjectKey::from_meta(&cp.metadata)),
        )?;
        Ok(Some(control_plane_chart_values(
            cp,
            cluster,
            checksums,
            scaled_down,
        )))
    }

    async fn get_control_plane_shoot_chart_values(
        &self,
        ctx: &RequestContext,
        cp: &ControlPlane,
        cluster: &Cluster,
    ) -> Result<Option<Values>> {
        let namespace = cp.metadata.namespace.as_deref().unwrap_or_default();
        let key = ObjectKey::from_secret_ref(&cp.spec.secret_ref, namespace);
        debug!(secret = %key, "Reading Packet credentials");
        let secret = self.client.get_secret(ctx, &key).await?;
        let credentials = Credentials::from_secret(&secret)?;

        let mut values = Values::new();
        values.insert(
            "csi-packet".to_string(),
            json!({
                "credential": {
                    "apiToken": STANDARD.encode(&credentials.api_token),
                    "projectID": STANDARD.encode(&credentials.project_id),
                },
                "kubernetesVersion": cluster.kubernetes_version(),
            }),
        );
        Ok(Some(values))
    }
}
