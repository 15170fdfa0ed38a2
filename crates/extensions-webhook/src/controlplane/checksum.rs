//! Checksum annotations on pod templates
//!
//! A pod template annotated with `checksum/<kind>-<name>` rolls whenever the
//! referenced Secret or ConfigMap changes. The checksum is the hex SHA-256 of
//! the JSON encoding of the object's `data` (sorted keys; secret values
//! base64, as on the wire), so it is stable across processes.

use std::collections::BTreeMap;
use std::fmt::Write;

use aws_lc_rs::digest;
use extensions_common::{Error, ObjectKey, RequestContext, Result, SeedClient};
use k8s_openapi::api::core::v1::PodTemplateSpec;
use serde::Serialize;
use tracing::debug;

/// Hex SHA-256 of the JSON encoding of `data`
pub fn compute_checksum<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    let bytes = serde_json::to_vec(data).map_err(|e| Error::encode("checksum input", e))?;
    let hash = digest::digest(&digest::SHA256, &bytes);
    Ok(hash
        .as_ref()
        .iter()
        .fold(String::with_capacity(64), |mut s, b| {
            let _ = write!(s, "{:02x}", b);
            s
        }))
}

fn set_annotation(template: &mut PodTemplateSpec, key: String, value: String) {
    template
        .metadata
        .get_or_insert_with(Default::default)
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(key, value);
}

/// Annotate `template` with the checksum of Secret `namespace/name`
pub async fn ensure_secret_checksum_annotation(
    ctx: &RequestContext,
    template: &mut PodTemplateSpec,
    client: &dyn SeedClient,
    namespace: &str,
    name: &str,
) -> Result<()> {
    let secret = client
        .get_secret(ctx, &ObjectKey::namespaced(namespace, name))
        .await?;
    let checksum = compute_checksum(&secret.data)?;
    debug!(namespace = %namespace, secret = %name, checksum = %checksum, "Ensuring secret checksum annotation");
    set_annotation(template, format!("checksum/secret-{name}"), checksum);
    Ok(())
}

/// Annotate `template` with the checksum of ConfigMap `namespace/name`
pub async fn ensure_config_map_checksum_annotation(
    ctx: &RequestContext,
    template: &mut PodTemplateSpec,
    client: &dyn SeedClient,
    namespace: &str,
    name: &str,
) -> Result<()> {
    let cm = client
        .get_config_map(ctx, &ObjectKey::namespaced(namespace, name))
        .await?;
    let checksum = compute_checksum(&cm.data)?;
    debug!(namespace = %namespace, config_map = %name, checksum = %checksum, "Ensuring config map checksum annotation");
    set_annotation(template, format!("checksum/configmap-{name}"), checksum);
    Ok(())
}
