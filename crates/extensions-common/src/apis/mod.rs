//! API types consumed by the extensions
//!
//! `core` holds the Gardener resources that arrive embedded in a `Cluster`;
//! `extensions` holds the extension CRDs the webhooks and actuators act on.

pub mod core;
pub mod extensions;

use std::fmt::Display;

use serde::de::DeserializeOwned;

use crate::{Error, Result};

pub use self::core::{CloudProfile, Seed, Shoot};
pub use self::extensions::{
    ClusterResource, ControlPlane, File, FileContent, FileContentInline, Infrastructure,
    OperatingSystemConfig, OperatingSystemConfigPurpose, Unit,
};

/// Decode a provider configuration or status embedded in a resource
///
/// An absent or `null` field decodes to the type's default. `resource` names
/// the owning object in the error, e.g. `controlplane 'ns/name'`.
pub fn decode_provider_config<T: DeserializeOwned + Default>(
    raw: Option<&serde_json::Value>,
    what: &str,
    resource: impl Display,
) -> Result<T> {
    match raw {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|e| Error::decode(what, resource.to_string(), e)),
    }
}
