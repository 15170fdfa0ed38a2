//! Decoded view of the `Cluster` extension resource
//!
//! A [`Cluster`] is fetched once per request and never mutated. Every
//! accessor tolerates missing parts so that ensurers which only need the
//! Kubernetes version keep working for partially populated clusters.

use kube::ResourceExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::apis::core::MaintenanceTimeWindow;
use crate::apis::extensions::ClusterSpec;
use crate::apis::{ClusterResource, CloudProfile, Seed, Shoot};
use crate::{Error, Result};

/// CloudProfile, Seed and Shoot of one shoot
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cluster {
    /// The shoot's cloud profile
    pub cloud_profile: Option<CloudProfile>,
    /// The seed hosting the shoot's control plane
    pub seed: Option<Seed>,
    /// The shoot itself
    pub shoot: Option<Shoot>,
}

impl Cluster {
    /// Decode the embedded resources of a `Cluster`
    ///
    /// JSON `null` (or an absent field) decodes to `None`.
    pub fn from_resource(resource: &ClusterResource) -> Result<Self> {
        let name = resource.name_any();
        Ok(Self {
            cloud_profile: decode_raw(&resource.spec.cloud_profile, "cloudProfile", &name)?,
            seed: decode_raw(&resource.spec.seed, "seed", &name)?,
            shoot: decode_raw(&resource.spec.shoot, "shoot", &name)?,
        })
    }

    /// Encode into a `Cluster` resource with the given name
    pub fn to_resource(&self, name: &str) -> Result<ClusterResource> {
        Ok(ClusterResource::new(
            name,
            ClusterSpec {
                cloud_profile: encode_raw(&self.cloud_profile, "cloudProfile")?,
                seed: encode_raw(&self.seed, "seed")?,
                shoot: encode_raw(&self.shoot, "shoot")?,
            },
        ))
    }

    /// Kubernetes version of the shoot, or `""` if unknown
    pub fn kubernetes_version(&self) -> &str {
        self.shoot
            .as_ref()
            .map(|s| s.spec.kubernetes.version.as_str())
            .unwrap_or_default()
    }

    /// Technical ID of the shoot, or `""` if unknown
    pub fn technical_id(&self) -> &str {
        self.shoot
            .as_ref()
            .map(|s| s.status.technical_id.as_str())
            .unwrap_or_default()
    }

    /// UID of the shoot, or `""` if unknown
    pub fn uid(&self) -> &str {
        self.shoot
            .as_ref()
            .map(|s| s.status.uid.as_str())
            .unwrap_or_default()
    }

    /// Pod network CIDR of the shoot
    pub fn pod_network(&self) -> Option<&str> {
        self.shoot.as_ref().and_then(|s| s.spec.networking.pods.as_deref())
    }

    /// Maintenance window of the shoot
    pub fn maintenance_time_window(&self) -> Option<&MaintenanceTimeWindow> {
        self.shoot
            .as_ref()
            .and_then(|s| s.spec.maintenance.as_ref())
            .and_then(|m| m.time_window.as_ref())
    }

    /// Whether the seed has no backup profile
    pub fn is_seed_backup_nil(&self) -> bool {
        self.seed
            .as_ref()
            .and_then(|s| s.spec.backup.as_ref())
            .is_none()
    }

    /// Whether the shoot is hibernated
    pub fn is_hibernated(&self) -> bool {
        self.shoot
            .as_ref()
            .and_then(|s| s.spec.hibernation.as_ref())
            .and_then(|h| h.enabled)
            .unwrap_or(false)
    }

    /// Replicas for a control plane component
    ///
    /// A hibernated shoot whose component is already scaled down stays at
    /// zero; otherwise the component runs with `woken_up` replicas.
    pub fn control_plane_replicas(&self, scaled_down: bool, woken_up: i32) -> i32 {
        if self.is_hibernated() && scaled_down {
            0
        } else {
            woken_up
        }
    }

    /// Raw provider configuration of the cloud profile
    pub fn cloud_profile_provider_config(&self) -> Option<&serde_json::Value> {
        self.cloud_profile
            .as_ref()
            .and_then(|cp| cp.spec.provider_config.as_ref())
            .filter(|v| !v.is_null())
    }
}

fn decode_raw<T: DeserializeOwned>(
    raw: &serde_json::Value,
    what: &str,
    cluster: &str,
) -> Result<Option<T>> {
    if raw.is_null() {
        return Ok(None);
    }
    serde_json::from_value(raw.clone())
        .map(Some)
        .map_err(|e| Error::decode(what, format!("cluster '{cluster}'"), e))
}

fn encode_raw<T: Serialize>(value: &Option<T>, what: &str) -> Result<serde_json::Value> {
    match value {
        Some(v) => serde_json::to_value(v).map_err(|e| Error::encode(what, e)),
        None => Ok(serde_json::Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::core::{
        Hibernation, Kubernetes, Maintenance, SeedBackup, SeedSpec, ShootSpec, ShootStatus,
    };

    fn shoot(version: &str) -> Shoot {
        Shoot {
            spec: ShootSpec {
                kubernetes: Kubernetes {
                    version: version.to_string(),
                },
                ..Default::default()
            },
            status: ShootStatus {
                technical_id: "shoot--test--sample".to_string(),
                uid: "test-uid".to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn decodes_embedded_resources() {
        let resource = ClusterResource::new(
            "shoot--test--sample",
            ClusterSpec {
                cloud_profile: serde_json::json!({"spec": {"type": "openstack"}}),
                seed: serde_json::json!({"spec": {"backup": {"provider": "openstack"}}}),
                shoot: serde_json::json!({
                    "spec": {
                        "kubernetes": {"version": "1.13.4"},
                        "networking": {"pods": "100.96.0.0/11"}
                    },
                    "status": {"technicalID": "shoot--test--sample", "uid": "test-uid"}
                }),
            },
        );

        let cluster = Cluster::from_resource(&resource).unwrap();
        assert_eq!(cluster.kubernetes_version(), "1.13.4");
        assert_eq!(cluster.technical_id(), "shoot--test--sample");
        assert_eq!(cluster.uid(), "test-uid");
        assert_eq!(cluster.pod_network(), Some("100.96.0.0/11"));
        assert!(!cluster.is_seed_backup_nil());
        assert_eq!(cluster.cloud_profile.unwrap().spec.type_, "openstack");
    }

    #[test]
    fn null_parts_decode_to_none() {
        let resource = ClusterResource::new("test", ClusterSpec::default());
        let cluster = Cluster::from_resource(&resource).unwrap();
        assert_eq!(cluster, Cluster::default());
        assert_eq!(cluster.kubernetes_version(), "");
        assert!(cluster.is_seed_backup_nil());
        assert!(cluster.maintenance_time_window().is_none());
    }

    #[test]
    fn malformed_part_names_the_cluster() {
        let resource = ClusterResource::new(
            "shoot--test--sample",
            ClusterSpec {
                shoot: serde_json::json!({"spec": {"kubernetes": {"version": 1}}}),
                ..Default::default()
            },
        );
        let err = Cluster::from_resource(&resource).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("could not decode shoot"));
        assert!(msg.contains("shoot--test--sample"));
    }

    #[test]
    fn resource_round_trip_preserves_cluster() {
        let cluster = Cluster {
            seed: Some(Seed {
                spec: SeedSpec {
                    backup: Some(SeedBackup::default()),
                    ..Default::default()
                },
                ..Default::default()
            }),
            shoot: Some(shoot("1.14.0")),
            ..Default::default()
        };
        let resource = cluster.to_resource("test").unwrap();
        assert_eq!(resource.name_any(), "test");
        assert_eq!(Cluster::from_resource(&resource).unwrap(), cluster);
    }

    #[test]
    fn hibernated_and_scaled_down_components_stay_at_zero() {
        let mut s = shoot("1.13.4");
        s.spec.hibernation = Some(Hibernation {
            enabled: Some(true),
        });
        s.spec.maintenance = Some(Maintenance::default());
        let cluster = Cluster {
            shoot: Some(s),
            ..Default::default()
        };

        assert!(cluster.is_hibernated());
        assert_eq!(cluster.control_plane_replicas(true, 1), 0);
        assert_eq!(cluster.control_plane_replicas(false, 1), 1);

        let awake = Cluster {
            shoot: Some(shoot("1.13.4")),
            ..Default::default()
        };
        assert_eq!(awake.control_plane_replicas(true, 3), 3);
    }
}
