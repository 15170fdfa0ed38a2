//! Common types for Gardener provider extensions: API types, cluster context,
//! errors, and the collaborator seams shared by webhooks and values providers

#![deny(missing_docs)]

pub mod apis;
pub mod client;
pub mod cluster;
pub mod error;
pub mod imagevector;
pub mod terraform;
pub mod values;

pub use client::{KubeSeedClient, ObjectKey, RequestContext, SeedClient};
#[cfg(any(test, feature = "test-utils"))]
pub use client::MockSeedClient;
pub use cluster::Cluster;
pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Name of the kube-apiserver Deployment and Service in a shoot namespace
pub const DEPLOYMENT_NAME_KUBE_APISERVER: &str = "kube-apiserver";

/// Name of the kube-controller-manager Deployment in a shoot namespace
pub const DEPLOYMENT_NAME_KUBE_CONTROLLER_MANAGER: &str = "kube-controller-manager";

/// Name of the kube-scheduler Deployment in a shoot namespace
pub const DEPLOYMENT_NAME_KUBE_SCHEDULER: &str = "kube-scheduler";

/// Name of the main etcd StatefulSet
pub const STATEFUL_SET_NAME_ETCD_MAIN: &str = "etcd-main";

/// Name of the events etcd StatefulSet
pub const STATEFUL_SET_NAME_ETCD_EVENTS: &str = "etcd-events";

/// Name of the kubelet systemd unit in an OperatingSystemConfig
pub const OSC_UNIT_NAME_KUBELET_SERVICE: &str = "kubelet.service";

/// Path of the kubelet configuration file in an OperatingSystemConfig
pub const OSC_FILE_PATH_KUBELET_CONFIG: &str = "/var/lib/kubelet/config/kubelet";

/// Path of the general kernel settings file in an OperatingSystemConfig
pub const OSC_FILE_PATH_KERNEL_SETTINGS: &str = "/etc/sysctl.d/99-k8s-general.conf";

/// Path of the kubelet cloud-provider config file written by the mutator
pub const OSC_FILE_PATH_CLOUD_PROVIDER_CONFIG: &str = "/var/lib/kubelet/cloudprovider.conf";

/// Name of the secret holding the shoot's infrastructure credentials
pub const SECRET_NAME_CLOUD_PROVIDER: &str = "cloudprovider";

/// Name of the shoot cluster CA secret
pub const SECRET_NAME_CA_CLUSTER: &str = "ca";

/// Name of the secret holding the etcd backup credentials
pub const SECRET_NAME_ETCD_BACKUP: &str = "etcd-backup";

/// Image vector name of the etcd backup-restore sidecar image
pub const IMAGE_NAME_ETCD_BACKUP_RESTORE: &str = "etcd-backup-restore";
