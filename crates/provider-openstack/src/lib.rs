//! OpenStack provider extension
//!
//! Computes the chart values of the OpenStack cloud controller manager and
//! the Terraform variables of the shoot infrastructure.

#![deny(missing_docs)]

pub mod apis;
pub mod credentials;
pub mod infrastructure;
pub mod valuesprovider;

pub use credentials::Credentials;
pub use valuesprovider::{control_plane_charts, ControlPlaneCharts, OpenStackValuesProvider};

/// Image vector name of the cloud controller manager image
pub const CLOUD_CONTROLLER_IMAGE_NAME: &str = "hyperkube";

/// Cloud provider config map read by the cloud controller manager
pub const CLOUD_PROVIDER_CONFIG_CLOUD_CONTROLLER_MANAGER_NAME: &str =
    "cloud-provider-config-cloud-controller-manager";

/// Cloud provider config map read by the kube controller manager
pub const CLOUD_PROVIDER_CONFIG_KUBE_CONTROLLER_MANAGER_NAME: &str =
    "cloud-provider-config-kube-controller-manager";

/// Key of the domain name in the cloud provider secret
pub const DOMAIN_NAME: &str = "domainName";

/// Key of the tenant name in the cloud provider secret
pub const TENANT_NAME: &str = "tenantName";

/// Key of the user name in the cloud provider secret
pub const USER_NAME: &str = "username";

/// Key of the password in the cloud provider secret
pub const PASSWORD: &str = "password";
