//! Packet provider extension
//!
//! Packet shoots run an external cloud controller manager and the Packet CSI
//! driver. The ensurer switches the control plane and the kubelet over to
//! the external cloud provider; the values provider feeds the charts that
//! deploy both components.

#![deny(missing_docs)]

pub mod controlplane;
pub mod valuesprovider;

pub use controlplane::ControlPlaneEnsurer;
pub use valuesprovider::PacketValuesProvider;

/// Key of the API token in the cloud provider secret
pub const API_TOKEN: &str = "apiToken";

/// Key of the project ID in the cloud provider secret
pub const PROJECT_ID: &str = "projectID";

/// Feature gates the CSI driver needs on the API server and the kubelet
pub const CSI_FEATURE_GATES: [&str; 3] = [
    "VolumeSnapshotDataSource",
    "CSINodeInfo",
    "CSIDriverRegistry",
];
