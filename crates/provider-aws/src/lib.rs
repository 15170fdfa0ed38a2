//! AWS provider extension
//!
//! Adds the etcd backup-restore sidecar configured for S3 to the etcd
//! StatefulSets of shoot control planes.

#![deny(missing_docs)]

pub mod controlplanebackup;

pub use controlplanebackup::BackupEnsurer;

/// Storage provider name understood by etcdbrctl
pub const STORAGE_PROVIDER_NAME: &str = "S3";

/// Key of the bucket name in the backup secret
pub const BUCKET_NAME: &str = "bucketName";

/// Key of the region in the backup secret
pub const REGION: &str = "region";

/// Key of the access key ID in the backup secret
pub const ACCESS_KEY_ID: &str = "accessKeyID";

/// Key of the secret access key in the backup secret
pub const SECRET_ACCESS_KEY: &str = "secretAccessKey";
