//! GCP provider extension
//!
//! Adds the etcd backup-restore sidecar configured for Google Cloud Storage
//! to the etcd StatefulSets of shoot control planes. The service account
//! stored in the backup secret is mounted into the sidecar.

#![deny(missing_docs)]

pub mod controlplanebackup;

pub use controlplanebackup::BackupEnsurer;

/// Storage provider name understood by etcdbrctl
pub const STORAGE_PROVIDER_NAME: &str = "GCS";

/// Key of the bucket name in the backup secret
pub const BUCKET_NAME: &str = "bucketName";

/// Key of the service account JSON in the backup secret
pub const SERVICE_ACCOUNT_JSON_FIELD: &str = "serviceaccount.json";

/// Mount path of the backup secret in the sidecar
pub const BACKUP_SECRET_MOUNT_PATH: &str = "/root/.gcp/";
