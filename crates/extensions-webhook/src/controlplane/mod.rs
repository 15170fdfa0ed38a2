//! Control plane helpers shared by provider ensurers

pub mod backup;
pub mod checksum;

pub use backup::{
    backup_restore_container, determine_backup_schedule, generate_backup_entry_name,
    secret_key_env_var, EtcdBackupConfig, BACKUP_RESTORE_CONTAINER_NAME,
    ETCD_MAIN_VOLUME_CLAIM_TEMPLATE_NAME,
};
pub use checksum::{
    compute_checksum, ensure_config_map_checksum_annotation, ensure_secret_checksum_annotation,
};
