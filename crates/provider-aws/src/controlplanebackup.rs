//! etcd backup-restore sidecar for AWS

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use extensions_common::imagevector::ImageVector;
use extensions_common::{
    Cluster, RequestContext, Result, SeedClient, IMAGE_NAME_ETCD_BACKUP_RESTORE,
    SECRET_NAME_ETCD_BACKUP, STATEFUL_SET_NAME_ETCD_EVENTS, STATEFUL_SET_NAME_ETCD_MAIN,
};
use extensions_webhook::controlplane::{
    backup_restore_container, ensure_secret_checksum_annotation, generate_backup_entry_name,
    secret_key_env_var, EtcdBackupConfig, BACKUP_RESTORE_CONTAINER_NAME,
    ETCD_MAIN_VOLUME_CLAIM_TEMPLATE_NAME,
};
use extensions_webhook::merge::{container_with_name, ensure_container_with_name};
use extensions_webhook::Ensurer;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Container;
use tracing::info;

use crate::{ACCESS_KEY_ID, BUCKET_NAME, REGION, SECRET_ACCESS_KEY, STORAGE_PROVIDER_NAME};

/// Ensures the backup-restore sidecar on the etcd StatefulSets
pub struct BackupEnsurer {
    etcd_backup: EtcdBackupConfig,
    image_vector: ImageVector,
    client: Arc<dyn SeedClient>,
}

impl BackupEnsurer {
    /// Create an ensurer
    pub fn new(
        etcd_backup: EtcdBackupConfig,
        image_vector: ImageVector,
        client: Arc<dyn SeedClient>,
    ) -> Self {
        Self {
            etcd_backup,
            image_vector,
            client,
        }
    }

    fn backup_restore_container(
        &self,
        existing: Option<&Container>,
        name: &str,
        cluster: &Cluster,
    ) -> Result<Container> {
        let image = self.image_vector.find_image(
            IMAGE_NAME_ETCD_BACKUP_RESTORE,
            Some(cluster.kubernetes_version()),
        )?;

        // Provider settings only apply to etcd-main with a backup profile
        let mut provider = "";
        let mut prefix = String::new();
        let mut env = Vec::new();
        let mut volume_claim_template_name = name;
        if name == STATEFUL_SET_NAME_ETCD_MAIN {
            if cluster.is_seed_backup_nil() {
                info!("Backup profile is not configured; backups will not be taken for etcd-main");
            } else {
                provider = STORAGE_PROVIDER_NAME;
                prefix = generate_backup_entry_name(cluster.technical_id(), cluster.uid());
                env = vec![
                    secret_key_env_var("STORAGE_CONTAINER", SECRET_NAME_ETCD_BACKUP, BUCKET_NAME),
                    secret_key_env_var("AWS_REGION", SECRET_NAME_ETCD_BACKUP, REGION),
                    secret_key_env_var("AWS_ACCESS_KEY_ID", SECRET_NAME_ETCD_BACKUP, ACCESS_KEY_ID),
                    secret_key_env_var(
                        "AWS_SECRET_ACCESS_KEY",
                        SECRET_NAME_ETCD_BACKUP,
                        SECRET_ACCESS_KEY,
                    ),
                ];
            }
            volume_claim_template_name = ETCD_MAIN_VOLUME_CLAIM_TEMPLATE_NAME;
        }

        let schedule = self.etcd_backup.schedule_for(existing, cluster)?;
        Ok(backup_restore_container(
            name,
            volume_claim_template_name,
            &schedule,
            provider,
            &prefix,
            &image.to_string(),
            &BTreeMap::new(),
            env,
            Vec::new(),
        ))
    }
}

#[async_trait]
impl Ensurer for BackupEnsurer {
    async fn ensure_etcd_stateful_set(
        &self,
        ctx: &RequestContext,
        mut ss: StatefulSet,
        cluster: &Cluster,
    ) -> Result<StatefulSet> {
        let name = ss.metadata.name.clone().unwrap_or_default();
        if name != STATEFUL_SET_NAME_ETCD_MAIN && name != STATEFUL_SET_NAME_ETCD_EVENTS {
            return Ok(ss);
        }
        let namespace = ss.metadata.namespace.clone().unwrap_or_default();

        let spec = ss.spec.get_or_insert_with(Default::default);
        let pod_spec = spec.template.spec.get_or_insert_with(Default::default);
        let existing = container_with_name(&pod_spec.containers, BACKUP_RESTORE_CONTAINER_NAME);
        let container = self.backup_restore_container(existing, &name, cluster)?;
        ensure_container_with_name(&mut pod_spec.containers, container);

        if name == STATEFUL_SET_NAME_ETCD_MAIN && !cluster.is_seed_backup_nil() {
            ensure_secret_checksum_annotation(
                ctx,
                &mut spec.template,
                self.client.as_ref(),
                &namespace,
                SECRET_NAME_ETCD_BACKUP,
            )
            .await?;
        }
        Ok(ss)
    }
}
