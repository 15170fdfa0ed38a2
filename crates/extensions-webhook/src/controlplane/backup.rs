//! etcd backup-restore sidecar
//!
//! Shared building blocks for the provider `controlplanebackup` ensurers:
//! the sidecar container, the backup prefix, and the default schedule.

use std::collections::BTreeMap;

use extensions_common::{Cluster, Error, Result};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, ResourceRequirements, SecretKeySelector,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::flags::ensure_string_with_prefix;
use crate::merge::ensure_volume_mount_with_name;

/// Name of the backup-restore sidecar container
pub const BACKUP_RESTORE_CONTAINER_NAME: &str = "backup-restore";

/// Volume claim template of the `etcd-main` StatefulSet
pub const ETCD_MAIN_VOLUME_CLAIM_TEMPLATE_NAME: &str = "main-etcd";

/// etcd client port
pub const ETCD_PORT_CLIENT: i32 = 2379;

/// Port of the backup-restore server
pub const ETCD_PORT_BACKUP_RESTORE: i32 = 8080;

const SCHEDULE_ARG: &str = "--schedule=";
const MINUTES_PER_DAY: i64 = 24 * 60;

/// etcd backup settings of a provider extension
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct EtcdBackupConfig {
    /// Cron schedule for full snapshots; derived per shoot when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

impl EtcdBackupConfig {
    /// The configured schedule, else the one [`determine_backup_schedule`] picks
    pub fn schedule_for(&self, existing: Option<&Container>, cluster: &Cluster) -> Result<String> {
        match &self.schedule {
            Some(schedule) => Ok(schedule.clone()),
            None => determine_backup_schedule(existing, cluster),
        }
    }
}

/// Env var `name` read from key `key` of Secret `secret`
pub fn secret_key_env_var(name: &str, secret: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.to_string(),
                key: key.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Backup prefix of a shoot: `<technical-ID>--<UID>`
pub fn generate_backup_entry_name(technical_id: &str, uid: &str) -> String {
    format!("{technical_id}--{uid}")
}

/// The backup-restore sidecar for the etcd StatefulSet `name`
///
/// `args` become additional `--key=value` flags; `volume_mounts` are added
/// after the data and TLS mounts.
#[allow(clippy::too_many_arguments)]
pub fn backup_restore_container(
    name: &str,
    volume_claim_template_name: &str,
    schedule: &str,
    provider: &str,
    prefix: &str,
    image: &str,
    args: &BTreeMap<String, String>,
    env: Vec<EnvVar>,
    volume_mounts: Vec<VolumeMount>,
) -> Container {
    let mut command: Vec<String> = vec![
        "etcdbrctl".to_string(),
        "server".to_string(),
        format!("{SCHEDULE_ARG}{schedule}"),
        "--data-dir=/var/etcd/data/new.etcd".to_string(),
        format!("--storage-provider={provider}"),
        format!("--store-prefix={prefix}"),
        "--cert=/root/etcd/ssl/client/tls.crt".to_string(),
        "--key=/root/etcd/ssl/client/tls.key".to_string(),
        "--cacert=/root/etcd/ssl/ca/ca.crt".to_string(),
        "--insecure-transport=false".to_string(),
        "--insecure-skip-tls-verify=false".to_string(),
        format!("--endpoints=https://{name}-0:{ETCD_PORT_CLIENT}"),
        "--etcd-connection-timeout=300".to_string(),
        "--delta-snapshot-period-seconds=300".to_string(),
        // 100 MiB
        "--delta-snapshot-memory-limit=104857600".to_string(),
        "--garbage-collection-period-seconds=43200".to_string(),
        "--snapstore-temp-directory=/var/etcd/data/temp".to_string(),
    ];
    for (key, value) in args {
        ensure_string_with_prefix(&mut command, &format!("--{key}="), value);
    }

    let mut mounts = Some(vec![
        mount(volume_claim_template_name, "/var/etcd/data"),
        mount("ca-etcd", "/root/etcd/ssl/ca"),
        mount("etcd-client-tls", "/root/etcd/ssl/client"),
    ]);
    for vm in volume_mounts {
        ensure_volume_mount_with_name(&mut mounts, vm);
    }

    Container {
        name: BACKUP_RESTORE_CONTAINER_NAME.to_string(),
        command: Some(command),
        env: (!env.is_empty()).then_some(env),
        image: Some(image.to_string()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        ports: Some(vec![ContainerPort {
            name: Some("server".to_string()),
            container_port: ETCD_PORT_BACKUP_RESTORE,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        resources: Some(ResourceRequirements {
            requests: Some(BTreeMap::from([
                ("cpu".to_string(), Quantity("23m".to_string())),
                ("memory".to_string(), Quantity("128Mi".to_string())),
            ])),
            limits: Some(BTreeMap::from([
                ("cpu".to_string(), Quantity("1".to_string())),
                ("memory".to_string(), Quantity("10G".to_string())),
            ])),
            ..Default::default()
        }),
        volume_mounts: mounts,
        ..Default::default()
    }
}

fn mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        ..Default::default()
    }
}

/// Schedule for the backup-restore sidecar when none is configured
///
/// An existing sidecar keeps its `--schedule=`. Otherwise the snapshot runs
/// daily, 1h15m before the shoot's maintenance window starts plus a
/// UID-derived offset of up to an hour. Shoots without a usable window
/// snapshot at their creation minute and hour.
pub fn determine_backup_schedule(existing: Option<&Container>, cluster: &Cluster) -> Result<String> {
    if let Some(schedule) = existing
        .and_then(|c| c.command.as_ref())
        .and_then(|cmd| cmd.iter().find_map(|arg| arg.strip_prefix(SCHEDULE_ARG)))
    {
        return Ok(schedule.to_string());
    }

    if let Some(window) = cluster.maintenance_time_window() {
        if !window.begin.is_empty() && !window.end.is_empty() {
            let begin = parse_maintenance_time(&window.begin)?;
            let end = parse_maintenance_time(&window.end)?;
            if !is_always_window(begin, end) {
                let random_minutes = cluster.uid().bytes().next().map_or(0, |b| i64::from(b) % 60);
                let snapshot = (begin / 60 - 75 + random_minutes).rem_euclid(MINUTES_PER_DAY);
                return Ok(cron_daily(snapshot / 60, snapshot % 60));
            }
        }
    }

    let (hour, minute) = cluster
        .shoot
        .as_ref()
        .and_then(|s| s.metadata.creation_timestamp.as_ref())
        .map(|t| (i64::from(t.0.hour()), i64::from(t.0.minute())))
        .unwrap_or((0, 0));
    Ok(cron_daily(hour, minute))
}

fn cron_daily(hour: i64, minute: i64) -> String {
    format!("{minute} {hour} * * *")
}

/// Seconds since midnight UTC of a `HHMMSS+ZZZZ` maintenance time
fn parse_maintenance_time(value: &str) -> Result<i64> {
    let invalid = || Error::validation(format!("invalid maintenance time '{value}'"));
    if value.len() != 11 || !value.is_ascii() {
        return Err(invalid());
    }
    let num = |range: std::ops::Range<usize>| -> Result<i64> {
        value[range].parse::<i64>().map_err(|_| invalid())
    };
    let (hour, minute, second) = (num(0..2)?, num(2..4)?, num(4..6)?);
    let sign = match &value[6..7] {
        "+" => 1,
        "-" => -1,
        _ => return Err(invalid()),
    };
    let (tz_hour, tz_minute) = (num(7..9)?, num(9..11)?);
    if hour > 23 || minute > 59 || second > 59 || tz_hour > 23 || tz_minute > 59 {
        return Err(invalid());
    }
    let local = hour * 3600 + minute * 60 + second;
    let offset = sign * (tz_hour * 3600 + tz_minute * 60);
    Ok((local - offset).rem_euclid(MINUTES_PER_DAY * 60))
}

fn is_always_window(begin: i64, end: i64) -> bool {
    begin == 0 && end == MINUTES_PER_DAY * 60 - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use extensions_common::apis::core::{
        Maintenance, MaintenanceTimeWindow, Shoot, ShootSpec, ShootStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
    use k8s_openapi::chrono::{TimeZone, Utc};

    fn is_always_maintenance_window(window: &MaintenanceTimeWindow) -> Result<bool> {
        Ok(is_always_window(
            parse_maintenance_time(&window.begin)?,
            parse_maintenance_time(&window.end)?,
        ))
    }

    fn cluster_with_window(begin: &str, end: &str, uid: &str) -> Cluster {
        Cluster {
            shoot: Some(Shoot {
                spec: ShootSpec {
                    maintenance: Some(Maintenance {
                        time_window: Some(MaintenanceTimeWindow {
                            begin: begin.to_string(),
                            end: end.to_string(),
                        }),
                    }),
                    ..Default::default()
                },
                status: ShootStatus {
                    uid: uid.to_string(),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn container_carries_provider_settings() {
        let c = backup_restore_container(
            "etcd-main",
            ETCD_MAIN_VOLUME_CLAIM_TEMPLATE_NAME,
            "0 */24 * * *",
            "S3",
            "shoot--test--sample--test-uid",
            "test-repository:test-tag",
            &BTreeMap::new(),
            vec![],
            vec![],
        );

        assert_eq!(c.name, "backup-restore");
        let cmd = c.command.unwrap();
        assert!(cmd.contains(&"--schedule=0 */24 * * *".to_string()));
        assert!(cmd.contains(&"--storage-provider=S3".to_string()));
        assert!(cmd.contains(&"--store-prefix=shoot--test--sample--test-uid".to_string()));
        assert!(cmd.contains(&"--endpoints=https://etcd-main-0:2379".to_string()));
        assert!(c.env.is_none());
        let mounts = c.volume_mounts.unwrap();
        assert_eq!(mounts[0].name, "main-etcd");
        assert_eq!(mounts[0].mount_path, "/var/etcd/data");
        assert_eq!(mounts.len(), 3);
    }

    #[test]
    fn extra_args_and_mounts_are_merged() {
        let args = BTreeMap::from([
            ("schedule".to_string(), "1 2 * * *".to_string()),
            ("max-backups".to_string(), "7".to_string()),
        ]);
        let c = backup_restore_container(
            "etcd-main",
            ETCD_MAIN_VOLUME_CLAIM_TEMPLATE_NAME,
            "0 */24 * * *",
            "GCS",
            "p",
            "img",
            &args,
            vec![],
            vec![mount("etcd-backup", "/root/.gcp/")],
        );
        let cmd = c.command.unwrap();
        assert_eq!(cmd[2], "--schedule=1 2 * * *");
        assert_eq!(cmd.last().unwrap(), "--max-backups=7");
        assert_eq!(c.volume_mounts.unwrap().len(), 4);
    }

    #[test]
    fn configured_schedule_wins() {
        let existing = Container {
            command: Some(vec!["--schedule=5 4 * * *".to_string()]),
            ..Default::default()
        };
        let cluster = cluster_with_window("220000+0000", "230000+0000", "a-uid");
        let config = EtcdBackupConfig {
            schedule: Some("0 */24 * * *".to_string()),
        };
        assert_eq!(
            config.schedule_for(Some(&existing), &cluster).unwrap(),
            "0 */24 * * *"
        );
        assert_eq!(
            EtcdBackupConfig::default()
                .schedule_for(Some(&existing), &cluster)
                .unwrap(),
            "5 4 * * *"
        );
    }

    #[test]
    fn backup_entry_name_joins_id_and_uid() {
        assert_eq!(
            generate_backup_entry_name("shoot--test--sample", "test-uid"),
            "shoot--test--sample--test-uid"
        );
    }

    #[test]
    fn story_existing_schedule_is_kept() {
        let existing = Container {
            name: BACKUP_RESTORE_CONTAINER_NAME.to_string(),
            command: Some(vec![
                "etcdbrctl".to_string(),
                "--schedule=5 4 * * *".to_string(),
            ]),
            ..Default::default()
        };
        let cluster = cluster_with_window("220000+0000", "230000+0000", "abc");
        assert_eq!(
            determine_backup_schedule(Some(&existing), &cluster).unwrap(),
            "5 4 * * *"
        );
    }

    #[test]
    fn story_schedule_precedes_maintenance_window() {
        // 'a' = 97, 97 % 60 = 37 minutes after 20:45
        let cluster = cluster_with_window("220000+0000", "230000+0000", "a-uid");
        assert_eq!(determine_backup_schedule(None, &cluster).unwrap(), "22 21 * * *");

        // Window given in +0100 starts at 21:00 UTC
        let cluster = cluster_with_window("220000+0100", "230000+0100", "a-uid");
        assert_eq!(determine_backup_schedule(None, &cluster).unwrap(), "22 20 * * *");

        // Deterministic across calls
        assert_eq!(
            determine_backup_schedule(None, &cluster).unwrap(),
            determine_backup_schedule(None, &cluster).unwrap()
        );
    }

    #[test]
    fn schedule_wraps_around_midnight() {
        // '0' = 48 minutes after 22:45 of the previous day
        let cluster = cluster_with_window("000000+0000", "010000+0000", "0");
        assert_eq!(determine_backup_schedule(None, &cluster).unwrap(), "33 23 * * *");
    }

    #[test]
    fn always_window_falls_back_to_creation_time() {
        let mut cluster = cluster_with_window("000000+0000", "235959+0000", "a-uid");
        if let Some(shoot) = cluster.shoot.as_mut() {
            shoot.metadata = ObjectMeta {
                creation_timestamp: Some(Time(
                    Utc.with_ymd_and_hms(2019, 6, 1, 13, 42, 7).unwrap(),
                )),
                ..Default::default()
            };
        }
        assert_eq!(determine_backup_schedule(None, &cluster).unwrap(), "42 13 * * *");

        assert_eq!(
            determine_backup_schedule(None, &Cluster::default()).unwrap(),
            "0 0 * * *"
        );
    }

    #[test]
    fn malformed_window_is_rejected() {
        let cluster = cluster_with_window("22:00", "23:00", "a");
        assert!(determine_backup_schedule(None, &cluster).is_err());
        assert!(parse_maintenance_time("250000+0000").is_err());
        assert!(is_always_maintenance_window(&MaintenanceTimeWindow {
            begin: "000000+0000".to_string(),
            end: "235959+0000".to_string(),
        })
        .unwrap());
    }
}
