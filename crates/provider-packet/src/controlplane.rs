//! Control plane and kubelet mutations for Packet shoots

use std::sync::Arc;

use async_trait::async_trait;
use extensions_common::{RequestContext, Result, SeedClient, SECRET_NAME_CLOUD_PROVIDER};
use extensions_webhook::codec::{KubeletConfiguration, UnitOption};
use extensions_webhook::controlplane::ensure_secret_checksum_annotation;
use extensions_webhook::flags::{
    deserialize_command_line, ensure_no_string_with_prefix_contains, ensure_string_with_prefix,
    ensure_string_with_prefix_contains, serialize_command_line,
};
use extensions_webhook::merge::container_with_name_mut;
use extensions_webhook::Ensurer;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Container;
use tracing::debug;

use crate::CSI_FEATURE_GATES;

const ADMISSION_PLUGIN_PERSISTENT_VOLUME_LABEL: &str = "PersistentVolumeLabel";

/// Separator between `ExecStart` arguments after the binary and subcommand
const EXEC_START_SEPARATOR: &str = " \\\n    ";

/// Switches the control plane and the kubelet to the external cloud provider
pub struct ControlPlaneEnsurer {
    client: Arc<dyn SeedClient>,
}

impl ControlPlaneEnsurer {
    /// Create an ensurer reading secrets through `client`
    pub fn new(client: Arc<dyn SeedClient>) -> Self {
        Self { client }
    }
}

fn command(c: &mut Container) -> &mut Vec<String> {
    c.command.get_or_insert_with(Vec::new)
}

fn ensure_kube_apiserver_command_line_args(c: &mut Container) {
    let cmd = command(c);
    ensure_no_string_with_prefix_contains(
        cmd,
        "--enable-admission-plugins=",
        ADMISSION_PLUGIN_PERSISTENT_VOLUME_LABEL,
        ",",
    );
    ensure_string_with_prefix_contains(
        cmd,
        "--disable-admission-plugins=",
        ADMISSION_PLUGIN_PERSISTENT_VOLUME_LABEL,
        ",",
    );
    for gate in CSI_FEATURE_GATES {
        ensure_string_with_prefix_contains(cmd, "--feature-gates=", &format!("{gate}=true"), ",");
    }
}

fn ensure_kube_controller_manager_command_line_args(c: &mut Container) {
    ensure_string_with_prefix(command(c), "--cloud-provider=", "external");
}

fn ensure_kubelet_command_line_args(command: &mut Vec<String>) {
    ensure_string_with_prefix(command, "--cloud-provider=", "external");
    ensure_string_with_prefix(command, "--enable-controller-attach-detach=", "true");
}

#[async_trait]
impl Ensurer for ControlPlaneEnsurer {
    async fn ensure_kube_apiserver_deployment(
        &self,
        ctx: &RequestContext,
        mut dep: Deployment,
    ) -> Result<Deployment> {
        let namespace = dep.metadata.namespace.clone().unwrap_or_default();
        let template = &mut dep.spec.get_or_insert_with(Default::default).template;
        if let Some(pod_spec) = template.spec.as_mut() {
            if let Some(c) = container_with_name_mut(&mut pod_spec.containers, "kube-apiserver") {
                ensure_kube_apiserver_command_line_args(c);
            }
        }
        ensure_secret_checksum_annotation(
            ctx,
            template,
            self.client.as_ref(),
            &namespace,
            SECRET_NAME_CLOUD_PROVIDER,
        )
        .await?;
        Ok(dep)
    }

    async fn ensure_kube_controller_manager_deployment(
        &self,
        _ctx: &RequestContext,
        mut dep: Deployment,
    ) -> Result<Deployment> {
        let pod_spec = dep
            .spec
            .as_mut()
            .and_then(|s| s.template.spec.as_mut());
        if let Some(pod_spec) = pod_spec {
            if let Some(c) =
                container_with_name_mut(&mut pod_spec.containers, "kube-controller-manager")
            {
                ensure_kube_controller_manager_command_line_args(c);
            }
        }
        Ok(dep)
    }

    async fn ensure_kubelet_service_unit_options(
        &self,
        _ctx: &RequestContext,
        mut opts: Vec<UnitOption>,
    ) -> Result<Vec<UnitOption>> {
        // An empty ExecStart= resets earlier commands and carries no arguments
        for opt in opts.iter_mut().filter(|o| {
            o.section == "Service" && o.name == "ExecStart" && !o.value.trim().is_empty()
        }) {
            let mut command = deserialize_command_line(&opt.value);
            ensure_kubelet_command_line_args(&mut command);
            opt.value = serialize_command_line(&command, 2, EXEC_START_SEPARATOR);
            debug!(value = %opt.value, "Ensured kubelet ExecStart");
        }
        Ok(opts)
    }

    async fn ensure_kubelet_configuration(
        &self,
        _ctx: &RequestContext,
        mut config: KubeletConfiguration,
    ) -> Result<KubeletConfiguration> {
        for gate in CSI_FEATURE_GATES {
            config.feature_gates.insert(gate.to_string(), true);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extensions_common::{MockSeedClient, ObjectKey};
    use extensions_webhook::flags::string_with_prefix_contains;
    use extensions_webhook::merge::container_with_name;
    use k8s_openapi::api::apps::v1::DeploymentSpec;
    use k8s_openapi::api::core::v1::{EnvVar, PodSpec, PodTemplateSpec, Secret};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    const NAMESPACE: &str = "test";
    const CHECKSUM: &str = "8bafb35ff1ac60275d62e1cbd495aceb511fb354f74a20f7d06ecb48b3a68432";

    fn secret_client() -> MockSeedClient {
        let mut client = MockSeedClient::new();
        client
            .expect_get_secret()
            .withf(|_, key| key == &ObjectKey::namespaced(NAMESPACE, SECRET_NAME_CLOUD_PROVIDER))
            .returning(|_, _| {
                Ok(Secret {
                    data: Some(BTreeMap::from([(
                        "foo".to_string(),
                        ByteString(b"bar".to_vec()),
                    )])),
                    ..Default::default()
                })
            });
        client
    }

    fn deployment(name: &str, container: Container) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(NAMESPACE.to_string()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![container],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn container(name: &str, command: &[&str]) -> Container {
        Container {
            name: name.to_string(),
            command: (!command.is_empty())
                .then(|| command.iter().map(|s| s.to_string()).collect()),
            env: Some(vec![EnvVar {
                name: "PACKET_API_KEY".to_string(),
                value: Some("?".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }
    }

    fn check_kube_apiserver(dep: &Deployment) {
        let spec = dep.spec.as_ref().unwrap();
        let pod_spec = spec.template.spec.as_ref().unwrap();
        let c = container_with_name(&pod_spec.containers, "kube-apiserver").unwrap();
        let cmd = c.command.as_ref().unwrap();
        assert!(!string_with_prefix_contains(
            cmd,
            "--enable-admission-plugins=",
            "PersistentVolumeLabel",
            ","
        ));
        assert!(string_with_prefix_contains(
            cmd,
            "--disable-admission-plugins=",
            "PersistentVolumeLabel",
            ","
        ));
        for gate in ["VolumeSnapshotDataSource", "CSINodeInfo", "CSIDriverRegistry"] {
            assert!(string_with_prefix_contains(
                cmd,
                "--feature-gates=",
                &format!("{gate}=true"),
                ","
            ));
        }
        assert_eq!(
            spec.template.metadata.as_ref().unwrap().annotations,
            Some(BTreeMap::from([(
                "checksum/secret-cloudprovider".to_string(),
                CHECKSUM.to_string()
            )]))
        );
    }

    #[tokio::test]
    async fn story_kube_apiserver_gets_missing_flags() {
        let ensurer = ControlPlaneEnsurer::new(Arc::new(secret_client()));
        let dep = ensurer
            .ensure_kube_apiserver_deployment(
                &RequestContext::new(),
                deployment("kube-apiserver", container("kube-apiserver", &[])),
            )
            .await
            .unwrap();
        check_kube_apiserver(&dep);
    }

    #[tokio::test]
    async fn story_kube_apiserver_flags_are_modified_in_place() {
        let ensurer = ControlPlaneEnsurer::new(Arc::new(secret_client()));
        let dep = ensurer
            .ensure_kube_apiserver_deployment(
                &RequestContext::new(),
                deployment(
                    "kube-apiserver",
                    container(
                        "kube-apiserver",
                        &[
                            "--enable-admission-plugins=Priority,PersistentVolumeLabel",
                            "--disable-admission-plugins=",
                            "--feature-gates=Foo=true",
                        ],
                    ),
                ),
            )
            .await
            .unwrap();
        check_kube_apiserver(&dep);

        let pod_spec = dep.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        assert_eq!(
            pod_spec.containers[0].command.as_deref().unwrap(),
            [
                "--enable-admission-plugins=Priority",
                "--disable-admission-plugins=PersistentVolumeLabel",
                "--feature-gates=Foo=true,VolumeSnapshotDataSource=true,CSINodeInfo=true,CSIDriverRegistry=true",
            ]
        );
    }

    #[tokio::test]
    async fn kube_apiserver_mutation_is_idempotent() {
        let ensurer = ControlPlaneEnsurer::new(Arc::new(secret_client()));
        let ctx = RequestContext::new();
        let once = ensurer
            .ensure_kube_apiserver_deployment(
                &ctx,
                deployment(
                    "kube-apiserver",
                    container("kube-apiserver", &["--feature-gates=Foo=true"]),
                ),
            )
            .await
            .unwrap();
        let twice = ensurer
            .ensure_kube_apiserver_deployment(&ctx, once.clone())
            .await
            .unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn kube_controller_manager_uses_external_cloud_provider() {
        let ensurer = ControlPlaneEnsurer::new(Arc::new(MockSeedClient::new()));
        for command in [&[][..], &["--cloud-provider=?"][..]] {
            let dep = ensurer
                .ensure_kube_controller_manager_deployment(
                    &RequestContext::new(),
                    deployment(
                        "kube-controller-manager",
                        container("kube-controller-manager", command),
                    ),
                )
                .await
                .unwrap();
            let pod_spec = dep.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
            assert_eq!(
                pod_spec.containers[0].command.as_deref().unwrap(),
                ["--cloud-provider=external"]
            );
        }
    }

    #[tokio::test]
    async fn story_kubelet_exec_start_gets_external_cloud_provider() {
        let ensurer = ControlPlaneEnsurer::new(Arc::new(MockSeedClient::new()));
        let old = vec![UnitOption::new(
            "Service",
            "ExecStart",
            "/opt/bin/hyperkube kubelet \\\n    --config=/var/lib/kubelet/config/kubelet",
        )];

        let opts = ensurer
            .ensure_kubelet_service_unit_options(&RequestContext::new(), old)
            .await
            .unwrap();

        assert_eq!(
            opts,
            vec![UnitOption::new(
                "Service",
                "ExecStart",
                "/opt/bin/hyperkube kubelet \\\n    --config=/var/lib/kubelet/config/kubelet \\\n    --cloud-provider=external \\\n    --enable-controller-attach-detach=true",
            )]
        );

        let again = ensurer
            .ensure_kubelet_service_unit_options(&RequestContext::new(), opts.clone())
            .await
            .unwrap();
        assert_eq!(again, opts);
    }

    #[tokio::test]
    async fn exec_start_reset_line_is_kept_empty() {
        let ensurer = ControlPlaneEnsurer::new(Arc::new(MockSeedClient::new()));
        let old = vec![
            UnitOption::new("Service", "ExecStartPre", "/bin/sh -c 'x'"),
            UnitOption::new("Service", "ExecStart", ""),
            UnitOption::new("Service", "ExecStart", "/opt/bin/hyperkube kubelet"),
        ];

        let opts = ensurer
            .ensure_kubelet_service_unit_options(&RequestContext::new(), old)
            .await
            .unwrap();

        assert_eq!(
            opts,
            vec![
                UnitOption::new("Service", "ExecStartPre", "/bin/sh -c 'x'"),
                UnitOption::new("Service", "ExecStart", ""),
                UnitOption::new(
                    "Service",
                    "ExecStart",
                    "/opt/bin/hyperkube kubelet \\\n    --cloud-provider=external \\\n    --enable-controller-attach-detach=true",
                ),
            ]
        );

        let only_reset = vec![UnitOption::new("Service", "ExecStart", "")];
        let out = ensurer
            .ensure_kubelet_service_unit_options(&RequestContext::new(), only_reset.clone())
            .await
            .unwrap();
        assert_eq!(out, only_reset);
    }

    #[tokio::test]
    async fn other_unit_options_are_untouched() {
        let ensurer = ControlPlaneEnsurer::new(Arc::new(MockSeedClient::new()));
        let opts = vec![
            UnitOption::new("Unit", "ExecStart", "/bin/true"),
            UnitOption::new("Service", "Restart", "always"),
        ];
        let out = ensurer
            .ensure_kubelet_service_unit_options(&RequestContext::new(), opts.clone())
            .await
            .unwrap();
        assert_eq!(out, opts);
    }

    #[tokio::test]
    async fn kubelet_configuration_enables_csi_feature_gates() {
        let ensurer = ControlPlaneEnsurer::new(Arc::new(MockSeedClient::new()));
        let config = KubeletConfiguration {
            feature_gates: BTreeMap::from([("Foo".to_string(), true)]),
            ..Default::default()
        };

        let out = ensurer
            .ensure_kubelet_configuration(&RequestContext::new(), config)
            .await
            .unwrap();

        assert_eq!(
            out.feature_gates,
            BTreeMap::from([
                ("Foo".to_string(), true),
                ("VolumeSnapshotDataSource".to_string(), true),
                ("CSINodeInfo".to_string(), true),
                ("CSIDriverRegistry".to_string(), true),
            ])
        );
    }
}
