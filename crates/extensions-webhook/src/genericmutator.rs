//! Generic control plane mutator
//!
//! The [`Mutator`] routes an admitted object to the matching [`Ensurer`] hook
//! by `(kind, name)`. Providers implement only the hooks they need; every
//! hook defaults to returning its input unchanged.
//!
//! OperatingSystemConfigs go through a fixed chain that decodes each
//! well-known unit or file into a typed form, lets the ensurer edit it, and
//! encodes it back.

use std::sync::Arc;

use async_trait::async_trait;
use extensions_common::apis::{
    File, FileContent, FileContentInline, OperatingSystemConfig, OperatingSystemConfigPurpose,
    Unit,
};
use extensions_common::{
    Cluster, Error, RequestContext, Result, SeedClient, DEPLOYMENT_NAME_KUBE_APISERVER,
    DEPLOYMENT_NAME_KUBE_CONTROLLER_MANAGER, DEPLOYMENT_NAME_KUBE_SCHEDULER,
    OSC_FILE_PATH_CLOUD_PROVIDER_CONFIG, OSC_FILE_PATH_KERNEL_SETTINGS,
    OSC_FILE_PATH_KUBELET_CONFIG, OSC_UNIT_NAME_KUBELET_SERVICE, STATEFUL_SET_NAME_ETCD_EVENTS,
    STATEFUL_SET_NAME_ETCD_MAIN,
};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::codec::{
    DefaultFileContentInlineCodec, FileContentInlineCodec, KubeletConfigCodec,
    KubeletConfiguration, SystemdUnitSerializer, UnitOption, UnitSerializer,
    YamlKubeletConfigCodec, ENCODING_BASE64,
};
use crate::merge::ensure_file_with_path;

/// Permissions of the provisioned cloud provider config file
pub const CLOUD_PROVIDER_CONFIG_PERMISSIONS: i32 = 0o644;

/// Provider-specific mutations of control plane objects
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Ensurer: Send + Sync {
    /// Mutate the kube-apiserver Service
    async fn ensure_kube_apiserver_service(
        &self,
        _ctx: &RequestContext,
        svc: Service,
    ) -> Result<Service> {
        Ok(svc)
    }

    /// Mutate the kube-apiserver Deployment
    async fn ensure_kube_apiserver_deployment(
        &self,
        _ctx: &RequestContext,
        dep: Deployment,
    ) -> Result<Deployment> {
        Ok(dep)
    }

    /// Mutate the kube-controller-manager Deployment
    async fn ensure_kube_controller_manager_deployment(
        &self,
        _ctx: &RequestContext,
        dep: Deployment,
    ) -> Result<Deployment> {
        Ok(dep)
    }

    /// Mutate the kube-scheduler Deployment
    async fn ensure_kube_scheduler_deployment(
        &self,
        _ctx: &RequestContext,
        dep: Deployment,
    ) -> Result<Deployment> {
        Ok(dep)
    }

    /// Mutate the etcd-main or etcd-events StatefulSet
    async fn ensure_etcd_stateful_set(
        &self,
        _ctx: &RequestContext,
        ss: StatefulSet,
        _cluster: &Cluster,
    ) -> Result<StatefulSet> {
        Ok(ss)
    }

    /// Mutate the options of the kubelet.service unit
    async fn ensure_kubelet_service_unit_options(
        &self,
        _ctx: &RequestContext,
        opts: Vec<UnitOption>,
    ) -> Result<Vec<UnitOption>> {
        Ok(opts)
    }

    /// Mutate the kubelet configuration file
    async fn ensure_kubelet_configuration(
        &self,
        _ctx: &RequestContext,
        config: KubeletConfiguration,
    ) -> Result<KubeletConfiguration> {
        Ok(config)
    }

    /// Mutate the kernel settings file
    async fn ensure_kubernetes_general_configuration(
        &self,
        _ctx: &RequestContext,
        data: String,
    ) -> Result<String> {
        Ok(data)
    }

    /// Whether the kubelet cloud provider config file is provisioned
    fn should_provision_kubelet_cloud_provider_config(&self) -> bool {
        false
    }

    /// Content of the kubelet cloud provider config file
    async fn ensure_kubelet_cloud_provider_config(
        &self,
        _ctx: &RequestContext,
        data: String,
        _namespace: &str,
    ) -> Result<String> {
        Ok(data)
    }

    /// Add or change units of the OperatingSystemConfig
    async fn ensure_additional_units(
        &self,
        _ctx: &RequestContext,
        units: Vec<Unit>,
    ) -> Result<Vec<Unit>> {
        Ok(units)
    }

    /// Add or change files of the OperatingSystemConfig
    async fn ensure_additional_files(
        &self,
        _ctx: &RequestContext,
        files: Vec<File>,
    ) -> Result<Vec<File>> {
        Ok(files)
    }
}

/// Ensurer without any mutations
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEnsurer;

impl Ensurer for NoopEnsurer {}

/// An object the mutator can be asked to mutate
#[derive(Clone, Debug)]
pub enum Object {
    /// core/v1 Service
    Service(Service),
    /// apps/v1 Deployment
    Deployment(Deployment),
    /// apps/v1 StatefulSet
    StatefulSet(StatefulSet),
    /// extensions.gardener.cloud/v1alpha1 OperatingSystemConfig
    OperatingSystemConfig(OperatingSystemConfig),
    /// Any other kind, always passed through
    Other(DynamicObject),
}

impl Object {
    /// Kubernetes kind of the object
    pub fn kind(&self) -> &str {
        match self {
            Object::Service(_) => "Service",
            Object::Deployment(_) => "Deployment",
            Object::StatefulSet(_) => "StatefulSet",
            Object::OperatingSystemConfig(_) => "OperatingSystemConfig",
            Object::Other(obj) => obj.types.as_ref().map_or("", |t| t.kind.as_str()),
        }
    }

    /// Object metadata
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            Object::Service(o) => &o.metadata,
            Object::Deployment(o) => &o.metadata,
            Object::StatefulSet(o) => &o.metadata,
            Object::OperatingSystemConfig(o) => &o.metadata,
            Object::Other(o) => &o.metadata,
        }
    }

    fn name(&self) -> &str {
        self.meta().name.as_deref().unwrap_or_default()
    }

    fn namespace(&self) -> &str {
        self.meta().namespace.as_deref().unwrap_or_default()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Service(a), Object::Service(b)) => a == b,
            (Object::Deployment(a), Object::Deployment(b)) => a == b,
            (Object::StatefulSet(a), Object::StatefulSet(b)) => a == b,
            (Object::OperatingSystemConfig(a), Object::OperatingSystemConfig(b)) => a == b,
            (Object::Other(a), Object::Other(b)) => {
                a.types == b.types && a.metadata == b.metadata && a.data == b.data
            }
            _ => false,
        }
    }
}

/// Ensurer hook an object is routed to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hook {
    /// [`Ensurer::ensure_kube_apiserver_service`]
    KubeApiserverService,
    /// [`Ensurer::ensure_kube_apiserver_deployment`]
    KubeApiserverDeployment,
    /// [`Ensurer::ensure_kube_controller_manager_deployment`]
    KubeControllerManagerDeployment,
    /// [`Ensurer::ensure_kube_scheduler_deployment`]
    KubeSchedulerDeployment,
    /// [`Ensurer::ensure_etcd_stateful_set`]
    EtcdStatefulSet,
    /// The OperatingSystemConfig chain
    OperatingSystemConfig,
}

/// `(kind, name, hook)`; a `None` name matches any object of the kind
pub const ROUTES: &[(&str, Option<&str>, Hook)] = &[
    ("Service", Some(DEPLOYMENT_NAME_KUBE_APISERVER), Hook::KubeApiserverService),
    ("Deployment", Some(DEPLOYMENT_NAME_KUBE_APISERVER), Hook::KubeApiserverDeployment),
    (
        "Deployment",
        Some(DEPLOYMENT_NAME_KUBE_CONTROLLER_MANAGER),
        Hook::KubeControllerManagerDeployment,
    ),
    ("Deployment", Some(DEPLOYMENT_NAME_KUBE_SCHEDULER), Hook::KubeSchedulerDeployment),
    ("StatefulSet", Some(STATEFUL_SET_NAME_ETCD_MAIN), Hook::EtcdStatefulSet),
    ("StatefulSet", Some(STATEFUL_SET_NAME_ETCD_EVENTS), Hook::EtcdStatefulSet),
    ("OperatingSystemConfig", None, Hook::OperatingSystemConfig),
];

/// Look up the hook for an object
pub fn route(kind: &str, name: &str) -> Option<Hook> {
    ROUTES
        .iter()
        .find(|(k, n, _)| *k == kind && n.map_or(true, |n| n == name))
        .map(|(_, _, hook)| *hook)
}

/// Codecs used by the OperatingSystemConfig chain
#[derive(Clone)]
pub struct Codecs {
    /// systemd unit content
    pub unit: Arc<dyn UnitSerializer>,
    /// inline file content
    pub inline: Arc<dyn FileContentInlineCodec>,
    /// kubelet configuration file
    pub kubelet_config: Arc<dyn KubeletConfigCodec>,
}

impl Default for Codecs {
    fn default() -> Self {
        Self {
            unit: Arc::new(SystemdUnitSerializer),
            inline: Arc::new(DefaultFileContentInlineCodec),
            kubelet_config: Arc::new(YamlKubeletConfigCodec::new(DefaultFileContentInlineCodec)),
        }
    }
}

/// Dispatches admitted objects to an [`Ensurer`]
#[derive(Clone)]
pub struct Mutator {
    ensurer: Arc<dyn Ensurer>,
    client: Arc<dyn SeedClient>,
    codecs: Codecs,
}

impl Mutator {
    /// Create a mutator
    pub fn new(ensurer: Arc<dyn Ensurer>, client: Arc<dyn SeedClient>, codecs: Codecs) -> Self {
        Self {
            ensurer,
            client,
            codecs,
        }
    }

    /// Mutate `obj` and return the result
    ///
    /// Unrouted objects and objects being deleted are returned unchanged.
    pub async fn mutate(&self, ctx: &RequestContext, obj: Object) -> Result<Object> {
        if obj.meta().deletion_timestamp.is_some() {
            return Ok(obj);
        }
        let Some(hook) = route(obj.kind(), obj.name()) else {
            return Ok(obj);
        };
        debug!(
            kind = %obj.kind(),
            namespace = %obj.namespace(),
            name = %obj.name(),
            hook = ?hook,
            "Mutating object"
        );

        let ensurer = &self.ensurer;
        let mutated = match (hook, obj) {
            (Hook::KubeApiserverService, Object::Service(svc)) => {
                Object::Service(ensurer.ensure_kube_apiserver_service(ctx, svc).await?)
            }
            (Hook::KubeApiserverDeployment, Object::Deployment(dep)) => {
                Object::Deployment(ensurer.ensure_kube_apiserver_deployment(ctx, dep).await?)
            }
            (Hook::KubeControllerManagerDeployment, Object::Deployment(dep)) => Object::Deployment(
                ensurer
                    .ensure_kube_controller_manager_deployment(ctx, dep)
                    .await?,
            ),
            (Hook::KubeSchedulerDeployment, Object::Deployment(dep)) => {
                Object::Deployment(ensurer.ensure_kube_scheduler_deployment(ctx, dep).await?)
            }
            (Hook::EtcdStatefulSet, Object::StatefulSet(ss)) => {
                let cluster = self.cluster(ctx, &ss.metadata).await?;
                Object::StatefulSet(ensurer.ensure_etcd_stateful_set(ctx, ss, &cluster).await?)
            }
            (Hook::OperatingSystemConfig, Object::OperatingSystemConfig(osc)) => {
                Object::OperatingSystemConfig(self.mutate_operating_system_config(ctx, osc).await?)
            }
            (_, other) => other,
        };
        Ok(mutated)
    }

    /// The Cluster named after the object's namespace
    async fn cluster(&self, ctx: &RequestContext, meta: &ObjectMeta) -> Result<Cluster> {
        let namespace = meta
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .ok_or_else(|| {
                Error::validation(format!(
                    "StatefulSet '{}' has no namespace",
                    meta.name.as_deref().unwrap_or_default()
                ))
            })?;
        let resource = self.client.get_cluster(ctx, namespace).await?;
        Cluster::from_resource(&resource)
    }

    async fn mutate_operating_system_config(
        &self,
        ctx: &RequestContext,
        mut osc: OperatingSystemConfig,
    ) -> Result<OperatingSystemConfig> {
        if osc.spec.purpose != OperatingSystemConfigPurpose::Reconcile {
            return Ok(osc);
        }
        let namespace = osc.metadata.namespace.clone().unwrap_or_default();
        let spec = &mut osc.spec;

        if let Some(unit) = spec
            .units
            .iter_mut()
            .find(|u| u.name == OSC_UNIT_NAME_KUBELET_SERVICE)
        {
            if let Some(content) = unit.content.as_deref() {
                let opts = self.codecs.unit.deserialize(content)?;
                let opts = self
                    .ensurer
                    .ensure_kubelet_service_unit_options(ctx, opts)
                    .await?;
                unit.content = Some(self.codecs.unit.serialize(&opts)?);
            }
        }

        if let Some(inline) = inline_content_mut(&mut spec.files, OSC_FILE_PATH_KUBELET_CONFIG) {
            let config = self.codecs.kubelet_config.decode(inline)?;
            let config = self.ensurer.ensure_kubelet_configuration(ctx, config).await?;
            *inline = self.codecs.kubelet_config.encode(&config, &inline.encoding)?;
        }

        if let Some(inline) = inline_content_mut(&mut spec.files, OSC_FILE_PATH_KERNEL_SETTINGS) {
            let data = String::from_utf8(self.codecs.inline.decode(inline)?)
                .map_err(|e| Error::decode("inline content", OSC_FILE_PATH_KERNEL_SETTINGS, e))?;
            let data = self
                .ensurer
                .ensure_kubernetes_general_configuration(ctx, data)
                .await?;
            *inline = self.codecs.inline.encode(data.as_bytes(), &inline.encoding)?;
        }

        if self.ensurer.should_provision_kubelet_cloud_provider_config() {
            let data = self
                .ensurer
                .ensure_kubelet_cloud_provider_config(ctx, String::new(), &namespace)
                .await?;
            let inline = self.codecs.inline.encode(data.as_bytes(), ENCODING_BASE64)?;
            ensure_file_with_path(
                &mut spec.files,
                File {
                    path: OSC_FILE_PATH_CLOUD_PROVIDER_CONFIG.to_string(),
                    permissions: Some(CLOUD_PROVIDER_CONFIG_PERMISSIONS),
                    content: FileContent {
                        secret_ref: None,
                        inline: Some(inline),
                    },
                },
            );
        }

        spec.units = self
            .ensurer
            .ensure_additional_units(ctx, std::mem::take(&mut spec.units))
            .await?;
        spec.files = self
            .ensurer
            .ensure_additional_files(ctx, std::mem::take(&mut spec.files))
            .await?;
        Ok(osc)
    }
}

fn inline_content_mut<'a>(files: &'a mut [File], path: &str) -> Option<&'a mut FileContentInline> {
    files
        .iter_mut()
        .find(|f| f.path == path)
        .and_then(|f| f.content.inline.as_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use extensions_common::apis::extensions::{ClusterSpec, OperatingSystemConfigSpec};
    use extensions_common::apis::ClusterResource;
    use extensions_common::MockSeedClient;
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use k8s_openapi::chrono::Utc;
    use kube::api::ApiResource;
    use mockall::predicate::eq;
    use std::collections::BTreeMap;

    const NAMESPACE: &str = "test";
    const OLD_GENERAL_CONFIG: &str = "# Increase the tcp-time-wait buckets pool size to prevent simple DOS attacks\nnet.ipv4.tcp_tw_reuse = 1";
    const NEW_GENERAL_CONFIG: &str = "# Increase the tcp-time-wait buckets pool size to prevent simple DOS attacks\nnet.ipv4.tcp_tw_reuse = 1\n# Provider specific settings";
    const CLOUD_PROVIDER_CONF: &str = "[Global]\nauth-url: x";

    fn meta(name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        }
    }

    fn labeled(mut meta: ObjectMeta) -> ObjectMeta {
        meta.labels = Some(BTreeMap::from([("mutated".to_string(), "true".to_string())]));
        meta
    }

    fn mutator(ensurer: MockEnsurer, client: MockSeedClient) -> Mutator {
        Mutator::new(Arc::new(ensurer), Arc::new(client), Codecs::default())
    }

    fn cluster_resource() -> ClusterResource {
        ClusterResource::new(
            NAMESPACE,
            ClusterSpec {
                shoot: serde_json::json!({"spec": {"kubernetes": {"version": "1.13.4"}}}),
                ..Default::default()
            },
        )
    }

    #[test]
    fn routing_table_matches_kind_and_name() {
        assert_eq!(route("Service", "kube-apiserver"), Some(Hook::KubeApiserverService));
        assert_eq!(route("Service", "other"), None);
        assert_eq!(
            route("Deployment", "kube-scheduler"),
            Some(Hook::KubeSchedulerDeployment)
        );
        assert_eq!(route("StatefulSet", "etcd-events"), Some(Hook::EtcdStatefulSet));
        assert_eq!(route("StatefulSet", "test"), None);
        assert_eq!(
            route("OperatingSystemConfig", "anything"),
            Some(Hook::OperatingSystemConfig)
        );
        assert_eq!(route("ConfigMap", "kube-apiserver"), None);
    }

    #[tokio::test]
    async fn story_kube_apiserver_service_is_routed_to_its_hook() {
        let mut ensurer = MockEnsurer::new();
        ensurer
            .expect_ensure_kube_apiserver_service()
            .times(1)
            .returning(|_, mut svc| {
                svc.metadata = labeled(svc.metadata);
                Ok(svc)
            });

        let svc = Service {
            metadata: meta("kube-apiserver"),
            ..Default::default()
        };
        let out = mutator(ensurer, MockSeedClient::new())
            .mutate(&RequestContext::new(), Object::Service(svc))
            .await
            .unwrap();
        assert_eq!(out.meta(), &labeled(meta("kube-apiserver")));
    }

    #[tokio::test]
    async fn story_each_deployment_reaches_its_own_hook() {
        let mut ensurer = MockEnsurer::new();
        ensurer
            .expect_ensure_kube_apiserver_deployment()
            .times(1)
            .returning(|_, dep| Ok(dep));
        ensurer
            .expect_ensure_kube_controller_manager_deployment()
            .times(1)
            .returning(|_, dep| Ok(dep));
        ensurer
            .expect_ensure_kube_scheduler_deployment()
            .times(1)
            .returning(|_, dep| Ok(dep));
        let m = mutator(ensurer, MockSeedClient::new());

        for name in [
            "kube-apiserver",
            "kube-controller-manager",
            "kube-scheduler",
            "other-deployment",
        ] {
            let dep = Deployment {
                metadata: meta(name),
                ..Default::default()
            };
            let out = m
                .mutate(&RequestContext::new(), Object::Deployment(dep.clone()))
                .await
                .unwrap();
            assert_eq!(out, Object::Deployment(dep));
        }
    }

    #[tokio::test]
    async fn story_etcd_stateful_sets_receive_the_cluster() {
        let mut client = MockSeedClient::new();
        client
            .expect_get_cluster()
            .withf(|_, name| name == NAMESPACE)
            .times(2)
            .returning(|_, _| Ok(cluster_resource()));

        let mut ensurer = MockEnsurer::new();
        ensurer
            .expect_ensure_etcd_stateful_set()
            .withf(|_, _, cluster| cluster.kubernetes_version() == "1.13.4")
            .times(2)
            .returning(|_, ss, _| Ok(ss));
        let m = mutator(ensurer, client);

        for name in ["etcd-main", "etcd-events"] {
            let ss = StatefulSet {
                metadata: meta(name),
                ..Default::default()
            };
            m.mutate(&RequestContext::new(), Object::StatefulSet(ss))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn unrelated_and_deleted_objects_pass_through() {
        // No expectations: any ensurer or client call panics
        let m = mutator(MockEnsurer::new(), MockSeedClient::new());
        let ctx = RequestContext::new();

        let ss = Object::StatefulSet(StatefulSet {
            metadata: meta("test"),
            ..Default::default()
        });
        assert_eq!(m.mutate(&ctx, ss.clone()).await.unwrap(), ss);

        let mut deleted = meta("kube-apiserver");
        deleted.deletion_timestamp = Some(Time(Utc::now()));
        let svc = Object::Service(Service {
            metadata: deleted,
            ..Default::default()
        });
        assert_eq!(m.mutate(&ctx, svc.clone()).await.unwrap(), svc);

        let cm = ApiResource::erase::<ConfigMap>(&());
        let other = Object::Other(DynamicObject::new("kube-apiserver", &cm).within(NAMESPACE));
        assert_eq!(m.mutate(&ctx, other.clone()).await.unwrap(), other);
    }

    #[tokio::test]
    async fn missing_cluster_aborts_etcd_mutation() {
        let mut client = MockSeedClient::new();
        client
            .expect_get_cluster()
            .returning(|_, name| Err(Error::not_found("Cluster", name)));
        let m = mutator(MockEnsurer::new(), client);

        let ss = StatefulSet {
            metadata: meta("etcd-main"),
            ..Default::default()
        };
        let err = m
            .mutate(&RequestContext::new(), Object::StatefulSet(ss))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    fn reconcile_osc() -> OperatingSystemConfig {
        let mut osc = OperatingSystemConfig::new(
            "test",
            OperatingSystemConfigSpec {
                purpose: OperatingSystemConfigPurpose::Reconcile,
                units: vec![Unit {
                    name: OSC_UNIT_NAME_KUBELET_SERVICE.to_string(),
                    content: Some("[Service]\nFoo=bar\n".to_string()),
                    ..Default::default()
                }],
                files: vec![
                    File {
                        path: OSC_FILE_PATH_KUBELET_CONFIG.to_string(),
                        content: FileContent {
                            inline: Some(FileContentInline {
                                encoding: String::new(),
                                data: "featureGates:\n  Bar: true\n  Foo: true\n".to_string(),
                            }),
                            ..Default::default()
                        },
                        ..Default::default()
                    },
                    File {
                        path: OSC_FILE_PATH_KERNEL_SETTINGS.to_string(),
                        content: FileContent {
                            inline: Some(FileContentInline {
                                encoding: String::new(),
                                data: OLD_GENERAL_CONFIG.to_string(),
                            }),
                            ..Default::default()
                        },
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
        );
        osc.metadata.namespace = Some(NAMESPACE.to_string());
        osc
    }

    #[tokio::test]
    async fn story_operating_system_config_runs_the_full_chain() {
        let mut ensurer = MockEnsurer::new();
        ensurer
            .expect_ensure_kubelet_service_unit_options()
            .withf(|_, opts| opts == &vec![UnitOption::new("Service", "Foo", "bar")])
            .times(1)
            .returning(|_, _| Ok(vec![UnitOption::new("Service", "Foo", "baz")]));
        ensurer
            .expect_ensure_kubelet_configuration()
            .withf(|_, c| c.feature_gates.len() == 2)
            .times(1)
            .returning(|_, mut c| {
                c.feature_gates.remove("Bar");
                Ok(c)
            });
        ensurer
            .expect_ensure_kubernetes_general_configuration()
            .with(mockall::predicate::always(), eq(OLD_GENERAL_CONFIG.to_string()))
            .times(1)
            .returning(|_, _| Ok(NEW_GENERAL_CONFIG.to_string()));
        ensurer
            .expect_should_provision_kubelet_cloud_provider_config()
            .return_const(true);
        ensurer
            .expect_ensure_kubelet_cloud_provider_config()
            .withf(|_, data, ns| data.is_empty() && ns == NAMESPACE)
            .times(1)
            .returning(|_, _, _| Ok(CLOUD_PROVIDER_CONF.to_string()));
        ensurer
            .expect_ensure_additional_units()
            .times(1)
            .returning(|_, mut units| {
                units.push(Unit {
                    name: "custom-mtu.service".to_string(),
                    ..Default::default()
                });
                Ok(units)
            });
        ensurer
            .expect_ensure_additional_files()
            .times(1)
            .returning(|_, mut files| {
                files.push(File {
                    path: "/test/path".to_string(),
                    ..Default::default()
                });
                Ok(files)
            });

        let out = mutator(ensurer, MockSeedClient::new())
            .mutate(
                &RequestContext::new(),
                Object::OperatingSystemConfig(reconcile_osc()),
            )
            .await
            .unwrap();
        let Object::OperatingSystemConfig(osc) = out else {
            panic!("expected an OperatingSystemConfig");
        };

        let units = &osc.spec.units;
        assert_eq!(units[0].content.as_deref(), Some("[Service]\nFoo=baz\n"));
        assert_eq!(units[1].name, "custom-mtu.service");

        let files = &osc.spec.files;
        let kubelet = files[0].content.inline.as_ref().unwrap();
        assert_eq!(kubelet.encoding, "");
        assert_eq!(kubelet.data, "featureGates:\n  Foo: true\n");

        let general = files[1].content.inline.as_ref().unwrap();
        assert_eq!(general.data, NEW_GENERAL_CONFIG);

        let cloud_provider = &files[2];
        assert_eq!(cloud_provider.path, OSC_FILE_PATH_CLOUD_PROVIDER_CONFIG);
        assert_eq!(cloud_provider.permissions, Some(0o644));
        assert_eq!(
            cloud_provider.content.inline,
            Some(FileContentInline {
                encoding: "b64".to_string(),
                data: "W0dsb2JhbF0KYXV0aC11cmw6IHg=".to_string(),
            })
        );
        assert_eq!(files[3].path, "/test/path");
    }

    #[tokio::test]
    async fn provision_configs_are_left_alone() {
        let mut osc = reconcile_osc();
        osc.spec.purpose = OperatingSystemConfigPurpose::Provision;

        let m = mutator(MockEnsurer::new(), MockSeedClient::new());
        let out = m
            .mutate(&RequestContext::new(), Object::OperatingSystemConfig(osc.clone()))
            .await
            .unwrap();
        assert_eq!(out, Object::OperatingSystemConfig(osc));
    }

    #[tokio::test]
    async fn noop_ensurer_leaves_reconcile_config_equivalent() {
        let m = Mutator::new(
            Arc::new(NoopEnsurer),
            Arc::new(MockSeedClient::new()),
            Codecs::default(),
        );
        let osc = reconcile_osc();
        let out = m
            .mutate(&RequestContext::new(), Object::OperatingSystemConfig(osc.clone()))
            .await
            .unwrap();
        let again = m.mutate(&RequestContext::new(), out.clone()).await.unwrap();
        assert_eq!(out, again);

        let Object::OperatingSystemConfig(out) = out else {
            panic!("expected an OperatingSystemConfig");
        };
        assert_eq!(out.spec.units, osc.spec.units);
        assert_eq!(out.spec.files.len(), 2);
    }

    #[tokio::test]
    async fn failing_hook_aborts_the_chain() {
        let mut ensurer = MockEnsurer::new();
        ensurer
            .expect_ensure_kubelet_service_unit_options()
            .returning(|_, _| Err(Error::validation("boom")));

        let err = mutator(ensurer, MockSeedClient::new())
            .mutate(
                &RequestContext::new(),
                Object::OperatingSystemConfig(reconcile_osc()),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
