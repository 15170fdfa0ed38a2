//! Seed cluster client seam
//!
//! Webhooks and values providers read Secrets, ConfigMaps and the `Cluster`
//! resource from the seed. They do so through [`SeedClient`] so that tests can
//! substitute a mock, and every call runs under a [`RequestContext`] whose
//! cancellation token is owned by the admission request.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, SecretReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Api, Client};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::apis::ClusterResource;
use crate::{Error, Result};

/// Namespace and name of an object
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// Namespace; `None` for cluster-scoped objects
    pub namespace: Option<String>,
    /// Object name
    pub name: String,
}

impl ObjectKey {
    /// Key of a namespaced object
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// Key of a cluster-scoped object
    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Key of the object described by `meta`
    pub fn from_meta(meta: &ObjectMeta) -> Self {
        Self {
            namespace: meta.namespace.clone(),
            name: meta.name.clone().unwrap_or_default(),
        }
    }

    /// Key of the secret a `SecretReference` points at
    ///
    /// References without a namespace resolve in `default_namespace`.
    pub fn from_secret_ref(reference: &SecretReference, default_namespace: &str) -> Self {
        Self::namespaced(
            reference
                .namespace
                .clone()
                .unwrap_or_else(|| default_namespace.to_string()),
            reference.name.clone().unwrap_or_default(),
        )
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => write!(f, "{}/{}", ns, self.name),
            _ => f.write_str(&self.name),
        }
    }
}

/// Request-scoped context passed to every external call
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
}

impl RequestContext {
    /// Context with a fresh, never-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Context bound to a caller-owned cancellation token
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// The request's cancellation token
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the request has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run `fut`, failing with [`Error::Cancelled`] if the request is cancelled first
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            res = fut => res,
        }
    }
}

/// Read access to the seed cluster
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SeedClient: Send + Sync {
    /// Fetch a Secret
    async fn get_secret(&self, ctx: &RequestContext, key: &ObjectKey) -> Result<Secret>;

    /// Fetch a ConfigMap
    async fn get_config_map(&self, ctx: &RequestContext, key: &ObjectKey) -> Result<ConfigMap>;

    /// Fetch the cluster-scoped `Cluster` resource with the given name
    async fn get_cluster(&self, ctx: &RequestContext, name: &str) -> Result<ClusterResource>;
}

/// [`SeedClient`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSeedClient {
    client: Client,
}

impl KubeSeedClient {
    /// Wrap a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Map a 404 to [`Error::NotFound`] and everything else to [`Error::Kube`]
fn lookup_error(kind: &str, key: &ObjectKey, err: kube::Error) -> Error {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => Error::not_found(kind, key.to_string()),
        e => e.into(),
    }
}

fn require_namespace<'a>(kind: &str, key: &'a ObjectKey) -> Result<&'a str> {
    key.namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .ok_or_else(|| Error::validation(format!("{kind} '{}' requires a namespace", key.name)))
}

#[async_trait]
impl SeedClient for KubeSeedClient {
    async fn get_secret(&self, ctx: &RequestContext, key: &ObjectKey) -> Result<Secret> {
        let namespace = require_namespace("Secret", key)?;
        debug!(secret = %key, "Fetching secret");
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        ctx.run(async {
            api.get(&key.name)
                .await
                .map_err(|e| lookup_error("Secret", key, e))
        })
        .await
    }

    async fn get_config_map(&self, ctx: &RequestContext, key: &ObjectKey) -> Result<ConfigMap> {
        let namespace = require_namespace("ConfigMap", key)?;
        debug!(config_map = %key, "Fetching config map");
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        ctx.run(async {
            api.get(&key.name)
                .await
                .map_err(|e| lookup_error("ConfigMap", key, e))
        })
        .await
    }

    async fn get_cluster(&self, ctx: &RequestContext, name: &str) -> Result<ClusterResource> {
        debug!(cluster = %name, "Fetching cluster");
        let key = ObjectKey::cluster_scoped(name);
        let api: Api<ClusterResource> = Api::all(self.client.clone());
        ctx.run(async {
            api.get(name)
                .await
                .map_err(|e| lookup_error("Cluster", &key, e))
        })
        .await
    }
}
