//! Run the provider webhook on one AdmissionReview

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use extensions_common::imagevector::ImageVector;
use extensions_common::{RequestContext, SeedClient};
use extensions_webhook::admission::mutate_review;
use extensions_webhook::{Codecs, Ensurer, Mutator, NoopEnsurer};
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionReview};
use tracing::info;

use crate::{ExtensionConfig, Provider};

/// Mutate arguments
#[derive(Args, Debug)]
pub struct MutateArgs {
    /// AdmissionReview (JSON) to answer
    #[arg(short = 'r', long = "review")]
    pub review: PathBuf,
}

/// The ensurer of `provider`; providers without webhook changes get a no-op
pub fn build_ensurer(
    config: &ExtensionConfig,
    image_vector: ImageVector,
    client: Arc<dyn SeedClient>,
) -> Arc<dyn Ensurer> {
    let etcd_backup = config.etcd.backup.clone();
    match config.provider {
        Provider::Aws => Arc::new(provider_aws::BackupEnsurer::new(
            etcd_backup,
            image_vector,
            client,
        )),
        Provider::Gcp => Arc::new(provider_gcp::BackupEnsurer::new(
            etcd_backup,
            image_vector,
            client,
        )),
        Provider::Packet => Arc::new(provider_packet::ControlPlaneEnsurer::new(client)),
        Provider::Openstack | Provider::Azure => Arc::new(NoopEnsurer),
    }
}

/// Answer the AdmissionReview in `input` and return the response review
pub async fn review(mutator: &Mutator, ctx: &RequestContext, input: &str) -> anyhow::Result<String> {
    let review: AdmissionReview<DynamicObject> =
        serde_json::from_str(input).context("failed to parse AdmissionReview")?;
    let req: AdmissionRequest<DynamicObject> = review
        .try_into()
        .context("AdmissionReview carries no request")?;

    let response = mutate_review(mutator, ctx, &req).await;
    info!(
        uid = %req.uid,
        kind = %req.kind.kind,
        name = %req.name,
        allowed = response.allowed,
        "Answered admission review"
    );
    Ok(serde_json::to_string_pretty(&response.into_review())?)
}

/// Run the mutate command
pub async fn run(config: &ExtensionConfig, args: MutateArgs) -> anyhow::Result<()> {
    let input = tokio::fs::read_to_string(&args.review)
        .await
        .with_context(|| format!("failed to read {}", args.review.display()))?;

    let client = super::seed_client().await?;
    let ensurer = build_ensurer(config, config.image_vector().await?, client.clone());
    let mutator = Mutator::new(ensurer, client, Codecs::default());

    let output = review(&mutator, &RequestContext::new(), &input).await?;
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use extensions_common::MockSeedClient;
    use serde_json::{json, Value};

    fn kcm_review() -> String {
        json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": "apps", "version": "v1", "kind": "Deployment"},
                "resource": {"group": "apps", "version": "v1", "resource": "deployments"},
                "name": "kube-controller-manager",
                "namespace": "shoot--foo--bar",
                "operation": "UPDATE",
                "userInfo": {},
                "object": {
                    "apiVersion": "apps/v1",
                    "kind": "Deployment",
                    "metadata": {"name": "kube-controller-manager"},
                    "spec": {
                        "selector": {},
                        "template": {
                            "spec": {
                                "containers": [{
                                    "name": "kube-controller-manager",
                                    "command": ["/hyperkube", "controller-manager"]
                                }]
                            }
                        }
                    }
                },
                "dryRun": false
            }
        })
        .to_string()
    }

    fn config(provider: &str) -> ExtensionConfig {
        ExtensionConfig::from_yaml(&format!("provider: {provider}")).unwrap()
    }

    fn mutator(provider: &str) -> Mutator {
        let client: Arc<dyn SeedClient> = Arc::new(MockSeedClient::new());
        let ensurer = build_ensurer(&config(provider), ImageVector::default(), client.clone());
        Mutator::new(ensurer, client, Codecs::default())
    }

    #[tokio::test]
    async fn story_packet_webhook_patches_the_controller_manager() {
        let output = review(&mutator("packet"), &RequestContext::new(), &kcm_review())
            .await
            .unwrap();

        let response: Value = serde_json::from_str(&output).unwrap();
        let response = &response["response"];
        assert_eq!(response["uid"], "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert_eq!(response["allowed"], true);
        assert_eq!(response["patchType"], "JSONPatch");
    }

    #[tokio::test]
    async fn providers_without_webhook_changes_allow_unchanged() {
        let output = review(&mutator("openstack"), &RequestContext::new(), &kcm_review())
            .await
            .unwrap();

        let response: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(response["response"]["allowed"], true);
        assert!(response["response"].get("patch").is_none());
    }

    #[tokio::test]
    async fn malformed_review_is_an_error() {
        let err = review(&mutator("azure"), &RequestContext::new(), "{}")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("AdmissionReview"));
    }
}
