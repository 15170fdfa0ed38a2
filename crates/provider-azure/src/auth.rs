//! Azure service principal from the cloud provider secret

use extensions_common::{Error, ObjectKey, RequestContext, Result, SeedClient};
use k8s_openapi::api::core::v1::{Secret, SecretReference};
use tracing::debug;

use crate::{CLIENT_ID, CLIENT_SECRET, SUBSCRIPTION_ID, TENANT_ID};

/// Service principal credentials of a shoot
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ClientAuth {
    /// Subscription the shoot lives in
    pub subscription_id: String,
    /// Azure AD tenant
    pub tenant_id: String,
    /// Service principal ID
    pub client_id: String,
    /// Service principal secret
    pub client_secret: String,
}

impl std::fmt::Debug for ClientAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientAuth")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl ClientAuth {
    /// Read the service principal from `secret`
    pub fn from_secret(secret: &Secret, key: &ObjectKey) -> Result<Self> {
        let data = secret.data.as_ref();
        let field = |name: &str| -> Result<String> {
            let value = data
                .and_then(|d| d.get(name))
                .ok_or_else(|| Error::validation(format!("missing {name} field in secret '{key}'")))?;
            String::from_utf8(value.0.clone())
                .map_err(|e| Error::decode(name, format!("secret '{key}'"), e))
        };
        Ok(Self {
            subscription_id: field(SUBSCRIPTION_ID)?,
            tenant_id: field(TENANT_ID)?,
            client_id: field(CLIENT_ID)?,
            client_secret: field(CLIENT_SECRET)?,
        })
    }
}

/// Fetch and read the secret `reference` points at
pub async fn get_client_auth(
    ctx: &RequestContext,
    client: &dyn SeedClient,
    reference: &SecretReference,
    default_namespace: &str,
) -> Result<ClientAuth> {
    let key = ObjectKey::from_secret_ref(reference, default_namespace);
    debug!(secret = %key, "Reading Azure service principal");
    let secret = client.get_secret(ctx, &key).await?;
    ClientAuth::from_secret(&secret, &key)
}
