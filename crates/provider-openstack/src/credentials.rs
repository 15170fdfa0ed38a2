//! OpenStack credentials from the cloud provider secret

use extensions_common::{Error, ObjectKey, RequestContext, Result, SeedClient};
use k8s_openapi::api::core::v1::{Secret, SecretReference};

use crate::{DOMAIN_NAME, PASSWORD, TENANT_NAME, USER_NAME};

/// Keystone credentials of a shoot
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Keystone domain
    pub domain_name: String,
    /// Keystone project
    pub tenant_name: String,
    /// User name
    pub username: String,
    /// Password
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("domain_name", &self.domain_name)
            .field("tenant_name", &self.tenant_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read the credentials from `secret`; every field is required
    pub fn from_secret(secret: &Secret, key: &ObjectKey) -> Result<Self> {
        let field = |name: &str| -> Result<String> {
            let value = secret
                .data
                .as_ref()
                .and_then(|d| d.get(name))
                .ok_or_else(|| Error::validation(format!("missing {name} field in secret '{key}'")))?;
            String::from_utf8(value.0.clone()).map_err(|e| {
                Error::decode(name, format!("secret '{key}'"), e)
            })
        };
        Ok(Self {
            domain_name: field(DOMAIN_NAME)?,
            tenant_name: field(TENANT_NAME)?,
            username: field(USER_NAME)?,
            password: field(PASSWORD)?,
        })
    }
}

/// Fetch and read the secret `reference` points at
pub async fn get_credentials(
    ctx: &RequestContext,
    client: &dyn SeedClient,
    reference: &SecretReference,
    default_namespace: &str,
) -> Result<Credentials> {
    let key = ObjectKey::from_secret_ref(reference, default_namespace);
    let secret = client.get_secret(ctx, &key).await?;
    Credentials::from_secret(&secret, &key)
}
