//! Azure provider extension
//!
//! Computes the Terraform variables of the shoot infrastructure (resource
//! group, virtual network, availability set) and the provider status of the
//! applied state.

#![deny(missing_docs)]

pub mod apis;
pub mod auth;
pub mod infrastructure;

pub use auth::ClientAuth;

/// Key of the subscription ID in the cloud provider secret
pub const SUBSCRIPTION_ID: &str = "subscriptionID";

/// Key of the tenant ID in the cloud provider secret
pub const TENANT_ID: &str = "tenantID";

/// Key of the client ID in the cloud provider secret
pub const CLIENT_ID: &str = "clientID";

/// Key of the client secret in the cloud provider secret
pub const CLIENT_SECRET: &str = "clientSecret";
