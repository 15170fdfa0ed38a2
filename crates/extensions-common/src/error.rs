//! Error types for the provider extensions
//!
//! Errors carry the resource they concern so that a denied admission request
//! or a failed values computation points at the offending object.

use thiserror::Error;

/// Main error type for extension operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Malformed or missing embedded configuration of a resource
    #[error("could not decode {what} of {resource}: {message}")]
    Decode {
        /// Which part of the resource failed to decode (e.g. "providerConfig")
        what: String,
        /// The offending resource as `kind 'namespace/name'`
        resource: String,
        /// Description of what failed
        message: String,
    },

    /// A referenced object does not exist
    #[error("{kind} '{key}' not found")]
    NotFound {
        /// Kind of the missing object
        kind: String,
        /// `namespace/name` of the missing object
        key: String,
    },

    /// No image in the image vector matches a name and version
    #[error("could not find image {name}: {message}")]
    Image {
        /// Image name that was requested
        name: String,
        /// Why no image matched
        message: String,
    },

    /// Re-serializing a mutated intermediate representation failed
    #[error("could not encode {what}: {message}")]
    Encode {
        /// What was being encoded (e.g. "kubelet configuration")
        what: String,
        /// Description of what failed
        message: String,
    },

    /// Semantically invalid input
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
    },

    /// The request was cancelled before an external call completed
    #[error("request cancelled")]
    Cancelled,
}

impl Error {
    /// Create a decode error for a part of a resource
    pub fn decode(
        what: impl Into<String>,
        resource: impl Into<String>,
        msg: impl ToString,
    ) -> Self {
        Self::Decode {
            what: what.into(),
            resource: resource.into(),
            message: msg.to_string(),
        }
    }

    /// Create a not-found error for a namespaced or cluster-scoped object
    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Create an image resolution error
    pub fn image(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Image {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create an encode error
    pub fn encode(what: impl Into<String>, msg: impl ToString) -> Self {
        Self::Encode {
            what: what.into(),
            message: msg.to_string(),
        }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Check if the error reports a missing object
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
