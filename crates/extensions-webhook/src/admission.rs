//! AdmissionReview adapter for the [`Mutator`]
//!
//! Translates one admission request into a typed [`Object`], runs the
//! mutator, and answers with a JSON patch of the difference. Serving the
//! webhook over HTTPS is left to the hosting process.

use extensions_common::{Error, RequestContext, Result};
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::genericmutator::{Mutator, Object};

/// Mutate the object of an admission request
///
/// Requests without an object are allowed unchanged. Mutation errors deny the
/// request with the error message.
pub async fn mutate_review(
    mutator: &Mutator,
    ctx: &RequestContext,
    req: &AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    let uid = req.uid.as_str();
    let Some(obj) = &req.object else {
        debug!(uid = %uid, "No object in request, allowing unchanged");
        return AdmissionResponse::from(req);
    };

    let mut obj = obj.clone();
    if obj.metadata.namespace.is_none() {
        obj.metadata.namespace = req.namespace.clone();
    }

    let result = async {
        let typed = into_object(&req.kind.kind, obj)?;
        let before = to_value(&typed)?;
        let mutated = mutator.mutate(ctx, typed).await?;
        let after = to_value(&mutated)?;
        Ok::<_, Error>(json_patch::diff(&before, &after))
    }
    .await;

    let patch = match result {
        Ok(patch) => patch,
        Err(e) => {
            error!(
                uid = %uid,
                kind = %req.kind.kind,
                namespace = ?req.namespace,
                name = %req.name,
                error = %e,
                "Mutation failed, denying request"
            );
            return AdmissionResponse::from(req).deny(e.to_string());
        }
    };

    if patch.0.is_empty() {
        debug!(uid = %uid, kind = %req.kind.kind, name = %req.name, "Object unchanged");
        return AdmissionResponse::from(req);
    }

    info!(
        uid = %uid,
        kind = %req.kind.kind,
        namespace = ?req.namespace,
        name = %req.name,
        patch_ops = patch.0.len(),
        "Patching object"
    );
    match AdmissionResponse::from(req).with_patch(patch) {
        Ok(response) => response,
        Err(e) => {
            error!(uid = %uid, error = %e, "Failed to serialize patch");
            AdmissionResponse::from(req).deny(format!("patch serialization error: {e}"))
        }
    }
}

/// Decode a dynamic object into the typed variant for `kind`
pub fn into_object(kind: &str, obj: DynamicObject) -> Result<Object> {
    let value = || serde_json::to_value(&obj).map_err(|e| Error::encode(kind, e));
    let typed = match kind {
        "Service" => Object::Service(from_value(kind, value()?)?),
        "Deployment" => Object::Deployment(from_value(kind, value()?)?),
        "StatefulSet" => Object::StatefulSet(from_value(kind, value()?)?),
        "OperatingSystemConfig" => Object::OperatingSystemConfig(from_value(kind, value()?)?),
        _ => Object::Other(obj),
    };
    Ok(typed)
}

fn from_value<T: serde::de::DeserializeOwned>(kind: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::decode("object", kind, e))
}

/// JSON form of a typed object
pub fn to_value(obj: &Object) -> Result<Value> {
    let value = match obj {
        Object::Service(o) => serde_json::to_value(o),
        Object::Deployment(o) => serde_json::to_value(o),
        Object::StatefulSet(o) => serde_json::to_value(o),
        Object::OperatingSystemConfig(o) => serde_json::to_value(o),
        Object::Other(o) => serde_json::to_value(o),
    };
    value.map_err(|e| Error::encode(obj.kind().to_string(), e))
}
