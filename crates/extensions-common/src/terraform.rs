//! Terraform state outputs
//!
//! Infrastructure actuators read the outputs of an applied Terraform
//! configuration as a flat name-to-value map and turn them into a provider
//! `InfrastructureStatus`.

use std::collections::BTreeMap;

use crate::{Error, Result};

/// Output variables of an applied Terraform state
pub type Outputs = BTreeMap<String, String>;

/// Value of output `key`, failing when the state does not have it
pub fn output_variable(outputs: &Outputs, key: &str) -> Result<String> {
    outputs
        .get(key)
        .cloned()
        .ok_or_else(|| Error::decode("terraform state", "outputs", format!("missing output '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_output_is_returned() {
        let outputs = Outputs::from([("vnet_name".to_string(), "vnet".to_string())]);
        assert_eq!(output_variable(&outputs, "vnet_name").unwrap(), "vnet");
    }

    #[test]
    fn missing_output_is_named() {
        let err = output_variable(&Outputs::new(), "subnet_id").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(err.to_string().contains("missing output 'subnet_id'"));
    }
}
