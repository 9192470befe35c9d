// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Component model: the buildable node handed to a [`crate::BuildSession`].
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::ident::{make_variant_id, Identity, VariantId};

/// Variant-specific attributes of a component.
///
/// Each variant is a plain data type; the set of variants is open. The
/// variant tag is derived from [`ComponentKind::NAME`], so two kinds must not
/// share a name.
pub trait ComponentKind: Any + Send + Sync + fmt::Debug {
    /// Human-readable variant name, also the input to the variant id.
    const NAME: &'static str;

    /// Stable variant identifier for this kind.
    fn variant_id() -> VariantId {
        make_variant_id(Self::NAME)
    }
}

/// Value carried by a [`Parameter`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-model", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterValue {
    /// Free-form text.
    Text(String),
    /// Floating point measurement.
    Number(f64),
    /// Integral value.
    Integer(i64),
    /// Boolean switch.
    Flag(bool),
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// Named parameter applied to the created object after creation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-model", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameter {
    /// Parameter name as understood by the target document.
    pub name: String,
    /// Parameter value.
    pub value: ParameterValue,
}

impl Parameter {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Description of one element to be materialised in the target document.
///
/// Invariants
/// - `identity` is non-empty (guaranteed by [`Identity`]) and unique within a
///   build session (enforced at registration time).
/// - The component is read-only to the build core; cloning is cheap because
///   the variant attributes are shared.
#[derive(Clone)]
pub struct Component {
    identity: Identity,
    reference: Option<Identity>,
    parameters: Vec<Parameter>,
    variant: VariantId,
    variant_name: &'static str,
    attributes: Arc<dyn Any + Send + Sync>,
}

impl Component {
    /// Creates a component of variant `K` without a reference or parameters.
    pub fn new<K: ComponentKind>(identity: Identity, attributes: K) -> Self {
        Self {
            identity,
            reference: None,
            parameters: Vec::new(),
            variant: K::variant_id(),
            variant_name: K::NAME,
            attributes: Arc::new(attributes),
        }
    }

    /// Declares a dependency on the component registered under `reference`.
    pub fn with_reference(mut self, reference: Identity) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Appends a parameter to apply after creation.
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Identity of this component.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Identity of the component this one references, if any.
    pub fn reference(&self) -> Option<&Identity> {
        self.reference.as_ref()
    }

    /// Parameters in declaration order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Variant tag used for dispatch.
    pub fn variant(&self) -> VariantId {
        self.variant
    }

    /// Variant name (diagnostics and metadata).
    pub fn variant_name(&self) -> &'static str {
        self.variant_name
    }

    /// Returns the variant attributes when the component is of kind `K`.
    pub fn attributes<K: ComponentKind>(&self) -> Option<&K> {
        self.attributes.downcast_ref::<K>()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("identity", &self.identity)
            .field("reference", &self.reference)
            .field("variant", &self.variant_name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}


#[cfg(all(test, feature = "serde-model"))]
#[allow(clippy::unwrap_used)]
mod serde_tests {
    use super::*;

    #[test]
    fn parameters_round_trip_through_json() {
        let params = vec![
            Parameter::new("Mark", "B-01"),
            Parameter::new("Length", 4.5),
            Parameter::new("Count", 3_i64),
            Parameter::new("Structural", true),
        ];
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(serde_json::from_str::<Vec<Parameter>>(&json).unwrap(), params);
    }
}
