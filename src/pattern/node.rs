//! Pattern nodes
//!
//! A pattern node is a JSON object with a required `__type__` tag. Reserved
//! keys:
//! - `__type__`: registry key of the object to build
//! - `__wrap__`: build a factory instead of an object
//! - `args` / `kwargs`: feed the variadic parameters
//!
//! Every other key is a field named after a constructor parameter. A field
//! whose value is `"__arg__"` is left for the factory's caller.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::BuildError;

/// Field value reserved for "filled in by the factory caller"
pub const LEAVE_FOR_CALLER: &str = "__arg__";

/// A parsed pattern node (transient: discarded after the build)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PatternNode {
    #[serde(rename = "__type__")]
    pub type_tag: String,
    #[serde(rename = "__wrap__", default)]
    pub deferred: bool,
    #[serde(rename = "args", default)]
    pub positional: Vec<Value>,
    #[serde(rename = "kwargs", default)]
    pub extra_keyed: Map<String, Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// How a raw field value is to be treated
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<'a> {
    /// The `"__arg__"` sentinel
    LeaveForCaller,
    /// A nested pattern to build recursively
    Node(PatternNode),
    /// Anything else; resolved by the parameter's semantic type
    Literal(&'a Value),
}

impl PatternNode {
    pub fn from_value(value: &Value) -> Result<Self, BuildError> {
        if !value.is_object() {
            return Err(BuildError::Malformed(format!(
                "expected an object, found {value}"
            )));
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn parse(json: &str) -> Result<Self, BuildError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// True for a JSON object carrying a `__type__` tag
pub fn is_node(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.contains_key("__type__"))
}

/// Classify a raw field value
pub fn classify(value: &Value) -> Result<Slot<'_>, BuildError> {
    if value.as_str() == Some(LEAVE_FOR_CALLER) {
        Ok(Slot::LeaveForCaller)
    } else if is_node(value) {
        Ok(Slot::Node(PatternNode::from_value(value)?))
    } else {
        Ok(Slot::Literal(value))
    }
}
