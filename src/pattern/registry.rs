//! Type registry: type tag -> constructor descriptor

use std::collections::HashMap;

use serde_json::Value;

use super::value::{Arguments, Built, Env};
use super::BuildError;

/// How a parameter is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Positional,
    Keyword,
    /// Collects the node's `args` list
    VariadicPositional,
    /// Collects the node's `kwargs` map
    VariadicKeyword,
}

/// How a raw field value is resolved before the constructor sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    /// Passed through untouched
    Any,
    Number,
    Integer,
    /// Literal `[x, y]` pair
    Vector,
    /// Position: literal pair, anchor or random placement
    Coordinate,
    Color,
    /// Multiples of π
    Angle,
    /// Name of an existing collection
    Collection,
    /// Name of a tracked entity (null = none)
    Entity,
    /// Nested pattern node
    Object,
    /// List of deferred nodes each carrying a `refresh` field
    EmissionRules,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: Option<Value>,
    pub semantic: SemanticType,
}

impl ParamSpec {
    pub fn required(name: &'static str, semantic: SemanticType) -> Self {
        Self {
            name,
            kind: ParamKind::Positional,
            default: None,
            semantic,
        }
    }

    pub fn optional(name: &'static str, semantic: SemanticType, default: Value) -> Self {
        Self {
            name,
            kind: ParamKind::Keyword,
            default: Some(default),
            semantic,
        }
    }

    pub fn variadic(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::VariadicPositional,
            default: None,
            semantic: SemanticType::Any,
        }
    }

    pub fn variadic_keyword(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::VariadicKeyword,
            default: None,
            semantic: SemanticType::Any,
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

pub type ConstructFn = fn(Arguments, &Env<'_>) -> Result<Built, BuildError>;

/// Everything the builder needs to know about one buildable type
#[derive(Debug, Clone)]
pub struct ConstructorSpec {
    pub type_tag: &'static str,
    pub params: Vec<ParamSpec>,
    pub construct: ConstructFn,
}

impl ConstructorSpec {
    pub fn new(type_tag: &'static str, params: Vec<ParamSpec>, construct: ConstructFn) -> Self {
        Self {
            type_tag,
            params,
            construct,
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Registry of buildable types
#[derive(Debug, Clone, Default)]
pub struct Registry {
    specs: HashMap<String, ConstructorSpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in type
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for (tag, spec) in super::constructors::standard_specs() {
            if let Err(e) = registry.register(tag, spec) {
                log::error!("Built-in registry: {e}");
            }
        }
        registry
    }

    pub fn register(&mut self, tag: &str, spec: ConstructorSpec) -> Result<(), BuildError> {
        if self.specs.contains_key(tag) {
            return Err(BuildError::DuplicateType(tag.to_string()));
        }
        self.specs.insert(tag.to_string(), spec);
        Ok(())
    }

    pub fn lookup(&self, tag: &str) -> Result<&ConstructorSpec, BuildError> {
        self.specs
            .get(tag)
            .ok_or_else(|| BuildError::UnknownType(tag.to_string()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.specs.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
