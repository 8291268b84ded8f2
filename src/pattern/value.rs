//! Values flowing through the builder
//!
//! `Arg` is a resolved argument, `Arguments` the bound argument list handed
//! to a constructor, `Built` whatever a constructor produces.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use glam::Vec2;
use serde_json::Value;

use super::BuildError;
use crate::settings::Tuning;
use crate::sim::color::Rgb;
use crate::sim::entity::{EmissionRule, Entity, Sprite, TargetRef, Targets};
use crate::sim::motion::MotionState;
use crate::sim::sequence::{Sequence, Stage};
use crate::sim::viewport::Rect;

/// What a constructor may read besides its arguments
pub struct Env<'a> {
    pub viewport: Rect,
    pub tuning: &'a Tuning,
    /// Current positions, for aimed emitters
    pub targets: &'a dyn Targets,
}

/// A resolved argument
#[derive(Debug, Clone)]
pub enum Arg {
    /// Literal passed through untouched
    Json(Value),
    Float(f64),
    Vec2(Vec2),
    Color(Rgb),
    /// Name of a collection known to exist
    Collection(String),
    /// Resolved entity reference (`None` for an explicit null)
    Target(Option<TargetRef>),
    Rules(Vec<EmissionRule>),
    Built(Built),
}

impl Arg {
    fn kind(&self) -> &'static str {
        match self {
            Arg::Json(Value::Null) => "null",
            Arg::Json(Value::Bool(_)) => "bool",
            Arg::Json(Value::Number(_)) | Arg::Float(_) => "number",
            Arg::Json(Value::String(_)) => "string",
            Arg::Json(Value::Array(_)) => "array",
            Arg::Json(Value::Object(_)) => "object",
            Arg::Vec2(_) => "vector",
            Arg::Color(_) => "color",
            Arg::Collection(_) => "collection",
            Arg::Target(_) => "entity",
            Arg::Rules(_) => "emission rules",
            Arg::Built(_) => "object",
        }
    }
}

/// A mover: position plus motion, not yet attached to a sprite
#[derive(Debug, Clone, PartialEq)]
pub struct Mover {
    pub position: Vec2,
    pub motion: MotionState,
}

/// Output of a constructor
#[derive(Debug, Clone)]
pub enum Built {
    Mover(Mover),
    Sprite(Sprite),
    /// A fired bullet pattern
    Danmaku(Vec<Entity>),
    Entity(Entity),
    Stage(Stage),
    Sequence(Sequence),
    /// Deferred construction
    Factory(Factory),
}

impl Built {
    pub fn kind(&self) -> &'static str {
        match self {
            Built::Mover(_) => "mover",
            Built::Sprite(_) => "sprite",
            Built::Danmaku(_) => "danmaku",
            Built::Entity(_) => "entity",
            Built::Stage(_) => "stage",
            Built::Sequence(_) => "sequence",
            Built::Factory(_) => "factory",
        }
    }
}

type FactoryFn = dyn Fn(Vec<Arg>, &Env<'_>) -> Result<Built, BuildError>;

/// Deferred constructor: the leading arguments fill the node's
/// `"__arg__"` slots in the order they were declared
#[derive(Clone)]
pub struct Factory(Rc<FactoryFn>);

impl Factory {
    pub fn new(f: impl Fn(Vec<Arg>, &Env<'_>) -> Result<Built, BuildError> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, leading: Vec<Arg>, env: &Env<'_>) -> Result<Built, BuildError> {
        (self.0)(leading, env)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Factory(..)")
    }
}

/// Arguments bound for one constructor call
#[derive(Debug, Clone)]
pub struct Arguments {
    type_tag: &'static str,
    /// Parameters without a default, in declared order
    positional: Vec<(&'static str, Option<Arg>)>,
    /// Parameters with a default that the node supplied
    keyword: HashMap<&'static str, Option<Arg>>,
    variadic: Vec<Arg>,
    variadic_keyword: BTreeMap<String, Arg>,
    /// Slots left for the factory caller, in encounter order
    holes: Vec<&'static str>,
}

impl Arguments {
    pub fn new(type_tag: &'static str) -> Self {
        Self {
            type_tag,
            positional: Vec::new(),
            keyword: HashMap::new(),
            variadic: Vec::new(),
            variadic_keyword: BTreeMap::new(),
            holes: Vec::new(),
        }
    }

    pub fn type_tag(&self) -> &'static str {
        self.type_tag
    }

    pub fn push_positional(&mut self, name: &'static str, arg: Option<Arg>) {
        if arg.is_none() {
            self.holes.push(name);
        }
        self.positional.push((name, arg));
    }

    pub fn insert_keyword(&mut self, name: &'static str, arg: Option<Arg>) {
        if arg.is_none() {
            self.holes.push(name);
        }
        self.keyword.insert(name, arg);
    }

    pub fn push_variadic(&mut self, arg: Arg) {
        self.variadic.push(arg);
    }

    pub fn insert_variadic_keyword(&mut self, name: String, arg: Arg) {
        self.variadic_keyword.insert(name, arg);
    }

    /// Number of slots still waiting for the factory caller
    pub fn hole_count(&self) -> usize {
        self.holes.len()
    }

    /// Fill the caller-supplied slots with `leading`, in order
    pub fn fill(&mut self, leading: Vec<Arg>) -> Result<(), BuildError> {
        if leading.len() > self.holes.len() {
            return Err(BuildError::invalid(
                self.type_tag,
                format!(
                    "factory takes {} leading argument(s), got {}",
                    self.holes.len(),
                    leading.len()
                ),
            ));
        }

        let mut leading = leading.into_iter();
        for name in std::mem::take(&mut self.holes) {
            let arg = leading
                .next()
                .ok_or_else(|| BuildError::UnfilledSlot { field: name.to_string() })?;
            if let Some(slot) = self.positional.iter_mut().find(|(n, _)| *n == name) {
                slot.1 = Some(arg);
            } else if let Some(slot) = self.keyword.get_mut(name) {
                *slot = Some(arg);
            }
        }
        Ok(())
    }

    /// Look up a named argument (`Ok(None)` if it was omitted)
    pub fn get(&self, name: &str) -> Result<Option<&Arg>, BuildError> {
        let slot = self
            .positional
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, arg)| arg)
            .or_else(|| self.keyword.get(name));
        match slot {
            None => Ok(None),
            Some(Some(arg)) => Ok(Some(arg)),
            Some(None) => Err(BuildError::UnfilledSlot {
                field: name.to_string(),
            }),
        }
    }

    pub fn required(&self, name: &str) -> Result<&Arg, BuildError> {
        self.get(name)?.ok_or_else(|| BuildError::MissingField {
            type_tag: self.type_tag.to_string(),
            field: name.to_string(),
        })
    }

    pub fn variadic(&self) -> &[Arg] {
        &self.variadic
    }

    pub fn variadic_keyword(&self) -> &BTreeMap<String, Arg> {
        &self.variadic_keyword
    }

    pub fn float(&self, name: &str) -> Result<f32, BuildError> {
        as_f32(name, self.required(name)?)
    }

    /// Number, or `default` when omitted or null
    pub fn float_or(&self, name: &str, default: f32) -> Result<f32, BuildError> {
        match self.get(name)? {
            None | Some(Arg::Json(Value::Null)) => Ok(default),
            Some(arg) => as_f32(name, arg),
        }
    }

    /// Non-negative integer
    pub fn count(&self, name: &str) -> Result<usize, BuildError> {
        as_count(name, self.required(name)?)
    }

    pub fn vec2(&self, name: &str) -> Result<Vec2, BuildError> {
        match self.required(name)? {
            Arg::Vec2(v) => Ok(*v),
            other => Err(mismatch(name, "vector", other)),
        }
    }

    pub fn color(&self, name: &str) -> Result<Rgb, BuildError> {
        match self.required(name)? {
            Arg::Color(c) => Ok(*c),
            other => Err(mismatch(name, "color", other)),
        }
    }

    pub fn collection(&self, name: &str) -> Result<String, BuildError> {
        match self.required(name)? {
            Arg::Collection(c) => Ok(c.clone()),
            other => Err(mismatch(name, "collection", other)),
        }
    }

    /// Optional entity reference (omitted and null both mean none)
    pub fn target(&self, name: &str) -> Result<Option<TargetRef>, BuildError> {
        match self.get(name)? {
            None | Some(Arg::Json(Value::Null)) => Ok(None),
            Some(Arg::Target(t)) => Ok(t.clone()),
            Some(other) => Err(mismatch(name, "entity", other)),
        }
    }

    pub fn rules(&self, name: &str) -> Result<Vec<EmissionRule>, BuildError> {
        match self.required(name)? {
            Arg::Rules(rules) => Ok(rules.clone()),
            other => Err(mismatch(name, "emission rules", other)),
        }
    }

    pub fn built(&self, name: &str) -> Result<Built, BuildError> {
        match self.required(name)? {
            Arg::Built(b) => Ok(b.clone()),
            other => Err(mismatch(name, "nested pattern", other)),
        }
    }

    pub fn mover(&self, name: &str) -> Result<Mover, BuildError> {
        match self.built(name)? {
            Built::Mover(m) => Ok(m),
            other => Err(BuildError::invalid(
                name,
                format!("expected a mover, found {}", other.kind()),
            )),
        }
    }

    pub fn sprite(&self, name: &str) -> Result<Sprite, BuildError> {
        match self.built(name)? {
            Built::Sprite(s) => Ok(s),
            other => Err(BuildError::invalid(
                name,
                format!("expected an image, found {}", other.kind()),
            )),
        }
    }
}

fn mismatch(name: &str, expected: &str, found: &Arg) -> BuildError {
    BuildError::invalid(name, format!("expected {expected}, found {}", found.kind()))
}

pub(crate) fn as_f32(name: &str, arg: &Arg) -> Result<f32, BuildError> {
    match arg {
        Arg::Float(f) => Ok(*f as f32),
        Arg::Json(v) => v
            .as_f64()
            .map(|f| f as f32)
            .ok_or_else(|| mismatch(name, "number", arg)),
        other => Err(mismatch(name, "number", other)),
    }
}

pub(crate) fn as_count(name: &str, arg: &Arg) -> Result<usize, BuildError> {
    match arg {
        Arg::Json(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| BuildError::invalid(name, "expected a non-negative integer")),
        other => Err(mismatch(name, "integer", other)),
    }
}
