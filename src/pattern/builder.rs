//! Object builder: pattern node -> built value or deferred factory
//!
//! The builder walks a constructor's declared parameters in order, resolves
//! each field by its semantic type and either calls the constructor right
//! away or, for a `__wrap__` node, returns a `Factory` that fills the
//! `"__arg__"` slots from its caller's arguments first.

use std::f64::consts::PI;

use rand::RngCore;
use serde_json::Value;

use super::node::{PatternNode, Slot, classify};
use super::registry::{ParamKind, ParamSpec, Registry, SemanticType};
use super::value::{Arg, Arguments, Built, Env, Factory};
use super::BuildError;
use crate::settings::Tuning;
use crate::sim::color::resolve_color;
use crate::sim::entity::{EmissionRule, EntityId, Period, TargetRef, Targets};
use crate::sim::viewport::{Rect, literal_pair, resolve_position};

/// Build context supplied by the caller
pub trait Scene {
    fn viewport(&self) -> Rect;
    fn has_collection(&self, name: &str) -> bool;
    fn named_entity(&self, name: &str) -> Option<EntityId>;
    /// Current entity positions
    fn targets(&self) -> &dyn Targets;
}

/// Builds pattern nodes against a registry
pub struct ObjectBuilder<'a> {
    registry: &'a Registry,
    tuning: &'a Tuning,
}

impl<'a> ObjectBuilder<'a> {
    pub fn new(registry: &'a Registry, tuning: &'a Tuning) -> Self {
        Self { registry, tuning }
    }

    /// Build one node; any failure aborts the whole build
    pub fn build(
        &self,
        node: &PatternNode,
        scene: &dyn Scene,
        rng: &mut dyn RngCore,
    ) -> Result<Built, BuildError> {
        let spec = self.registry.lookup(&node.type_tag)?;
        let mut args = Arguments::new(spec.type_tag);

        for param in &spec.params {
            match param.kind {
                ParamKind::VariadicPositional => {
                    for value in &node.positional {
                        let arg = self.resolve_loose(value, scene, rng)?;
                        args.push_variadic(arg);
                    }
                }
                ParamKind::VariadicKeyword => {
                    for (key, value) in &node.extra_keyed {
                        let arg = self.resolve_loose(value, scene, rng)?;
                        args.insert_variadic_keyword(key.clone(), arg);
                    }
                }
                ParamKind::Positional | ParamKind::Keyword => {
                    let Some(raw) = node.field(param.name) else {
                        if param.has_default() {
                            continue;
                        }
                        return Err(BuildError::MissingField {
                            type_tag: node.type_tag.clone(),
                            field: param.name.to_string(),
                        });
                    };

                    let arg = match classify(raw)? {
                        Slot::LeaveForCaller => {
                            if !node.deferred {
                                return Err(BuildError::SentinelNotDeferred {
                                    field: param.name.to_string(),
                                });
                            }
                            None
                        }
                        Slot::Node(child) => Some(Arg::Built(self.build(&child, scene, rng)?)),
                        Slot::Literal(value) => Some(self.resolve(param, value, scene, rng)?),
                    };

                    if param.has_default() {
                        args.insert_keyword(param.name, arg);
                    } else {
                        args.push_positional(param.name, arg);
                    }
                }
            }
        }

        let construct = spec.construct;
        if !node.deferred {
            let env = Env {
                viewport: scene.viewport(),
                tuning: self.tuning,
                targets: scene.targets(),
            };
            return construct(args, &env);
        }

        log::debug!(
            "Deferred {} with {} caller slot(s)",
            node.type_tag,
            args.hole_count()
        );
        Ok(Built::Factory(Factory::new(move |leading, env| {
            let mut args = args.clone();
            args.fill(leading)?;
            construct(args, env)
        })))
    }

    /// Resolve a literal by the parameter's semantic type
    fn resolve(
        &self,
        param: &ParamSpec,
        value: &Value,
        scene: &dyn Scene,
        rng: &mut dyn RngCore,
    ) -> Result<Arg, BuildError> {
        let field = param.name;
        let arg = match param.semantic {
            SemanticType::Any => Arg::Json(value.clone()),
            SemanticType::Number => {
                if !value.is_number() && !value.is_null() {
                    return Err(BuildError::invalid(field, format!("expected a number, found {value}")));
                }
                Arg::Json(value.clone())
            }
            SemanticType::Integer => {
                if !value.is_i64() && !value.is_u64() {
                    return Err(BuildError::invalid(field, format!("expected an integer, found {value}")));
                }
                Arg::Json(value.clone())
            }
            SemanticType::Vector => Arg::Vec2(
                literal_pair(value).ok_or_else(|| BuildError::BadCoordinate(value.to_string()))?,
            ),
            SemanticType::Coordinate => Arg::Vec2(resolve_position(value, &scene.viewport(), rng)?),
            SemanticType::Color => Arg::Color(resolve_color(value)?),
            SemanticType::Angle => {
                let turns = value
                    .as_f64()
                    .ok_or_else(|| BuildError::invalid(field, format!("expected an angle, found {value}")))?;
                Arg::Float(turns * PI)
            }
            SemanticType::Collection => {
                let name = value
                    .as_str()
                    .ok_or_else(|| BuildError::invalid(field, "expected a collection name"))?;
                if !scene.has_collection(name) {
                    return Err(BuildError::UnknownCollection(name.to_string()));
                }
                Arg::Collection(name.to_string())
            }
            SemanticType::Entity => match value {
                Value::Null => Arg::Target(None),
                Value::String(name) => {
                    let id = scene
                        .named_entity(name)
                        .ok_or_else(|| BuildError::UnknownEntity(name.clone()))?;
                    Arg::Target(Some(TargetRef {
                        name: name.clone(),
                        id,
                    }))
                }
                _ => return Err(BuildError::invalid(field, "expected an entity name or null")),
            },
            SemanticType::Object => {
                return Err(BuildError::invalid(
                    field,
                    format!("expected a nested pattern, found {value}"),
                ));
            }
            SemanticType::EmissionRules => Arg::Rules(self.emission_rules(field, value, scene, rng)?),
        };
        Ok(arg)
    }

    /// Each rule is a deferred node with an integer `refresh` (-1 = on destruction)
    fn emission_rules(
        &self,
        field: &str,
        value: &Value,
        scene: &dyn Scene,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<EmissionRule>, BuildError> {
        let items = value
            .as_array()
            .ok_or_else(|| BuildError::invalid(field, "expected a list of emission rules"))?;

        items
            .iter()
            .map(|item| {
                let Slot::Node(node) = classify(item)? else {
                    return Err(BuildError::invalid(field, "emission rule must be a pattern"));
                };
                let refresh = node
                    .field("refresh")
                    .ok_or_else(|| BuildError::MissingField {
                        type_tag: node.type_tag.clone(),
                        field: "refresh".to_string(),
                    })?
                    .as_i64()
                    .ok_or_else(|| BuildError::invalid("refresh", "expected an integer"))?;
                let period = Period::from_refresh(refresh).ok_or_else(|| {
                    BuildError::invalid("refresh", format!("{refresh} is neither positive nor -1"))
                })?;
                match self.build(&node, scene, rng)? {
                    Built::Factory(factory) => Ok(EmissionRule { period, factory }),
                    other => Err(BuildError::invalid(
                        field,
                        format!("emission rule built a {}, set __wrap__", other.kind()),
                    )),
                }
            })
            .collect()
    }

    /// Variadic entries: nested nodes are built, everything else passes through
    fn resolve_loose(
        &self,
        value: &Value,
        scene: &dyn Scene,
        rng: &mut dyn RngCore,
    ) -> Result<Arg, BuildError> {
        match classify(value)? {
            Slot::Node(child) => Ok(Arg::Built(self.build(&child, scene, rng)?)),
            Slot::LeaveForCaller => Err(BuildError::SentinelNotDeferred {
                field: "args".to_string(),
            }),
            Slot::Literal(v) => Ok(Arg::Json(v.clone())),
        }
    }
}

/// Fixed build context for tests
#[cfg(test)]
pub(crate) struct TestScene {
    pub viewport: Rect,
    pub collections: Vec<&'static str>,
    pub named: Vec<(&'static str, EntityId)>,
    pub targets: crate::sim::entity::TargetSnapshot,
}

#[cfg(test)]
impl TestScene {
    pub fn new() -> Self {
        Self {
            viewport: Rect::from_size(800.0, 600.0),
            collections: vec!["enemy", "danmaku"],
            named: vec![("player", EntityId(1))],
            targets: Default::default(),
        }
    }
}

#[cfg(test)]
impl Scene for TestScene {
    fn viewport(&self) -> Rect {
        self.viewport
    }

    fn has_collection(&self, name: &str) -> bool {
        self.collections.contains(&name)
    }

    fn named_entity(&self, name: &str) -> Option<EntityId> {
        self.named.iter().find(|(n, _)| *n == name).map(|(_, id)| *id)
    }

    fn targets(&self) -> &dyn Targets {
        &self.targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::ErrorKind;
    use crate::sim::motion::MotionState;
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use serde_json::json;

    fn build(json: Value) -> Result<Built, BuildError> {
        let registry = Registry::standard();
        let tuning = Tuning::default();
        let builder = ObjectBuilder::new(&registry, &tuning);
        let node = PatternNode::from_value(&json)?;
        builder.build(&node, &TestScene::new(), &mut Pcg32::seed_from_u64(7))
    }

    fn block() -> Value {
        json!({"__type__": "Block", "width": 4, "height": 4, "color": "__red__"})
    }

    #[test]
    fn test_unknown_type() {
        let err = build(json!({"__type__": "Laser"})).unwrap_err();
        assert_eq!(err, BuildError::UnknownType("Laser".into()));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_missing_required_field() {
        let err = build(json!({"__type__": "Radial", "pos": [0, 0], "vel": 1, "offset": 0, "image": block()}))
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingField { ref field, .. } if field == "N"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_defaults_applied() {
        let built = build(json!({
            "__type__": "Burst", "pos": "__center__", "vel": 2,
            "baseN": 4, "N": 1, "image": block()
        }))
        .unwrap();
        let Built::Danmaku(bullets) = built else {
            panic!("expected danmaku");
        };
        assert_eq!(bullets.len(), 1);
        // default direction is π/2, no tracking
        let vel = bullets[0].motion.velocity();
        assert!((vel - Vec2::new(0.0, 2.0)).length() < 1e-4);
        assert!(matches!(bullets[0].motion, MotionState::Velocity { .. }));
        assert_eq!(bullets[0].position, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn test_angle_in_multiples_of_pi() {
        let built = build(json!({
            "__type__": "Burst", "pos": [0, 0], "vel": 1,
            "baseN": 4, "N": 1, "image": block(), "direction": 1
        }))
        .unwrap();
        let Built::Danmaku(bullets) = built else {
            panic!("expected danmaku");
        };
        assert!((bullets[0].motion.velocity() - Vec2::new(-1.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_lookup_errors() {
        let err = build(json!({
            "__type__": "Radial", "pos": [0, 0], "vel": 1, "N": 3, "offset": 0,
            "image": block(), "track": "boss"
        }))
        .unwrap_err();
        assert_eq!(err, BuildError::UnknownEntity("boss".into()));
        assert_eq!(err.kind(), ErrorKind::Lookup);

        let err = build(json!({
            "__type__": "Gen",
            "mover": {"__type__": "Static", "pos": [0, 0]},
            "image": block(), "group": "lasers", "danmaku": []
        }))
        .unwrap_err();
        assert_eq!(err, BuildError::UnknownCollection("lasers".into()));
        assert_eq!(err.kind(), ErrorKind::Lookup);
    }

    #[test]
    fn test_tracking_resolves_named_entity() {
        let built = build(json!({
            "__type__": "Radial", "pos": [0, 0], "vel": 1, "N": 2, "offset": 0,
            "image": block(), "track": "player"
        }))
        .unwrap();
        let Built::Danmaku(bullets) = built else {
            panic!("expected danmaku");
        };
        assert!(bullets.iter().all(|b| matches!(
            &b.motion,
            MotionState::Homing(h) if h.target == EntityId(1)
        )));
    }

    #[test]
    fn test_bad_tokens() {
        let err = build(json!({"__type__": "Static", "pos": "__nowhere__"})).unwrap_err();
        assert!(matches!(err, BuildError::BadCoordinate(_)));
        let err = build(json!({"__type__": "Block", "width": 1, "height": 1, "color": [1, 2]}))
            .unwrap_err();
        assert!(matches!(err, BuildError::BadColor(_)));
        let err = build(json!({"__type__": "Block", "width": 1.5, "height": 1, "color": [1, 2, 3]}))
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidValue { .. }));
    }

    #[test]
    fn test_sentinel_requires_deferred() {
        let err = build(json!({"__type__": "Static", "pos": "__arg__"})).unwrap_err();
        assert!(matches!(err, BuildError::SentinelNotDeferred { .. }));
    }

    #[test]
    fn test_deferred_factory_fills_position() {
        let built = build(json!({
            "__type__": "Radial", "__wrap__": true, "pos": "__arg__",
            "vel": 1, "N": 4, "offset": 0, "image": block()
        }))
        .unwrap();
        let Built::Factory(factory) = built else {
            panic!("expected a factory");
        };

        let scene = TestScene::new();
        let tuning = Tuning::default();
        let env = Env {
            viewport: scene.viewport,
            tuning: &tuning,
            targets: &scene.targets,
        };
        let origin = Vec2::new(10.0, 20.0);
        let Built::Danmaku(bullets) = factory.call(vec![Arg::Vec2(origin)], &env).unwrap() else {
            panic!("expected danmaku");
        };
        assert_eq!(bullets.len(), 4);
        assert!(bullets.iter().all(|b| b.position == origin));

        // the factory is reusable
        let again = factory.call(vec![Arg::Vec2(Vec2::ZERO)], &env).unwrap();
        assert!(matches!(again, Built::Danmaku(b) if b.len() == 4));

        let err = factory.call(Vec::new(), &env).unwrap_err();
        assert!(matches!(err, BuildError::UnfilledSlot { ref field } if field == "pos"));
    }

    #[test]
    fn test_spawner_rules() {
        let built = build(json!({
            "__type__": "Gen",
            "mover": {"__type__": "Velocity", "pos": "__midtop__", "vel": [0, 1]},
            "image": block(),
            "group": "danmaku",
            "danmaku": [
                {"__type__": "Radial", "__wrap__": true, "refresh": 10, "pos": "__arg__",
                 "vel": 2, "N": 8, "offset": 0.5, "image": block()},
                {"__type__": "Plane", "__wrap__": true, "refresh": -1, "pos": "__arg__",
                 "vel": 2, "N": 3, "sep": 12, "image": block(), "track": "player"}
            ]
        }))
        .unwrap();
        let Built::Entity(entity) = built else {
            panic!("expected an entity");
        };
        assert_eq!(entity.position, Vec2::new(400.0, 0.0));
        let spawner = entity.spawner.expect("spawner");
        assert_eq!(spawner.target, "danmaku");
        let periods: Vec<Period> = spawner.rules.iter().map(|r| r.period).collect();
        assert_eq!(periods, vec![Period::Every(10), Period::OnDestruction]);
    }

    #[test]
    fn test_spawner_rule_must_be_deferred() {
        let err = build(json!({
            "__type__": "Gen",
            "mover": {"__type__": "Static", "pos": [0, 0]},
            "image": block(),
            "group": "danmaku",
            "danmaku": [{"__type__": "Radial", "refresh": 5, "pos": [0, 0],
                         "vel": 2, "N": 8, "offset": 0, "image": block()}]
        }))
        .unwrap_err();
        assert!(matches!(err, BuildError::InvalidValue { .. }));

        let err = build(json!({
            "__type__": "Gen",
            "mover": {"__type__": "Static", "pos": [0, 0]},
            "image": block(),
            "group": "danmaku",
            "danmaku": [{"__type__": "Radial", "__wrap__": true, "refresh": 0, "pos": "__arg__",
                         "vel": 2, "N": 8, "offset": 0, "image": block()}]
        }))
        .unwrap_err();
        assert!(matches!(err, BuildError::InvalidValue { ref field, .. } if field == "refresh"));
    }

    #[test]
    fn test_sequence_variadics() {
        let stage = |delay: u32| {
            json!({"__type__": "Delay", "delay": delay,
                   "pattern": {"__type__": "Radial", "pos": [0, 0], "vel": 1, "N": 2,
                               "offset": 0, "image": block()}})
        };
        let built = build(json!({
            "__type__": "Sequence", "group": "enemy",
            "args": [stage(0), stage(5)], "kwargs": {"offset": 2}
        }))
        .unwrap();
        let Built::Sequence(mut seq) = built else {
            panic!("expected a sequence");
        };
        assert_eq!(seq.group, "enemy");
        assert_eq!(seq.remaining(), 2);
        let released: Vec<usize> = (0..8).map(|_| seq.release().len()).collect();
        assert_eq!(released, vec![0, 0, 1, 0, 0, 0, 0, 1]);

        let err = build(json!({
            "__type__": "Sequence", "group": "enemy",
            "args": [stage(0)], "kwargs": {"speed": 2}
        }))
        .unwrap_err();
        assert!(matches!(err, BuildError::InvalidValue { ref field, .. } if field == "speed"));
    }

    #[test]
    fn test_event_mover_clamped_to_viewport() {
        let Built::Mover(m) = build(json!({"__type__": "Event", "pos": [900, -5]})).unwrap() else {
            panic!("expected a mover");
        };
        assert_eq!(m.position, Vec2::new(800.0, 0.0));
        assert!(m.motion.is_player_controlled());
    }
}
