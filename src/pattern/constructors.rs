//! Built-in constructor table
//!
//! Each constructor declares its parameters once; defaults come from the
//! same constants the constructor falls back to.

use serde_json::{Value, json};

use super::registry::{ConstructorSpec, ParamSpec, SemanticType as Ty};
use super::value::{Arg, Arguments, Built, Env, Mover, as_count};
use super::BuildError;
use crate::consts::DEFAULT_DIRECTION;
use crate::sim::emission::{Emitter, Shape};
use crate::sim::entity::{Entity, Spawner, Sprite};
use crate::sim::motion::{Homing, MotionState, PlayerControl};
use crate::sim::sequence::{Sequence, Stage};

/// Timing keywords a `Sequence` accepts
const SEQUENCE_TIMING_KEYS: &[&str] = &["offset"];

/// Angles are written in multiples of π
fn default_direction() -> Value {
    json!(DEFAULT_DIRECTION / std::f32::consts::PI)
}

/// Every built-in type, keyed by tag (aliases included)
pub fn standard_specs() -> Vec<(&'static str, ConstructorSpec)> {
    let generator = ConstructorSpec::new(
        "Generator",
        vec![
            ParamSpec::required("mover", Ty::Object),
            ParamSpec::required("image", Ty::Object),
            ParamSpec::required("group", Ty::Collection),
            ParamSpec::required("danmaku", Ty::EmissionRules),
        ],
        spawner,
    );

    vec![
        (
            "Static",
            ConstructorSpec::new(
                "Static",
                vec![ParamSpec::required("pos", Ty::Coordinate)],
                static_mover,
            ),
        ),
        (
            "Velocity",
            ConstructorSpec::new(
                "Velocity",
                vec![
                    ParamSpec::required("pos", Ty::Coordinate),
                    ParamSpec::required("vel", Ty::Vector),
                ],
                velocity_mover,
            ),
        ),
        (
            "Acceleration",
            ConstructorSpec::new(
                "Acceleration",
                vec![
                    ParamSpec::required("pos", Ty::Coordinate),
                    ParamSpec::required("vel", Ty::Vector),
                    ParamSpec::required("acc", Ty::Vector),
                ],
                acceleration_mover,
            ),
        ),
        (
            "Event",
            ConstructorSpec::new(
                "Event",
                vec![
                    ParamSpec::required("pos", Ty::Coordinate),
                    // null: the configured player speed
                    ParamSpec::optional("magnitude", Ty::Number, Value::Null),
                ],
                event_mover,
            ),
        ),
        (
            "Tracking",
            ConstructorSpec::new(
                "Tracking",
                vec![
                    ParamSpec::required("pos", Ty::Coordinate),
                    ParamSpec::required("vel", Ty::Vector),
                    ParamSpec::required("target", Ty::Entity),
                ],
                tracking_mover,
            ),
        ),
        (
            "Block",
            ConstructorSpec::new(
                "Block",
                vec![
                    ParamSpec::required("width", Ty::Integer),
                    ParamSpec::required("height", Ty::Integer),
                    ParamSpec::required("color", Ty::Color),
                ],
                block,
            ),
        ),
        (
            "Radial",
            ConstructorSpec::new(
                "Radial",
                vec![
                    ParamSpec::required("pos", Ty::Coordinate),
                    ParamSpec::required("vel", Ty::Number),
                    ParamSpec::required("N", Ty::Integer),
                    ParamSpec::required("offset", Ty::Number),
                    ParamSpec::required("image", Ty::Object),
                    ParamSpec::optional("track", Ty::Entity, Value::Null),
                ],
                radial,
            ),
        ),
        (
            "Burst",
            ConstructorSpec::new(
                "Burst",
                vec![
                    ParamSpec::required("pos", Ty::Coordinate),
                    ParamSpec::required("vel", Ty::Number),
                    ParamSpec::required("baseN", Ty::Integer),
                    ParamSpec::required("N", Ty::Integer),
                    ParamSpec::required("image", Ty::Object),
                    ParamSpec::optional("track", Ty::Entity, Value::Null),
                    ParamSpec::optional("direction", Ty::Angle, default_direction()),
                ],
                burst,
            ),
        ),
        (
            "Plane",
            ConstructorSpec::new(
                "Plane",
                vec![
                    ParamSpec::required("pos", Ty::Coordinate),
                    ParamSpec::required("vel", Ty::Number),
                    ParamSpec::required("N", Ty::Integer),
                    ParamSpec::required("sep", Ty::Number),
                    ParamSpec::required("image", Ty::Object),
                    ParamSpec::optional("track", Ty::Entity, Value::Null),
                    ParamSpec::optional("direction", Ty::Angle, default_direction()),
                ],
                plane,
            ),
        ),
        ("Gen", generator.clone()),
        ("Generator", generator),
        (
            "Delay",
            ConstructorSpec::new(
                "Delay",
                vec![
                    ParamSpec::required("pattern", Ty::Object),
                    ParamSpec::required("delay", Ty::Integer),
                ],
                delay,
            ),
        ),
        (
            "Sequence",
            ConstructorSpec::new(
                "Sequence",
                vec![
                    ParamSpec::required("group", Ty::Collection),
                    ParamSpec::variadic("stages"),
                    ParamSpec::variadic_keyword("timing"),
                ],
                sequence,
            ),
        ),
    ]
}

fn mover(position: glam::Vec2, motion: MotionState) -> Result<Built, BuildError> {
    Ok(Built::Mover(Mover { position, motion }))
}

fn static_mover(args: Arguments, _env: &Env<'_>) -> Result<Built, BuildError> {
    mover(args.vec2("pos")?, MotionState::Constant)
}

fn velocity_mover(args: Arguments, _env: &Env<'_>) -> Result<Built, BuildError> {
    let vel = args.vec2("vel")?;
    mover(args.vec2("pos")?, MotionState::Velocity { vel })
}

fn acceleration_mover(args: Arguments, _env: &Env<'_>) -> Result<Built, BuildError> {
    let vel = args.vec2("vel")?;
    let acc = args.vec2("acc")?;
    mover(args.vec2("pos")?, MotionState::Acceleration { vel, acc })
}

/// Keyboard-driven mover confined to the viewport
fn event_mover(args: Arguments, env: &Env<'_>) -> Result<Built, BuildError> {
    let magnitude = args.float_or("magnitude", env.tuning.player_speed)?;
    let bounds = env.viewport;
    let pos = args.vec2("pos")?;
    let pos = glam::Vec2::new(
        pos.x.clamp(bounds.left, bounds.right()),
        pos.y.clamp(bounds.top, bounds.bottom()),
    );
    let control = PlayerControl::new(magnitude, bounds, env.tuning.speed_amplifier);
    mover(pos, MotionState::PlayerControlled(control))
}

fn tracking_mover(args: Arguments, env: &Env<'_>) -> Result<Built, BuildError> {
    let target = args
        .target("target")?
        .ok_or_else(|| BuildError::invalid("target", "tracking needs an entity"))?;
    let vel = args.vec2("vel")?;
    let homing = Homing::new(vel, target.id, 0, env.tuning);
    mover(args.vec2("pos")?, MotionState::Homing(homing))
}

fn block(args: Arguments, _env: &Env<'_>) -> Result<Built, BuildError> {
    let width = args.count("width")? as f32;
    let height = args.count("height")? as f32;
    Ok(Built::Sprite(Sprite::block(width, height, args.color("color")?)))
}

fn fire(args: &Arguments, env: &Env<'_>, shape: Shape) -> Result<Built, BuildError> {
    shape.validate()?;
    let emitter = Emitter {
        origin: args.vec2("pos")?,
        speed: args.float("vel")? * env.tuning.bullet_speed_scale,
        shape,
        sprite: args.sprite("image")?,
        track: args.target("track")?.map(|t| t.id),
    };
    let bullets = emitter.emit(env.targets, env.tuning);
    log::debug!("{} fired {} bullet(s)", args.type_tag(), bullets.len());
    Ok(Built::Danmaku(bullets))
}

fn radial(args: Arguments, env: &Env<'_>) -> Result<Built, BuildError> {
    let shape = Shape::Radial {
        count: args.count("N")?,
        offset: args.float("offset")?,
    };
    fire(&args, env, shape)
}

fn burst(args: Arguments, env: &Env<'_>) -> Result<Built, BuildError> {
    let shape = Shape::Burst {
        base_count: args.count("baseN")?,
        count: args.count("N")?,
        direction: args.float_or("direction", DEFAULT_DIRECTION)?,
    };
    fire(&args, env, shape)
}

fn plane(args: Arguments, env: &Env<'_>) -> Result<Built, BuildError> {
    let shape = Shape::Plane {
        count: args.count("N")?,
        separation: args.float("sep")?,
        direction: args.float_or("direction", DEFAULT_DIRECTION)?,
    };
    fire(&args, env, shape)
}

/// Spawner entity: a mover and an image plus emission rules
fn spawner(args: Arguments, _env: &Env<'_>) -> Result<Built, BuildError> {
    let Mover { position, motion } = args.mover("mover")?;
    let sprite = args.sprite("image")?;
    let spawner = Spawner {
        target: args.collection("group")?,
        rules: args.rules("danmaku")?,
    };
    Ok(Built::Entity(
        Entity::new(position, motion, sprite).with_spawner(spawner),
    ))
}

fn delay(args: Arguments, _env: &Env<'_>) -> Result<Built, BuildError> {
    let delay = u32::try_from(args.count("delay")?)
        .map_err(|_| BuildError::invalid("delay", "delay out of range"))?;
    Ok(Built::Stage(Stage {
        delay,
        payload: Box::new(args.built("pattern")?),
    }))
}

fn sequence(args: Arguments, _env: &Env<'_>) -> Result<Built, BuildError> {
    let mut offset = 0;
    for (key, arg) in args.variadic_keyword() {
        if !SEQUENCE_TIMING_KEYS.contains(&key.as_str()) {
            return Err(BuildError::invalid(
                key.as_str(),
                format!("unknown timing keyword (expected one of {SEQUENCE_TIMING_KEYS:?})"),
            ));
        }
        offset = u32::try_from(as_count(key, arg)?)
            .map_err(|_| BuildError::invalid(key.as_str(), "offset out of range"))?;
    }

    let stages = args
        .variadic()
        .iter()
        .map(|arg| match arg {
            Arg::Built(Built::Stage(stage)) => Ok(stage.clone()),
            _ => Err(BuildError::invalid("stages", "every stage must be a Delay")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Built::Sequence(Sequence::new(args.collection("group")?, stages, offset)))
}
