//! Fixed timestep simulation tick
//!
//! One tick: input, motion and periodic emission, sequences, collisions,
//! cull. Spawns produced mid-pass are queued and inserted after the pass.

use super::collision::find_contacts;
use super::entity::{Body, EntityId};
use super::motion::KeyEvent;
use super::state::{SimEvent, World, fire_destruction};
use crate::pattern::{Arg, Built, Env};

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Key events since the previous tick, in arrival order
    pub events: Vec<KeyEvent>,
}

/// Advance the world by one tick
pub fn tick(world: &mut World, input: &TickInput) {
    world.time_ticks += 1;
    world.events.clear();

    apply_input(world, input);

    let spawned = advance_entities(world);
    world.spawn_outputs(spawned);

    let released = release_sequences(world);
    world.spawn_outputs(released);

    resolve_collisions(world);
    cull(world);

    world.normalize_order();
}

fn apply_input(world: &mut World, input: &TickInput) {
    if input.events.is_empty() {
        return;
    }
    for entity in world
        .collections
        .values_mut()
        .flat_map(|c| c.entities.iter_mut())
        .filter(|e| e.alive && e.motion.is_player_controlled())
    {
        for event in &input.events {
            entity.motion.apply_key(*event);
        }
    }
}

/// Move every live entity and collect what its due emission rules produce
fn advance_entities(world: &mut World) -> Vec<(String, Built)> {
    let snapshot = world.snapshot();
    let env = Env {
        viewport: world.viewport,
        tuning: &world.tuning,
        targets: &snapshot,
    };

    let mut spawned = Vec::new();
    for entity in world
        .collections
        .values_mut()
        .flat_map(|c| c.entities.iter_mut())
        .filter(|e| e.alive)
    {
        entity.advance(&snapshot);

        let Some(spawner) = &entity.spawner else {
            continue;
        };
        for factory in spawner.due(entity.tick_count) {
            match factory.call(vec![Arg::Vec2(entity.position)], &env) {
                Ok(built) => spawned.push((spawner.target.clone(), built)),
                Err(e) => log::warn!("Spawner {:?} emission failed: {}", entity.id, e),
            }
        }
    }
    spawned
}

fn release_sequences(world: &mut World) -> Vec<(String, Built)> {
    let mut released = Vec::new();
    for sequence in &mut world.sequences {
        for built in sequence.release() {
            released.push((sequence.group.clone(), built));
        }
    }
    world.sequences.retain(|s| !s.is_finished());
    released
}

/// Mark colliding entities dead per the configured rules
fn resolve_collisions(world: &mut World) {
    let rules = world.collisions.clone();
    for rule in &rules {
        let (Some(left), Some(right)) = (
            world.collections.get(&rule.left),
            world.collections.get(&rule.right),
        ) else {
            continue;
        };
        let contacts = find_contacts(&left.entities, &right.entities);

        for contact in contacts {
            world.events.push(SimEvent::Collision {
                left: (rule.left.clone(), contact.left),
                right: (rule.right.clone(), contact.right),
            });
            if rule.kill_left {
                mark_dead(world, &rule.left, contact.left);
            }
            if rule.kill_right {
                mark_dead(world, &rule.right, contact.right);
            }
        }
    }
}

fn mark_dead(world: &mut World, collection: &str, id: EntityId) {
    if let Some(entity) = world
        .collections
        .get_mut(collection)
        .and_then(|c| c.get_mut(id))
    {
        entity.kill();
    }
}

/// Remove dead and out-of-bounds entities, firing their destruction rules
/// first; the emitted entities are in place before the cull returns
fn cull(world: &mut World) {
    let snapshot = world.snapshot();
    let env = Env {
        viewport: world.viewport,
        tuning: &world.tuning,
        targets: &snapshot,
    };
    let bounds = world.cull_bounds;

    let mut outputs = Vec::new();
    let mut destroyed = Vec::new();
    for (name, collection) in world.collections.iter_mut() {
        for entity in collection.entities.iter_mut() {
            if entity.alive && entity.in_bounds(&bounds) {
                continue;
            }
            entity.alive = false;
            outputs.extend(fire_destruction(entity, &env));
            destroyed.push(SimEvent::Destroyed {
                collection: name.clone(),
                id: entity.id,
            });
        }
        collection.entities.retain(|e| e.alive);
    }

    if !destroyed.is_empty() {
        log::debug!("Culled {} entit(ies)", destroyed.len());
    }
    world.events.extend(destroyed);
    world.spawn_outputs(outputs);

    let live: std::collections::HashSet<EntityId> = world
        .collections
        .values()
        .flat_map(|c| c.entities.iter().map(|e| e.id))
        .collect();
    world.named.retain(|_, id| live.contains(id));
}
