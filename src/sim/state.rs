//! World state: named collections of entities plus running sequences
//!
//! Entities are owned by exactly one collection. Named entities (the player)
//! are looked up by id, never held by reference.

use std::collections::{BTreeMap, HashMap};

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde_json::Value;

use super::entity::{Body, Entity, EntityId, TargetSnapshot, Targets};
use super::sequence::Sequence;
use super::viewport::Rect;
use crate::pattern::{Arg, BuildError, Built, Env, ObjectBuilder, PatternNode, Registry, Scene};
use crate::settings::{CollisionRule, Settings, Tuning};

/// A named set of entities
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub(crate) entities: Vec<Entity>,
}

impl Collection {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn alive_count(&self) -> usize {
        self.entities.iter().filter(|e| e.alive).count()
    }
}

/// Something that happened during the last tick
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Spawned { collection: String, count: usize },
    Destroyed { collection: String, id: EntityId },
    Collision {
        left: (String, EntityId),
        right: (String, EntityId),
    },
}

/// Borrowed build context over the world's collections
pub struct SceneView<'a> {
    viewport: Rect,
    collections: &'a BTreeMap<String, Collection>,
    named: &'a HashMap<String, EntityId>,
}

impl Targets for SceneView<'_> {
    fn position_of(&self, id: EntityId) -> Option<glam::Vec2> {
        self.collections
            .values()
            .flat_map(|c| c.entities.iter())
            .find(|e| e.id == id && e.alive)
            .map(|e| e.position())
    }
}

impl Scene for SceneView<'_> {
    fn viewport(&self) -> Rect {
        self.viewport
    }

    fn has_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    fn named_entity(&self, name: &str) -> Option<EntityId> {
        self.named.get(name).copied()
    }

    fn targets(&self) -> &dyn Targets {
        self
    }
}

/// Complete simulation state
pub struct World {
    pub viewport: Rect,
    /// Entities leaving this rectangle are culled
    pub cull_bounds: Rect,
    pub tuning: Tuning,
    pub collisions: Vec<CollisionRule>,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Events raised during the last tick
    pub events: Vec<SimEvent>,
    pub(crate) collections: BTreeMap<String, Collection>,
    pub(crate) named: HashMap<String, EntityId>,
    pub(crate) sequences: Vec<Sequence>,
    registry: Registry,
    rng: Pcg32,
    next_id: u32,
}

impl World {
    pub fn new(settings: &Settings, seed: u64) -> Self {
        let (width, height) = settings.viewport_size();
        let viewport = Rect::from_size(width, height);
        let mut world = Self {
            viewport,
            cull_bounds: viewport.inflate(settings.cull_margin),
            tuning: settings.tuning.clone(),
            collisions: settings.collisions.clone(),
            time_ticks: 0,
            events: Vec::new(),
            collections: BTreeMap::new(),
            named: HashMap::new(),
            sequences: Vec::new(),
            registry: Registry::standard(),
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        };
        for name in &settings.collections {
            world.add_collection(name);
        }
        log::info!(
            "World {}x{} with {} collection(s), seed {}",
            viewport.width,
            viewport.height,
            world.collections.len(),
            seed
        );
        world
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn add_collection(&mut self, name: &str) {
        self.collections.entry(name.to_string()).or_default();
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Insert an entity, assigning its id
    pub fn insert(&mut self, collection: &str, mut entity: Entity) -> Result<EntityId, BuildError> {
        if !self.collections.contains_key(collection) {
            return Err(BuildError::UnknownCollection(collection.to_string()));
        }
        let id = self.next_entity_id();
        entity.id = id;
        if let Some(c) = self.collections.get_mut(collection) {
            c.entities.push(entity);
        }
        Ok(id)
    }

    /// Insert an entity and register it under `name` for pattern lookups
    pub fn insert_named(
        &mut self,
        name: &str,
        collection: &str,
        entity: Entity,
    ) -> Result<EntityId, BuildError> {
        let id = self.insert(collection, entity)?;
        self.named.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn find(&self, id: EntityId) -> Option<&Entity> {
        self.collections.values().find_map(|c| c.get(id))
    }

    pub fn named_entity(&self, name: &str) -> Option<&Entity> {
        self.named.get(name).and_then(|id| self.find(*id))
    }

    /// Positions of every live entity
    pub fn snapshot(&self) -> TargetSnapshot {
        let mut snapshot = TargetSnapshot::default();
        for entity in self.collections.values().flat_map(|c| c.entities.iter()) {
            if entity.alive {
                snapshot.insert(entity.id, entity.position);
            }
        }
        snapshot
    }

    /// Build a pattern node against the current world
    pub fn build(&mut self, node: &PatternNode) -> Result<Built, BuildError> {
        let scene = SceneView {
            viewport: self.viewport,
            collections: &self.collections,
            named: &self.named,
        };
        let builder = ObjectBuilder::new(&self.registry, &self.tuning);
        builder.build(node, &scene, &mut self.rng)
    }

    /// Build and spawn one pattern object, or every object of an array
    pub fn load_pattern(&mut self, collection: &str, json: &Value) -> Result<usize, BuildError> {
        let nodes = match json {
            Value::Array(items) => items
                .iter()
                .map(PatternNode::from_value)
                .collect::<Result<Vec<_>, _>>()?,
            other => vec![PatternNode::from_value(other)?],
        };

        if !self.collections.contains_key(collection) {
            return Err(BuildError::UnknownCollection(collection.to_string()));
        }
        let built = nodes
            .iter()
            .map(|node| self.build(node))
            .collect::<Result<Vec<_>, _>>()?;
        for value in &built {
            check_spawnable(value)?;
        }

        let mut spawned = 0;
        for value in built {
            spawned += self.spawn_built(collection, value)?;
        }
        log::info!(
            "Loaded {} pattern(s) into '{}': {} entit(ies)",
            nodes.len(),
            collection,
            spawned
        );
        Ok(spawned)
    }

    /// Place a built value into the world; returns the number of entities
    /// inserted (sequences spawn later, into their own group)
    pub fn spawn_built(&mut self, collection: &str, built: Built) -> Result<usize, BuildError> {
        if !self.collections.contains_key(collection) {
            return Err(BuildError::UnknownCollection(collection.to_string()));
        }
        let count = match built {
            Built::Danmaku(entities) => {
                let count = entities.len();
                for entity in entities {
                    self.insert(collection, entity)?;
                }
                count
            }
            Built::Entity(entity) => {
                self.insert(collection, entity)?;
                1
            }
            Built::Stage(stage) => return self.spawn_built(collection, *stage.payload),
            Built::Sequence(sequence) => {
                log::debug!(
                    "Sequence queued for '{}' with {} stage(s)",
                    sequence.group,
                    sequence.remaining()
                );
                self.sequences.push(sequence);
                0
            }
            other => {
                check_spawnable(&other)?;
                0
            }
        };
        if count > 0 {
            self.events.push(SimEvent::Spawned {
                collection: collection.to_string(),
                count,
            });
        }
        Ok(count)
    }

    /// Kill an entity now; its on-destruction rules fire before it is
    /// removed at the next cull. Returns false if it was not alive.
    pub fn kill(&mut self, id: EntityId) -> bool {
        let snapshot = self.snapshot();
        let env = Env {
            viewport: self.viewport,
            tuning: &self.tuning,
            targets: &snapshot,
        };
        let Some(entity) = self.collections.values_mut().find_map(|c| c.get_mut(id)) else {
            return false;
        };
        if !entity.kill() {
            return false;
        }
        let outputs = fire_destruction(entity, &env);
        self.spawn_outputs(outputs);
        true
    }

    /// Spawn factory outputs, logging (and dropping) failures
    pub(crate) fn spawn_outputs(&mut self, outputs: Vec<(String, Built)>) {
        for (collection, built) in outputs {
            if let Err(e) = self.spawn_built(&collection, built) {
                log::warn!("Dropped spawn into '{}': {}", collection, e);
            }
        }
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        for collection in self.collections.values_mut() {
            collection.entities.sort_by_key(|e| e.id);
        }
    }

    /// Total live entities
    pub fn alive_count(&self) -> usize {
        self.collections.values().map(Collection::alive_count).sum()
    }
}

/// Reject built values that are not placeable on their own
fn check_spawnable(built: &Built) -> Result<(), BuildError> {
    match built {
        Built::Danmaku(_) | Built::Entity(_) | Built::Sequence(_) => Ok(()),
        Built::Stage(stage) => check_spawnable(&stage.payload),
        other => Err(BuildError::invalid(
            "__type__",
            format!("a {} cannot be spawned on its own", other.kind()),
        )),
    }
}

/// Run an entity's on-destruction rules once, at its current position
pub(crate) fn fire_destruction(entity: &mut Entity, env: &Env<'_>) -> Vec<(String, Built)> {
    let Some(spawner) = entity.spawner.as_mut() else {
        return Vec::new();
    };
    let target = spawner.target.clone();
    spawner
        .take_destruction_rules()
        .into_iter()
        .filter_map(|factory| match factory.call(vec![Arg::Vec2(entity.position)], env) {
            Ok(built) => Some((target.clone(), built)),
            Err(e) => {
                log::warn!("Destruction emission failed: {}", e);
                None
            }
        })
        .collect()
}
