//! Pairwise collision between two collections
//!
//! Every entity's hit box is its sprite rectangle centered on its position.
//! Only live entities collide; an entity never collides with itself.

use super::entity::{Entity, EntityId};
use super::viewport::Rect;

/// One overlapping pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub left: EntityId,
    pub right: EntityId,
}

/// All overlapping (left, right) pairs, in left-then-right order
pub fn find_contacts(left: &[Entity], right: &[Entity]) -> Vec<Contact> {
    let right_boxes: Vec<(EntityId, Rect)> = right
        .iter()
        .filter(|e| e.alive)
        .map(|e| (e.id, e.hit_box()))
        .collect();

    let mut contacts = Vec::new();
    for entity in left.iter().filter(|e| e.alive) {
        let hit_box = entity.hit_box();
        for (id, other) in &right_boxes {
            if *id != entity.id && hit_box.overlaps(other) {
                contacts.push(Contact {
                    left: entity.id,
                    right: *id,
                });
            }
        }
    }
    contacts
}
