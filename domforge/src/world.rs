use std::collections::HashMap;

use crate::entities::Entity;

/// Unique identifier for an entity in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    /// Get the underlying integer ID (useful for debugging or serialization).
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// Entity arena plus the render set.
///
/// Every entity a scene constructs lives here for the lifetime of the engine. The render set
/// is the ordered subset of entities currently attached to the surface; scenes move their
/// entities in and out of it when they start and stop.
pub struct World {
    next_id: u32,
    entities: HashMap<EntityId, Entity>,
    attached: Vec<EntityId>,
}

impl World {
    /// Create a new, empty world.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entities: HashMap::new(),
            attached: Vec::new(),
        }
    }

    /// Store an entity and return its `EntityId`. The entity starts detached.
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity, detaching it first.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.detach(id);
        self.entities.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Add an entity to the render set. Returns false if it is unknown or already attached.
    pub fn attach(&mut self, id: EntityId) -> bool {
        if !self.entities.contains_key(&id) || self.attached.contains(&id) {
            return false;
        }
        self.attached.push(id);
        true
    }

    /// Drop an entity from the render set. Returns whether it was attached.
    pub fn detach(&mut self, id: EntityId) -> bool {
        let before = self.attached.len();
        self.attached.retain(|e| *e != id);
        before != self.attached.len()
    }

    pub fn is_attached(&self, id: EntityId) -> bool {
        self.attached.contains(&id)
    }

    /// The render set, in attach order.
    pub fn attached(&self) -> &[EntityId] {
        &self.attached
    }

    /// Number of stored entities, attached or not.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
