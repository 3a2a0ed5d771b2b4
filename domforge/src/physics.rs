//! Rfx: the per-entity gravity/friction/bounce integrator.
//!
//! This is a position-only model. Each step nudges the entity along the gravity direction,
//! clamps the moving axis, applies friction to both coordinates and finally bounces off the
//! rest threshold. There is no velocity, mass or rotation.

use serde::{Deserialize, Serialize};

use crate::engine::EngineContext;
use crate::math::Vec2;
use crate::world::EntityId;

/// Direction gravity pulls in (screen coordinates, y grows downwards).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GravityDirection {
    Up,
    #[default]
    Down,
    Left,
    Right,
    None,
}

/// Tuning values shared by every integrator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfxConstants {
    /// Distance moved along the gravity direction per step.
    pub gravity: f32,
    /// Multiplier applied to both coordinates per step.
    pub friction: f32,
    /// Scale of the inverted position after a bounce.
    pub bounce: f32,
    /// How far past the threshold the moving axis may travel.
    pub terminal_velocity: f32,
}

impl Default for RfxConstants {
    fn default() -> Self {
        Self {
            gravity: 0.5,
            friction: 0.9,
            bounce: 0.3,
            terminal_velocity: 10.0,
        }
    }
}

/// Integrator bound to a single entity.
#[derive(Clone, Debug)]
pub struct Rfx {
    entity: EntityId,
    threshold: f32,
    direction: GravityDirection,
    constants: RfxConstants,
}

impl Rfx {
    pub fn new(entity: EntityId, threshold: f32) -> Self {
        Self {
            entity,
            threshold,
            direction: GravityDirection::default(),
            constants: RfxConstants::default(),
        }
    }

    #[must_use]
    pub fn with_direction(mut self, direction: GravityDirection) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn with_constants(mut self, constants: RfxConstants) -> Self {
        self.constants = constants;
        self
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn direction(&self) -> GravityDirection {
        self.direction
    }

    pub fn set_direction(&mut self, direction: GravityDirection) {
        self.direction = direction;
    }

    /// Compute one step from `position`.
    pub fn step(&self, position: Vec2) -> Vec2 {
        let c = &self.constants;
        let mut p = position;
        let upper = self.threshold + c.terminal_velocity;
        let lower = self.threshold - c.terminal_velocity;

        match self.direction {
            GravityDirection::Down => p.y = (p.y + c.gravity).min(upper),
            GravityDirection::Up => p.y = (p.y - c.gravity).max(lower),
            GravityDirection::Right => p.x = (p.x + c.gravity).min(upper),
            GravityDirection::Left => p.x = (p.x - c.gravity).max(lower),
            GravityDirection::None => {}
        }

        p.x *= c.friction;
        p.y *= c.friction;

        // The inverted value is not clamped again, so a bounce can land below zero.
        if p.y > self.threshold {
            p.y = self.threshold;
            p.y = -p.y * c.bounce;
        }
        p
    }

    /// Step the bound entity and push its new position. Returns false if the entity is gone.
    pub fn apply(&self, ctx: &mut EngineContext) -> bool {
        let Some((entity, surface)) = ctx.entity_and_surface(self.entity) else {
            log::warn!("rfx bound to missing entity {:?}", self.entity);
            return false;
        };
        entity.position = self.step(entity.position);
        entity.render(surface);
        true
    }
}
