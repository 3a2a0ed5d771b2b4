//! Positioned, sized and colored renderables with named animation states.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::math::{Bounds, Vec2};
use crate::style::{self, ViewportSymbols};
use crate::surface::{BoxSpec, NodeId, RenderSurface};

/// Default stacking order of entity boxes. UI panels sit above this.
pub const ENTITY_Z_ORDER: i32 = 1;

/// A renderable box driven by the engine.
///
/// Each animation state maps a name to a raw style script. Scripts are only compiled when the
/// state is entered.
#[derive(Clone, Debug)]
pub struct Entity {
    /// Top-left corner in world pixels.
    pub position: Vec2,
    pub size: Vec2,
    pub color: String,
    pub z_order: i32,
    /// Free-form per-entity data for game logic.
    pub state: Map<String, Value>,
    animations: HashMap<String, String>,
    current_state: Option<String>,
    node: Option<NodeId>,
}

impl Entity {
    pub fn new(x: f32, y: f32, width: f32, height: f32, color: impl Into<String>) -> Self {
        Self {
            position: Vec2::new(x, y),
            size: Vec2::new(width, height),
            color: color.into(),
            z_order: ENTITY_Z_ORDER,
            state: Map::new(),
            animations: HashMap::new(),
            current_state: None,
            node: None,
        }
    }

    #[must_use]
    pub fn with_z_order(mut self, z_order: i32) -> Self {
        self.z_order = z_order;
        self
    }

    /// Store a style script for `name`. Replaces any script already stored under that name.
    pub fn add_animation_state(&mut self, name: impl Into<String>, script: impl Into<String>) {
        self.animations.insert(name.into(), script.into());
    }

    #[must_use]
    pub fn with_animation_state(mut self, name: impl Into<String>, script: impl Into<String>) -> Self {
        self.add_animation_state(name, script);
        self
    }

    pub fn current_state(&self) -> Option<&str> {
        self.current_state.as_deref()
    }

    pub fn has_animation_state(&self, name: &str) -> bool {
        self.animations.contains_key(name)
    }

    /// Surface box backing this entity, once spawned.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_top_left(self.position, self.size)
    }

    /// Enter animation state `name`.
    ///
    /// Entering the active state does nothing. Otherwise the state's script is compiled against
    /// the surface viewport, applied as the box's whole style text, and the position is pushed
    /// again. An entity without a box yet gets the style when it is spawned. Returns whether the
    /// state changed.
    pub fn change_state(&mut self, name: &str, surface: &mut dyn RenderSurface) -> bool {
        if self.current_state.as_deref() == Some(name) {
            return false;
        }
        if !self.animations.contains_key(name) {
            log::warn!("entity has no animation state {name:?}");
            return false;
        }
        self.current_state = Some(name.to_string());
        self.apply_state_style(surface);
        self.render(surface);
        true
    }

    fn apply_state_style(&self, surface: &mut dyn RenderSurface) {
        let Some(node) = self.node else {
            return;
        };
        let Some(script) = self.current_state.as_ref().and_then(|s| self.animations.get(s)) else {
            return;
        };
        let symbols = ViewportSymbols {
            size: surface.container_size(),
        };
        let directives = style::compile(script, &symbols);
        surface.set_style_text(node, &directives.to_style_text());
    }

    pub fn set_size(&mut self, width: f32, height: f32, surface: &mut dyn RenderSurface) {
        self.size = Vec2::new(width, height);
        if let Some(node) = self.node {
            surface.set_size(node, self.size);
        }
    }

    /// Change the base color. Style text from an animation state still wins where it overlaps.
    pub fn set_color(&mut self, color: impl Into<String>, surface: &mut dyn RenderSurface) {
        self.color = color.into();
        if let Some(node) = self.node {
            surface.set_background(node, &self.color);
        }
    }

    pub fn set_z_order(&mut self, z_order: i32, surface: &mut dyn RenderSurface) {
        self.z_order = z_order;
        if let Some(node) = self.node {
            surface.set_z_order(node, z_order);
        }
    }

    /// Move the entity and push the new position.
    ///
    /// Zero (and NaN) coordinates are refused: an entity cannot be moved onto either axis
    /// through this call. Write `position` directly and call [`Entity::render`] for that.
    pub fn set_position(&mut self, x: f32, y: f32, surface: &mut dyn RenderSurface) -> bool {
        if !is_truthy(x) || !is_truthy(y) {
            log::debug!("set_position({x}, {y}) ignored");
            return false;
        }
        self.position = Vec2::new(x, y);
        self.render(surface);
        true
    }

    /// Push the current position to the surface. Size and color are only set on spawn.
    pub fn render(&self, surface: &mut dyn RenderSurface) {
        if let Some(node) = self.node {
            surface.set_position(node, self.position);
        }
    }

    pub(crate) fn realize(&mut self, surface: &mut dyn RenderSurface) -> NodeId {
        if let Some(node) = self.node {
            return node;
        }
        let node = surface.create_box(&BoxSpec {
            position: self.position,
            size: self.size,
            background: self.color.clone(),
            z_order: self.z_order,
        });
        self.node = Some(node);
        self.apply_state_style(surface);
        node
    }
}

fn is_truthy(value: f32) -> bool {
    value != 0.0 && !value.is_nan()
}
