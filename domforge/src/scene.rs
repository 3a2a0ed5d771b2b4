//! Scene lifecycle.
//!
//! A scene is composed once when it is registered, then moves between `Started` and `Stopped`
//! as the engine activates other scenes. Starting attaches the scene's entities and runs the
//! three hooks in a fixed order (input bindings, one-time logic, UI). Stopping undoes all of it.
//!
//! # Example
//!
//! ```rust,no_run
//! use anyhow::Result;
//! use domforge::{Entity, SceneContext, SceneLogic, UiPanel};
//!
//! struct Level;
//!
//! impl SceneLogic for Level {
//!     fn compose(&mut self, scene: &mut SceneContext<'_>) -> Result<()> {
//!         scene.spawn(Entity::new(32.0, 32.0, 16.0, 16.0, "#ff0"));
//!         Ok(())
//!     }
//!
//!     fn input_handler(&mut self, scene: &mut SceneContext<'_>) -> Result<()> {
//!         scene.add_custom_input("Escape", |ctx| ctx.request_scene("menu"), |_| {});
//!         Ok(())
//!     }
//!
//!     fn ui_logic(&mut self, scene: &mut SceneContext<'_>) -> Result<()> {
//!         scene.add_panel(UiPanel::new("score").with_content("0"));
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use anyhow::Result;

use crate::engine::EngineContext;
use crate::entities::Entity;
use crate::ui::{PanelId, UiPanel};
use crate::world::EntityId;

/// Where a scene is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenePhase {
    Constructed,
    Started,
    Stopped,
}

/// Scene-specific behavior. Every hook is optional.
pub trait SceneLogic {
    /// Called once when the scene is registered. Build entities, cameras and integrators here.
    fn compose(&mut self, _scene: &mut SceneContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Register custom input bindings. First hook run by `start`.
    fn input_handler(&mut self, _scene: &mut SceneContext<'_>) -> Result<()> {
        Ok(())
    }

    /// One-time setup each time the scene starts. Runs after input bindings exist.
    fn start_logic(&mut self, _scene: &mut SceneContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Attach UI panels and their event bindings. Last hook run by `start`.
    fn ui_logic(&mut self, _scene: &mut SceneContext<'_>) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct SceneResources {
    /// Spawned by `compose`; kept for the scene's whole life.
    entities: Vec<EntityId>,
    /// Spawned by the start hooks; despawned on stop.
    transient: Vec<EntityId>,
    panels: Vec<PanelId>,
    inputs: BTreeSet<String>,
}

/// Engine access handed to scene hooks.
///
/// Dereferences to [`EngineContext`]; the extra methods record what the scene creates so that
/// [`Scene::stop`] can undo it.
pub struct SceneContext<'a> {
    engine: &'a mut EngineContext,
    owned: &'a mut SceneResources,
    live: bool,
}

impl<'a> SceneContext<'a> {
    pub fn engine(&mut self) -> &mut EngineContext {
        &mut *self.engine
    }

    /// Create an entity owned by this scene.
    ///
    /// Entities spawned from `compose` live as long as the scene. Entities spawned once the
    /// scene is running are attached right away and despawned when it stops.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = self.engine.spawn(entity);
        if self.live {
            self.owned.transient.push(id);
            self.engine.attach(id);
        } else {
            self.owned.entities.push(id);
        }
        id
    }

    /// Bind `key` in the engine's key-state table and remember it for cleanup.
    ///
    /// Key ids are global: another scene binding the same id replaces this binding.
    pub fn add_custom_input(
        &mut self,
        key: impl Into<String>,
        on_start: impl Fn(&mut EngineContext) + 'static,
        on_stop: impl Fn(&mut EngineContext) + 'static,
    ) {
        let key = key.into();
        self.engine
            .bind_key(key.clone(), Rc::new(on_start), Rc::new(on_stop));
        self.owned.inputs.insert(key);
    }

    pub fn remove_custom_input(&mut self, key: &str) {
        self.owned.inputs.remove(key);
        self.engine.remove_input_listeners(key);
    }

    /// Mount a panel owned by this scene.
    pub fn add_panel(&mut self, panel: UiPanel) -> PanelId {
        let id = self.engine.add_panel(panel);
        self.owned.panels.push(id);
        id
    }

    /// Entities spawned by `compose`, in spawn order.
    pub fn entities(&self) -> &[EntityId] {
        &self.owned.entities
    }

    /// Entities spawned since the scene last started.
    pub fn transient_entities(&self) -> &[EntityId] {
        &self.owned.transient
    }
}

impl Deref for SceneContext<'_> {
    type Target = EngineContext;

    fn deref(&self) -> &Self::Target {
        &*self.engine
    }
}

impl DerefMut for SceneContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.engine
    }
}

/// A registered scene: its logic plus everything it put into the engine.
pub struct Scene {
    logic: Box<dyn SceneLogic>,
    owned: SceneResources,
    phase: ScenePhase,
}

impl Scene {
    pub(crate) fn compose(logic: Box<dyn SceneLogic>, engine: &mut EngineContext) -> Result<Self> {
        let mut scene = Self {
            logic,
            owned: SceneResources::default(),
            phase: ScenePhase::Constructed,
        };
        let mut ctx = SceneContext {
            engine: &mut *engine,
            owned: &mut scene.owned,
            live: false,
        };
        if let Err(err) = scene.logic.compose(&mut ctx) {
            for id in scene.owned.entities.drain(..) {
                engine.despawn(id);
            }
            for key in std::mem::take(&mut scene.owned.inputs) {
                engine.remove_input_listeners(&key);
            }
            for panel in scene.owned.panels.drain(..) {
                engine.remove_panel(panel);
            }
            return Err(err);
        }
        Ok(scene)
    }

    pub fn phase(&self) -> ScenePhase {
        self.phase
    }

    /// Entities spawned by `compose`.
    pub fn entities(&self) -> &[EntityId] {
        &self.owned.entities
    }

    /// Entities spawned by the start hooks of the current run.
    pub fn transient_entities(&self) -> &[EntityId] {
        &self.owned.transient
    }

    pub fn panels(&self) -> &[PanelId] {
        &self.owned.panels
    }

    /// Custom input keys this scene currently holds.
    pub fn registered_inputs(&self) -> impl Iterator<Item = &str> {
        self.owned.inputs.iter().map(String::as_str)
    }

    /// Attach entities, then run `input_handler`, `start_logic` and `ui_logic` in that order.
    pub(crate) fn start(&mut self, engine: &mut EngineContext) -> Result<()> {
        for id in &self.owned.entities {
            engine.attach(*id);
        }
        self.phase = ScenePhase::Started;

        let mut ctx = SceneContext {
            engine,
            owned: &mut self.owned,
            live: true,
        };
        self.logic.input_handler(&mut ctx)?;
        self.logic.start_logic(&mut ctx)?;
        self.logic.ui_logic(&mut ctx)?;
        Ok(())
    }

    /// Detach composed entities, despawn the ones the hooks created, drop input bindings and
    /// remove panels. No-op unless started.
    pub(crate) fn stop(&mut self, engine: &mut EngineContext) {
        if self.phase != ScenePhase::Started {
            return;
        }
        for id in &self.owned.entities {
            engine.detach(*id);
        }
        for id in self.owned.transient.drain(..) {
            engine.despawn(id);
        }
        for key in std::mem::take(&mut self.owned.inputs) {
            engine.remove_input_listeners(&key);
        }
        for panel in self.owned.panels.drain(..) {
            engine.remove_panel(panel);
        }
        self.phase = ScenePhase::Stopped;
    }
}
