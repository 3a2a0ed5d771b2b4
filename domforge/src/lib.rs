//! domforge - a real-time 2D simulation core for document-tree-backed games.
//!
//! The engine ticks a fixed-rate scheduler, polls a unified key-state table built from
//! keyboard, mouse and gamepad input, runs scene lifecycles and keeps a camera on its target.
//! Everything visual goes through a [`RenderSurface`]: boxes with geometry, a background and
//! wholesale style text.

pub mod assets;
pub mod camera;
pub mod collision;
pub mod engine;
pub mod entities;
pub mod error;
pub mod gamepad;
pub mod input;
pub mod math;
pub mod physics;
pub mod platform;
pub mod scene;
pub mod style;
pub mod surface;
pub mod ui;
pub mod world;

pub use crate::assets::{ContentFetcher, FileFetcher, StaticFetcher};
pub use crate::camera::Camera;
pub use crate::collision::{collides, Side};
pub use crate::engine::{Engine, EngineConfig, EngineContext, FrameHost, SleepHost};
pub use crate::entities::Entity;
pub use crate::error::EngineError;
pub use crate::gamepad::{spawn_gamepad_poller, ButtonSnapshot, GamepadSnapshot, GamepadSource};
pub use crate::input::{InputListener, InputState, KeyCallback, KeyStateTable, RawInput};
pub use crate::math::{Bounds, Vec2};
pub use crate::physics::{GravityDirection, Rfx, RfxConstants};
pub use crate::scene::{Scene, SceneContext, SceneLogic, ScenePhase};
pub use crate::style::{StyleContext, StyleDirectiveSet, ViewportSymbols};
pub use crate::surface::{BoxSpec, HeadlessSurface, NodeId, RenderSurface};
pub use crate::ui::{PanelId, UiPanel};
pub use crate::world::{EntityId, World};
