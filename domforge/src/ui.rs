//! Screen-space UI panels.
//!
//! A panel is a tagged box holding markup. Its content can be swapped in from a
//! [`ContentFetcher`](crate::assets::ContentFetcher) with [`EngineContext::require`], and it can
//! carry handlers for named events the host reports through
//! [`InputListener::ui_event`](crate::input::InputListener::ui_event).

use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::EngineContext;
use crate::error::EngineError;
use crate::math::Vec2;
use crate::surface::{BoxSpec, NodeId, RenderSurface};

/// Default stacking order of panels, above entities.
pub const PANEL_Z_ORDER: i32 = 10;

/// Handle to a panel owned by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(pub(crate) u32);

/// Callback bound to a panel event.
pub type UiHandler = Rc<dyn Fn(&mut EngineContext)>;

pub struct UiPanel {
    tag: String,
    position: Vec2,
    size: Vec2,
    z_order: i32,
    content: String,
    handlers: HashMap<String, UiHandler>,
    node: Option<NodeId>,
}

impl UiPanel {
    /// Create a panel identified by `tag`.
    ///
    /// # Panics
    ///
    /// Panics if `tag` is empty or only whitespace.
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if tag.trim().is_empty() {
            panic!("{}", EngineError::PanelWithoutTag);
        }
        Self {
            tag,
            position: Vec2::ZERO,
            size: Vec2::ZERO,
            z_order: PANEL_Z_ORDER,
            content: String::new(),
            handlers: HashMap::new(),
            node: None,
        }
    }

    #[must_use]
    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Vec2::new(x, y);
        self
    }

    #[must_use]
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Vec2::new(width, height);
        self
    }

    #[must_use]
    pub fn with_z_order(mut self, z_order: i32) -> Self {
        self.z_order = z_order;
        self
    }

    #[must_use]
    pub fn with_content(mut self, markup: impl Into<String>) -> Self {
        self.content = markup.into();
        self
    }

    /// Bind `handler` to `event`, replacing a previous binding for that event.
    pub fn on(&mut self, event: impl Into<String>, handler: impl Fn(&mut EngineContext) + 'static) {
        self.handlers.insert(event.into(), Rc::new(handler));
    }

    #[must_use]
    pub fn with_handler(
        mut self,
        event: impl Into<String>,
        handler: impl Fn(&mut EngineContext) + 'static,
    ) -> Self {
        self.on(event, handler);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub(crate) fn handler(&self, event: &str) -> Option<UiHandler> {
        self.handlers.get(event).cloned()
    }

    pub(crate) fn set_content(&mut self, markup: String, surface: &mut dyn RenderSurface) {
        if let Some(node) = self.node {
            surface.set_content(node, &markup);
        }
        self.content = markup;
    }

    /// Create, fill and attach the panel's box.
    pub(crate) fn mount(&mut self, surface: &mut dyn RenderSurface) {
        let node = surface.create_box(&BoxSpec {
            position: self.position,
            size: self.size,
            background: "transparent".to_string(),
            z_order: self.z_order,
        });
        surface.set_content(node, &self.content);
        surface.attach(node);
        self.node = Some(node);
    }

    pub(crate) fn unmount(&mut self, surface: &mut dyn RenderSurface) {
        if let Some(node) = self.node.take() {
            surface.detach(node);
            surface.remove_box(node);
        }
    }
}
