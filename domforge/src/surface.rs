//! Render surface contract.
//!
//! The core never draws anything itself. Entities, UI panels and the camera push geometry and
//! style into a [`RenderSurface`], which a host backs with whatever presentation layer it has
//! (a document tree, a retained-mode UI, a sprite batcher...). [`HeadlessSurface`] is an
//! in-memory implementation used by tests and tooling.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::math::Vec2;

/// Handle to a box created on a render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(raw: u32) -> Self {
        NodeId(raw)
    }

    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// Initial geometry and appearance of a new box.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxSpec {
    /// Top-left corner in container pixels.
    pub position: Vec2,
    pub size: Vec2,
    pub background: String,
    pub z_order: i32,
}

/// Narrow geometry-and-style sink implemented by the presentation layer.
pub trait RenderSurface {
    /// Create a detached box with the given geometry.
    fn create_box(&mut self, spec: &BoxSpec) -> NodeId;

    /// Destroy a box. Unknown nodes are ignored.
    fn remove_box(&mut self, node: NodeId);

    fn set_position(&mut self, node: NodeId, position: Vec2);

    fn set_size(&mut self, node: NodeId, size: Vec2);

    fn set_background(&mut self, node: NodeId, color: &str);

    fn set_z_order(&mut self, node: NodeId, z_order: i32);

    /// Replace the whole style text blob of a box, discarding whatever was applied before.
    fn set_style_text(&mut self, node: NodeId, style: &str);

    /// Replace the markup content of a box (UI panels).
    fn set_content(&mut self, node: NodeId, markup: &str);

    /// Append a box to the container.
    fn attach(&mut self, node: NodeId);

    /// Remove a box from the container without destroying it.
    fn detach(&mut self, node: NodeId);

    /// Translate the whole container so that `offset` ends up at its top-left corner.
    fn set_view_offset(&mut self, offset: Vec2);

    /// Background shown where no box covers the container.
    fn set_void_color(&mut self, color: &str);

    /// Client width and height of the container.
    fn container_size(&self) -> Vec2;
}

/// Recorded state of one box on a [`HeadlessSurface`].
#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessNode {
    pub position: Vec2,
    pub size: Vec2,
    pub background: String,
    pub z_order: i32,
    pub style_text: String,
    pub style_writes: usize,
    pub content: String,
    pub attached: bool,
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_id: u32,
    nodes: BTreeMap<NodeId, HeadlessNode>,
    container_size: Vec2,
    view_offset: Vec2,
    view_offset_writes: usize,
    void_color: String,
}

/// In-memory render surface.
///
/// Clones share the same state, so a test can keep one handle while the engine owns another.
#[derive(Clone, Debug, Default)]
pub struct HeadlessSurface {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessSurface {
    pub fn new(width: f32, height: f32) -> Self {
        let surface = Self::default();
        surface.state.borrow_mut().container_size = Vec2::new(width, height);
        surface
    }

    pub fn set_container_size(&self, width: f32, height: f32) {
        self.state.borrow_mut().container_size = Vec2::new(width, height);
    }

    pub fn node(&self, node: NodeId) -> Option<HeadlessNode> {
        self.state.borrow().nodes.get(&node).cloned()
    }

    /// Number of boxes that currently exist, attached or not.
    pub fn node_count(&self) -> usize {
        self.state.borrow().nodes.len()
    }

    pub fn attached_nodes(&self) -> Vec<NodeId> {
        self.state
            .borrow()
            .nodes
            .iter()
            .filter(|(_, n)| n.attached)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.state
            .borrow()
            .nodes
            .get(&node)
            .map(|n| n.attached)
            .unwrap_or(false)
    }

    pub fn style_writes(&self, node: NodeId) -> usize {
        self.state
            .borrow()
            .nodes
            .get(&node)
            .map(|n| n.style_writes)
            .unwrap_or(0)
    }

    pub fn view_offset(&self) -> Vec2 {
        self.state.borrow().view_offset
    }

    /// How many times the container transform was written.
    pub fn view_offset_writes(&self) -> usize {
        self.state.borrow().view_offset_writes
    }

    pub fn void_color(&self) -> String {
        self.state.borrow().void_color.clone()
    }

    fn with_node(&self, node: NodeId, f: impl FnOnce(&mut HeadlessNode)) {
        if let Some(n) = self.state.borrow_mut().nodes.get_mut(&node) {
            f(n);
        }
    }
}

impl RenderSurface for HeadlessSurface {
    fn create_box(&mut self, spec: &BoxSpec) -> NodeId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = NodeId(state.next_id);
        state.nodes.insert(
            id,
            HeadlessNode {
                position: spec.position,
                size: spec.size,
                background: spec.background.clone(),
                z_order: spec.z_order,
                style_text: String::new(),
                style_writes: 0,
                content: String::new(),
                attached: false,
            },
        );
        id
    }

    fn remove_box(&mut self, node: NodeId) {
        self.state.borrow_mut().nodes.remove(&node);
    }

    fn set_position(&mut self, node: NodeId, position: Vec2) {
        self.with_node(node, |n| n.position = position);
    }

    fn set_size(&mut self, node: NodeId, size: Vec2) {
        self.with_node(node, |n| n.size = size);
    }

    fn set_background(&mut self, node: NodeId, color: &str) {
        self.with_node(node, |n| n.background = color.to_string());
    }

    fn set_z_order(&mut self, node: NodeId, z_order: i32) {
        self.with_node(node, |n| n.z_order = z_order);
    }

    fn set_style_text(&mut self, node: NodeId, style: &str) {
        self.with_node(node, |n| {
            n.style_text = style.to_string();
            n.style_writes += 1;
        });
    }

    fn set_content(&mut self, node: NodeId, markup: &str) {
        self.with_node(node, |n| n.content = markup.to_string());
    }

    fn attach(&mut self, node: NodeId) {
        self.with_node(node, |n| n.attached = true);
    }

    fn detach(&mut self, node: NodeId) {
        self.with_node(node, |n| n.attached = false);
    }

    fn set_view_offset(&mut self, offset: Vec2) {
        let mut state = self.state.borrow_mut();
        state.view_offset = offset;
        state.view_offset_writes += 1;
    }

    fn set_void_color(&mut self, color: &str) {
        self.state.borrow_mut().void_color = color.to_string();
    }

    fn container_size(&self) -> Vec2 {
        self.state.borrow().container_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> BoxSpec {
        BoxSpec {
            position: Vec2::new(1.0, 2.0),
            size: Vec2::new(3.0, 4.0),
            background: "#fff".into(),
            z_order: 1,
        }
    }

    #[test]
    fn clones_share_state() {
        let observer = HeadlessSurface::new(640.0, 480.0);
        let mut owned = observer.clone();
        let id = owned.create_box(&spec());
        owned.attach(id);
        assert!(observer.is_attached(id));
        assert_eq!(observer.container_size(), Vec2::new(640.0, 480.0));
    }

    #[test]
    fn style_text_is_replaced_and_counted() {
        let mut surface = HeadlessSurface::new(10.0, 10.0);
        let id = surface.create_box(&spec());
        surface.set_style_text(id, "opacity: 0.5;");
        surface.set_style_text(id, "width: 5px;");
        let node = surface.node(id).unwrap();
        assert_eq!(node.style_text, "width: 5px;");
        assert_eq!(node.style_writes, 2);
    }

    #[test]
    fn unknown_nodes_are_ignored() {
        let mut surface = HeadlessSurface::new(10.0, 10.0);
        surface.set_position(NodeId::new(99), Vec2::new(1.0, 1.0));
        surface.remove_box(NodeId::new(99));
        assert_eq!(surface.node_count(), 0);
    }
}
