//! Camera that keeps a target entity centered in the viewport.

use glam::Affine2;

use crate::error::EngineError;
use crate::math::Vec2;
use crate::surface::RenderSurface;
use crate::world::{EntityId, World};

/// Horizontal and vertical damping applied to the stored offset after each update.
const DAMPING: Vec2 = Vec2 { x: 5.0, y: 2.0 };

/// Camera follow state.
///
/// Every update computes the offset that would center the target, writes it to the surface if
/// it differs from the stored offset, then stores a damped copy (x / 5, y / 2). The stored value
/// is what the next update compares against, which gives the horizontal axis a slower catch-up
/// than the vertical one.
#[derive(Clone, Debug)]
pub struct Camera {
    target: Option<EntityId>,
    offset: Vec2,
    applied: Vec2,
    void_color: String,
}

impl Camera {
    pub fn new(void_color: impl Into<String>) -> Self {
        Self {
            target: None,
            offset: Vec2::ZERO,
            applied: Vec2::ZERO,
            void_color: void_color.into(),
        }
    }

    /// Start tracking `entity`.
    pub fn follow(&mut self, entity: EntityId) {
        self.target = Some(entity);
    }

    #[must_use]
    pub fn following(mut self, entity: EntityId) -> Self {
        self.follow(entity);
        self
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Damped offset kept from the last update.
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Last offset written to the surface.
    pub fn applied_offset(&self) -> Vec2 {
        self.applied
    }

    pub fn void_color(&self) -> &str {
        &self.void_color
    }

    /// World-to-container transform matching the last applied offset.
    pub fn view_transform(&self) -> Affine2 {
        Affine2::from_translation(-self.applied.to_glam())
    }

    /// Offset that centers `position`/`size` in a viewport of `viewport` size.
    pub fn centering_offset(position: Vec2, size: Vec2, viewport: Vec2) -> Vec2 {
        position - viewport / 2.0 + size / 2.0
    }

    /// Track the target for one tick.
    ///
    /// # Panics
    ///
    /// Panics if [`Camera::follow`] was never called.
    pub fn update(&mut self, world: &World, surface: &mut dyn RenderSurface) {
        let Some(target) = self.target else {
            panic!("{}", EngineError::CameraWithoutTarget);
        };
        let Some(entity) = world.get(target) else {
            log::warn!("camera target {target:?} no longer exists");
            return;
        };

        let offset = Self::centering_offset(entity.position, entity.size, surface.container_size());
        if offset != self.offset {
            surface.set_view_offset(offset);
            self.applied = offset;
        }
        self.offset = Vec2::new(offset.x / DAMPING.x, offset.y / DAMPING.y);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new("#000000")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Entity;
    use crate::surface::HeadlessSurface;

    fn setup() -> (World, EntityId, HeadlessSurface) {
        let mut world = World::new();
        let id = world.insert(Entity::new(500.0, 400.0, 20.0, 40.0, "#fff"));
        (world, id, HeadlessSurface::new(800.0, 600.0))
    }

    #[test]
    fn centers_target_and_stores_damped_offset() {
        let (world, id, mut surface) = setup();
        let mut camera = Camera::default().following(id);
        camera.update(&world, &mut surface);

        // 500 - 400 + 10, 400 - 300 + 20
        let expected = Vec2::new(110.0, 120.0);
        assert_eq!(surface.view_offset(), expected);
        assert_eq!(camera.applied_offset(), expected);
        assert_eq!(camera.offset(), Vec2::new(22.0, 60.0));
    }

    #[test]
    fn skips_write_when_offset_matches_stored_value() {
        let mut world = World::new();
        // Centered exactly: offset is zero, which equals the initial stored offset.
        let id = world.insert(Entity::new(390.0, 280.0, 20.0, 40.0, "#fff"));
        let mut surface = HeadlessSurface::new(800.0, 600.0);
        let mut camera = Camera::default().following(id);
        camera.update(&world, &mut surface);
        camera.update(&world, &mut surface);
        assert_eq!(surface.view_offset_writes(), 0);
    }

    #[test]
    fn rewrites_while_target_is_away_from_origin() {
        let (world, id, mut surface) = setup();
        let mut camera = Camera::default().following(id);
        camera.update(&world, &mut surface);
        camera.update(&world, &mut surface);
        assert_eq!(surface.view_offset_writes(), 2);
    }

    #[test]
    #[should_panic(expected = "camera update without a target")]
    fn update_without_target_panics() {
        let (world, _, mut surface) = setup();
        Camera::default().update(&world, &mut surface);
    }

    #[test]
    fn view_transform_inverts_offset() {
        let (world, id, mut surface) = setup();
        let mut camera = Camera::default().following(id);
        camera.update(&world, &mut surface);
        let p = camera.view_transform().transform_point2(glam::Vec2::new(110.0, 120.0));
        assert_eq!(p, glam::Vec2::ZERO);
    }
}
