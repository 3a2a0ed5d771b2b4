//! Directional box-vs-box collision test.

use crate::math::Bounds;

/// Side of the second box that the first box ran into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Test `a` against `b` and report which side of `b` was hit.
///
/// `sensitivity` scales the detection reach: at `1.0` boxes must actually overlap, above it
/// boxes collide slightly before touching, below it they must sink into each other. The reach
/// adjustment only looks at the average width of the two boxes, so tall thin boxes get the same
/// slack vertically as they do horizontally.
///
/// Coordinates are screen-style (y grows downwards): `Top` means `a` sits above `b`.
pub fn collides(a: &Bounds, b: &Bounds, sensitivity: f32) -> Option<Side> {
    let dx = a.center.x - b.center.x;
    let dy = a.center.y - b.center.y;

    let half_w = (a.size.x + b.size.x) / 2.0;
    let half_h = (a.size.y + b.size.y) / 2.0;

    let average_width = (a.size.x + b.size.x) / 2.0;
    let min_distance = average_width * sensitivity;
    let slack = min_distance - average_width;

    let reach_x = half_w + slack;
    let reach_y = half_h + slack;
    if dx.abs() >= reach_x || dy.abs() >= reach_y {
        return None;
    }

    // Compare the deltas normalized by the opposite extent; the dominant one is the contact axis.
    let wy = reach_x * dy;
    let hx = reach_y * dx;
    if wy.abs() > hx.abs() {
        if dy < 0.0 {
            Some(Side::Top)
        } else {
            Some(Side::Bottom)
        }
    } else if dx > 0.0 {
        Some(Side::Right)
    } else {
        Some(Side::Left)
    }
}
