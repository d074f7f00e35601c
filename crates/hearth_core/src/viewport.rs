//! Screen/world projection seam used by the selection controller.
//!
//! The engine owns the real camera and UI; the core only needs three
//! questions answered, expressed by the [`Viewport`] trait.
//! [`TopDownViewport`] is a simple orthographic implementation used by the
//! headless runner and tests.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Axis-aligned rectangle in screen pixels. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRect {
    /// Top-left corner (smallest coordinates).
    pub min: Vec2Fixed,
    /// Bottom-right corner (largest coordinates).
    pub max: Vec2Fixed,
}

impl ScreenRect {
    /// Build the rectangle spanned by two arbitrary corners.
    #[must_use]
    pub fn from_corners(a: Vec2Fixed, b: Vec2Fixed) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Check whether a point lies inside or on the edge.
    #[must_use]
    pub fn contains(&self, point: Vec2Fixed) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

/// Camera and UI queries the selection controller depends on.
pub trait Viewport {
    /// Project a ground-plane position to screen pixels.
    fn world_to_screen(&self, world: Vec2Fixed) -> Vec2Fixed;

    /// Cast a screen point onto the ground plane.
    ///
    /// Returns `None` when the ray misses the ground.
    fn screen_to_ground(&self, screen: Vec2Fixed) -> Option<Vec2Fixed>;

    /// Whether the cursor is over an interactive UI control.
    fn is_over_ui_control(&self, screen: Vec2Fixed) -> bool;
}

/// Orthographic top-down camera: `screen = (world - origin) * scale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopDownViewport {
    /// World position shown at screen (0, 0).
    pub origin: Vec2Fixed,
    /// Pixels per world unit.
    #[serde(with = "fixed_serde")]
    pub scale: Fixed,
    /// Screen areas covered by UI controls.
    #[serde(default)]
    pub ui_rects: Vec<ScreenRect>,
}

impl TopDownViewport {
    /// Create a viewport with no UI controls.
    #[must_use]
    pub const fn new(origin: Vec2Fixed, scale: Fixed) -> Self {
        Self {
            origin,
            scale,
            ui_rects: Vec::new(),
        }
    }

    /// Add a UI control area.
    #[must_use]
    pub fn with_ui_rect(mut self, rect: ScreenRect) -> Self {
        self.ui_rects.push(rect);
        self
    }
}

impl Default for TopDownViewport {
    fn default() -> Self {
        Self::new(Vec2Fixed::ZERO, Fixed::from_num(10))
    }
}

impl Viewport for TopDownViewport {
    fn world_to_screen(&self, world: Vec2Fixed) -> Vec2Fixed {
        (world - self.origin).scale(self.scale)
    }

    fn screen_to_ground(&self, screen: Vec2Fixed) -> Option<Vec2Fixed> {
        let x = screen.x.checked_div(self.scale)?;
        let y = screen.y.checked_div(self.scale)?;
        Some(Vec2Fixed::new(x, y) + self.origin)
    }

    fn is_over_ui_control(&self, screen: Vec2Fixed) -> bool {
        self.ui_rects.iter().any(|rect| rect.contains(screen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    #[test]
    fn test_rect_normalizes_corners() {
        let a = ScreenRect::from_corners(px(50, 10), px(10, 40));
        let b = ScreenRect::from_corners(px(10, 40), px(50, 10));
        assert_eq!(a, b);
        assert_eq!(a.min, px(10, 10));
        assert!(a.contains(px(50, 40)));
        assert!(!a.contains(px(51, 40)));
    }

    #[test]
    fn test_projection_round_trip() {
        let viewport = TopDownViewport::new(px(-5, -5), Fixed::from_num(8));
        let screen = viewport.world_to_screen(px(3, 1));
        assert_eq!(screen, px(64, 48));
        assert_eq!(viewport.screen_to_ground(screen), Some(px(3, 1)));
    }

    #[test]
    fn test_zero_scale_misses_ground() {
        let viewport = TopDownViewport::new(Vec2Fixed::ZERO, Fixed::ZERO);
        assert_eq!(viewport.screen_to_ground(px(1, 1)), None);
    }

    #[test]
    fn test_ui_hit_test() {
        let viewport =
            TopDownViewport::default().with_ui_rect(ScreenRect::from_corners(px(0, 0), px(100, 20)));
        assert!(viewport.is_over_ui_control(px(40, 10)));
        assert!(!viewport.is_over_ui_control(px(40, 21)));
    }
}
