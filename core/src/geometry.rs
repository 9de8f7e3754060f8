//! Pixel geometry primitives shared by movement, targeting and combat.
//!
//! World coordinates are `f32` pixels. Every containment and intersection
//! test first truncates coordinates toward zero onto the integer pixel grid
//! so collision seams line up with what is drawn on screen.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Side length of a square tile measured in world pixels.
pub const TILE_SIZE: i32 = 16;

/// Truncates a world coordinate toward zero onto the pixel grid.
#[must_use]
pub fn pixel(value: f32) -> i32 {
    value as i32
}

/// Point expressed in world pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate, growing downward.
    pub y: f32,
}

impl Point {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Converts the point into a `glam` vector.
    #[must_use]
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Point) -> f32 {
        self.to_vec2().distance(other.to_vec2())
    }
}

/// Axis-aligned rectangle expressed in world pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

impl Rect {
    /// Creates a new rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Centre of the rectangle.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Returns a copy moved by the provided offset.
    #[must_use]
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Snaps the rectangle onto the pixel grid.
    ///
    /// Position and size are truncated independently so a hitbox keeps its
    /// pixel footprint while moving by fractional amounts.
    #[must_use]
    pub fn to_pixels(&self) -> PixelRect {
        PixelRect {
            x: pixel(self.x),
            y: pixel(self.y),
            w: pixel(self.w),
            h: pixel(self.h),
        }
    }
}

/// Rectangle snapped onto the integer pixel grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Leftmost pixel column.
    pub x: i32,
    /// Topmost pixel row.
    pub y: i32,
    /// Width in pixels.
    pub w: i32,
    /// Height in pixels.
    pub h: i32,
}

impl PixelRect {
    /// Rightmost pixel column covered by the rectangle.
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.w - 1
    }

    /// Bottom pixel row covered by the rectangle.
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.h - 1
    }

    /// Reports whether the rectangle covers at least one pixel.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Reports whether the pixel lies inside the rectangle.
    #[must_use]
    pub const fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }

    /// Reports whether two pixel rectangles share at least one pixel.
    #[must_use]
    pub const fn overlaps(&self, other: &PixelRect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// Circle expressed in world pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    /// Horizontal centre.
    pub x: f32,
    /// Vertical centre.
    pub y: f32,
    /// Radius.
    pub r: f32,
}

impl Circle {
    /// Creates a new circle.
    #[must_use]
    pub const fn new(x: f32, y: f32, r: f32) -> Self {
        Self { x, y, r }
    }

    /// Centre of the circle.
    #[must_use]
    pub const fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Smallest rectangle containing the circle.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x - self.r, self.y - self.r, self.r * 2.0, self.r * 2.0)
    }
}

/// Line segment with a thickness, used for beam and lunge attacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    /// Start of the segment, horizontal.
    pub x1: f32,
    /// Start of the segment, vertical.
    pub y1: f32,
    /// End of the segment, horizontal.
    pub x2: f32,
    /// End of the segment, vertical.
    pub y2: f32,
    /// Half thickness of the segment.
    pub r: f32,
}

impl Ray {
    /// Smallest rectangle containing the thick segment.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let left = self.x1.min(self.x2) - self.r;
        let top = self.y1.min(self.y2) - self.r;
        let right = self.x1.max(self.x2) + self.r;
        let bottom = self.y1.max(self.y2) + self.r;
        Rect::new(left, top, right - left, bottom - top)
    }
}

/// Rectangle with a vertical extent along the z axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShortRect {
    /// Footprint on the collision plane.
    pub rect: Rect,
    /// Height of the bottom face above the ground.
    pub z: f32,
    /// Vertical depth of the volume.
    pub zd: f32,
}

/// Reports whether two rectangles share at least one pixel.
#[must_use]
pub fn rectangles_overlap(a: &Rect, b: &Rect) -> bool {
    a.to_pixels().overlaps(&b.to_pixels())
}

/// Reports whether a point lies inside a rectangle after pixel truncation.
#[must_use]
pub fn is_point_in_rect(point: Point, rect: &Rect) -> bool {
    rect.to_pixels().contains(pixel(point.x), pixel(point.y))
}

/// Reports whether two volumes overlap on the plane and along z.
#[must_use]
pub fn short_rects_overlap(a: &ShortRect, b: &ShortRect) -> bool {
    rectangles_overlap(&a.rect, &b.rect) && a.z < b.z + b.zd && b.z < a.z + a.zd
}

/// Reports whether a circle touches any pixel of a rectangle.
#[must_use]
pub fn circle_overlaps_rect(circle: &Circle, rect: &Rect) -> bool {
    let pixels = rect.to_pixels();
    if pixels.is_empty() || circle.r <= 0.0 {
        return false;
    }
    let left = pixels.x as f32;
    let top = pixels.y as f32;
    let right = (pixels.x + pixels.w) as f32;
    let bottom = (pixels.y + pixels.h) as f32;
    let closest_x = circle.x.clamp(left, right);
    let closest_y = circle.y.clamp(top, bottom);
    let dx = circle.x - closest_x;
    let dy = circle.y - closest_y;
    dx * dx + dy * dy < circle.r * circle.r
}

/// Gap between the surfaces of two circles; zero once they touch or overlap.
#[must_use]
pub fn get_distance(a: &Circle, b: &Circle) -> f32 {
    let gap = a.center().distance(b.center()) - a.r - b.r;
    gap.max(0.0)
}

/// Reports whether a thick segment crosses a rectangle.
///
/// The rectangle is grown by the segment thickness and the segment is
/// clipped against it with the slab method.
#[must_use]
pub fn ray_intersects_rect(ray: &Ray, rect: &Rect) -> bool {
    let pixels = rect.to_pixels();
    if pixels.is_empty() {
        return false;
    }
    let left = pixels.x as f32 - ray.r;
    let top = pixels.y as f32 - ray.r;
    let right = (pixels.x + pixels.w) as f32 + ray.r;
    let bottom = (pixels.y + pixels.h) as f32 + ray.r;

    let dx = ray.x2 - ray.x1;
    let dy = ray.y2 - ray.y1;
    let mut t_min = 0.0_f32;
    let mut t_max = 1.0_f32;

    for (origin, delta, low, high) in [(ray.x1, dx, left, right), (ray.y1, dy, top, bottom)] {
        if delta == 0.0 {
            if origin < low || origin >= high {
                return false;
            }
            continue;
        }
        let mut t0 = (low - origin) / delta;
        let mut t1 = (high - origin) / delta;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return false;
        }
    }
    true
}
