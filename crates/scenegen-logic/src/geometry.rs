//! Floor-plane geometry for generated scenes.
//!
//! Pure functions over plain structs. Footprints are convex polygons on the
//! x/z floor plane; rooms are centered on the origin.

use serde::{Deserialize, Serialize};

/// Tolerance for touching edges and containment tests.
pub const EPSILON: f64 = 1e-6;

/// A point or extent in scene space (y is up).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Projection onto the floor plane.
    pub fn floor(&self) -> Point2 {
        Point2::new(self.x, self.z)
    }
}

/// A point on the floor plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub z: f64,
}

impl Point2 {
    pub const fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }
}

/// Rotate a local floor offset by `rotation_y` degrees about the vertical
/// axis. Local +z maps to `(sin, cos)`.
pub fn rotate_offset(dx: f64, dz: f64, rotation_y: f64) -> (f64, f64) {
    let (sin, cos) = rotation_y.to_radians().sin_cos();
    (dx * cos + dz * sin, -dx * sin + dz * cos)
}

/// Heading in degrees, in `[0, 360)`, whose local +z points from `from`
/// toward `to`.
pub fn heading_towards(from: Point2, to: Point2) -> f64 {
    (to.x - from.x).atan2(to.z - from.z).to_degrees().rem_euclid(360.0)
}

/// Axis-aligned floor rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min_x: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_z: f64,
}

impl Aabb {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn depth(&self) -> f64 {
        self.max_z - self.min_z
    }
}

/// Convex floor polygon of a placed object. Vertices are stored in order
/// (either winding).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub points: Vec<Point2>,
}

impl Footprint {
    /// Rectangle of `width` (local x) by `depth` (local z) centered on
    /// `center`, rotated by `rotation_y` degrees about the vertical axis.
    pub fn rectangle(center: Point2, width: f64, depth: f64, rotation_y: f64) -> Self {
        let hw = width / 2.0;
        let hd = depth / 2.0;
        let points = [(-hw, -hd), (hw, -hd), (hw, hd), (-hw, hd)]
            .iter()
            .map(|&(dx, dz)| {
                let (ox, oz) = rotate_offset(dx, dz, rotation_y);
                Point2::new(center.x + ox, center.z + oz)
            })
            .collect();
        Self { points }
    }

    /// Axis-aligned bounds. An empty footprint has degenerate bounds at
    /// the origin.
    pub fn bounds(&self) -> Aabb {
        if self.points.is_empty() {
            return Aabb {
                min_x: 0.0,
                min_z: 0.0,
                max_x: 0.0,
                max_z: 0.0,
            };
        }
        let mut b = Aabb {
            min_x: f64::INFINITY,
            min_z: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_z: f64::NEG_INFINITY,
        };
        for p in &self.points {
            b.min_x = b.min_x.min(p.x);
            b.min_z = b.min_z.min(p.z);
            b.max_x = b.max_x.max(p.x);
            b.max_z = b.max_z.max(p.z);
        }
        b
    }

    /// Vertex centroid.
    pub fn center(&self) -> Point2 {
        if self.points.is_empty() {
            return Point2::default();
        }
        let n = self.points.len() as f64;
        let (sx, sz) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(sx, sz), p| (sx + p.x, sz + p.z));
        Point2::new(sx / n, sz / n)
    }

    /// True polygon intersection (separating axis test). Footprints that
    /// only touch along an edge or at a corner do not intersect.
    pub fn intersects(&self, other: &Footprint) -> bool {
        if self.points.len() < 3 || other.points.len() < 3 {
            return false;
        }
        for axis in edge_normals(&self.points).chain(edge_normals(&other.points)) {
            let (a_min, a_max) = project(&self.points, axis);
            let (b_min, b_max) = project(&other.points, axis);
            if a_max <= b_min + EPSILON || b_max <= a_min + EPSILON {
                return false;
            }
        }
        true
    }

    /// Whether `point` lies strictly inside the polygon. Points on an edge
    /// are not enclosed.
    pub fn contains(&self, point: Point2) -> bool {
        if self.points.len() < 3 {
            return false;
        }
        let mut sign = 0.0_f64;
        for (a, b) in edges(&self.points) {
            let cross = (b.x - a.x) * (point.z - a.z) - (b.z - a.z) * (point.x - a.x);
            if cross.abs() <= EPSILON {
                return false;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }
}

fn edges(points: &[Point2]) -> impl Iterator<Item = (Point2, Point2)> + '_ {
    points
        .iter()
        .enumerate()
        .map(move |(i, a)| (*a, points[(i + 1) % points.len()]))
}

/// Unit normals of every non-degenerate edge.
fn edge_normals(points: &[Point2]) -> impl Iterator<Item = (f64, f64)> + '_ {
    edges(points).filter_map(|(a, b)| {
        let (nx, nz) = (-(b.z - a.z), b.x - a.x);
        let len = (nx * nx + nz * nz).sqrt();
        (len > EPSILON).then(|| (nx / len, nz / len))
    })
}

fn project(points: &[Point2], axis: (f64, f64)) -> (f64, f64) {
    points
        .iter()
        .map(|p| p.x * axis.0 + p.z * axis.1)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
            (lo.min(d), hi.max(d))
        })
}

/// Floor extents of a room centered on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomExtents {
    pub half_x: f64,
    pub half_z: f64,
}

impl RoomExtents {
    pub fn from_dimensions(dimensions: &Vec3) -> Self {
        Self {
            half_x: dimensions.x / 2.0,
            half_z: dimensions.z / 2.0,
        }
    }

    /// Whether every vertex of `footprint` lies within the room, widened
    /// on each side by `allowance`.
    pub fn contains(&self, footprint: &Footprint, allowance: f64) -> bool {
        let limit_x = self.half_x + allowance + EPSILON;
        let limit_z = self.half_z + allowance + EPSILON;
        footprint
            .points
            .iter()
            .all(|p| p.x.abs() <= limit_x && p.z.abs() <= limit_z)
    }
}
