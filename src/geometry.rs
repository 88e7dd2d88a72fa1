//! Geometry predicates for path merging and attribute hoisting.
//!
//! Everything here is conservative: a "maybe" always answers like a "yes",
//! so callers never merge shapes that might overlap.

use crate::ast::{Attribute, Element};
use crate::collections::is_inheritable;
use crate::path::{Instruction, PathData};

pub type Point = (f64, f64);

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let (&(x, y), rest) = points.split_first()?;
        let mut bbox = Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        };
        for &(x, y) in rest {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        Some(bbox)
    }

    /// Grow the box by `pad` on every side.
    pub fn padded(self, pad: f64) -> Self {
        Self {
            min_x: self.min_x - pad,
            min_y: self.min_y - pad,
            max_x: self.max_x + pad,
            max_y: self.max_y + pad,
        }
    }

    /// Interiors overlap. Boxes that only touch do not.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }
}

/// Bounding box of every point that can influence the shape of `path`.
pub fn bounding_box(path: &PathData) -> Option<BBox> {
    let points: Vec<Point> = subpath_points(path).into_iter().flatten().collect();
    BBox::from_points(&points)
}

/// Test whether the filled areas of two paths might overlap.
pub fn intersects(a: &PathData, b: &PathData) -> bool {
    let subpaths_a = subpath_points(a);
    let subpaths_b = subpath_points(b);

    let all_a: Vec<Point> = subpaths_a.iter().flatten().copied().collect();
    let all_b: Vec<Point> = subpaths_b.iter().flatten().copied().collect();
    let (Some(box_a), Some(box_b)) = (BBox::from_points(&all_a), BBox::from_points(&all_b)) else {
        return false;
    };
    if !box_a.overlaps(&box_b) {
        return false;
    }

    let hulls_a: Vec<Vec<Point>> = subpaths_a.iter().map(|s| convex_hull(s)).collect();
    let hulls_b: Vec<Vec<Point>> = subpaths_b.iter().map(|s| convex_hull(s)).collect();

    hulls_a
        .iter()
        .any(|ha| hulls_b.iter().any(|hb| hulls_overlap(ha, hb)))
}

/// Absolute points per subpath: end points, control points (including the
/// implicit reflected ones of `S` and `T`) and a box around every arc.
fn subpath_points(path: &PathData) -> Vec<Vec<Point>> {
    let abs = path.to_absolute();
    let mut subpaths: Vec<Vec<Point>> = Vec::new();
    let mut current: Point = (0.0, 0.0);
    let mut start: Point = (0.0, 0.0);
    let mut last_cubic: Option<Point> = None;
    let mut last_quad: Option<Point> = None;

    let reflect = |ctrl: Option<Point>, about: Point| match ctrl {
        Some((cx, cy)) => (2.0 * about.0 - cx, 2.0 * about.1 - cy),
        None => about,
    };

    for cmd in &abs.commands {
        let a = &cmd.args;
        if cmd.instruction == Instruction::MoveTo || subpaths.is_empty() {
            subpaths.push(Vec::new());
        }
        let Some(points) = subpaths.last_mut() else {
            continue;
        };
        let mut cubic_ctrl = None;
        let mut quad_ctrl = None;

        match cmd.instruction {
            Instruction::MoveTo => {
                current = (a[0], a[1]);
                start = current;
                points.push(current);
            }
            Instruction::LineTo => {
                current = (a[0], a[1]);
                points.push(current);
            }
            Instruction::HorizontalTo => {
                current.0 = a[0];
                points.push(current);
            }
            Instruction::VerticalTo => {
                current.1 = a[0];
                points.push(current);
            }
            Instruction::CurveTo => {
                points.extend([(a[0], a[1]), (a[2], a[3]), (a[4], a[5])]);
                cubic_ctrl = Some((a[2], a[3]));
                current = (a[4], a[5]);
            }
            Instruction::SmoothCurveTo => {
                points.extend([reflect(last_cubic, current), (a[0], a[1]), (a[2], a[3])]);
                cubic_ctrl = Some((a[0], a[1]));
                current = (a[2], a[3]);
            }
            Instruction::QuadTo => {
                points.extend([(a[0], a[1]), (a[2], a[3])]);
                quad_ctrl = Some((a[0], a[1]));
                current = (a[2], a[3]);
            }
            Instruction::SmoothQuadTo => {
                let ctrl = reflect(last_quad, current);
                points.extend([ctrl, (a[0], a[1])]);
                quad_ctrl = Some(ctrl);
                current = (a[0], a[1]);
            }
            Instruction::Arc => {
                let end = (a[5], a[6]);
                points.extend(arc_box(current, a[0], a[1], end));
                points.push(end);
                current = end;
            }
            Instruction::ClosePath => {
                current = start;
            }
        }

        last_cubic = cubic_ctrl;
        last_quad = quad_ctrl;
    }

    subpaths.retain(|s| !s.is_empty());
    subpaths
}

/// Corners of a box guaranteed to contain the arc from `from` to `to`.
///
/// Every point of the ellipse lies within its major diameter of `from`.
/// Radii too small to reach `to` are scaled up first, as renderers do.
fn arc_box(from: Point, rx: f64, ry: f64, to: Point) -> Vec<Point> {
    let (rx, ry) = (rx.abs(), ry.abs());
    if rx == 0.0 || ry == 0.0 {
        // degenerate arcs render as straight lines
        return Vec::new();
    }
    let dx = (from.0 - to.0) / 2.0;
    let dy = (from.1 - to.1) / 2.0;
    let d = dx.hypot(dy);
    // Rotation-independent bound on the radius scale factor
    let lambda = (d / rx.min(ry)).powi(2);
    let radius = rx.max(ry) * lambda.sqrt().max(1.0);
    let reach = 2.0 * radius;
    vec![
        (from.0 - reach, from.1 - reach),
        (from.0 + reach, from.1 - reach),
        (from.0 + reach, from.1 + reach),
        (from.0 - reach, from.1 + reach),
    ]
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Monotone-chain convex hull, counter-clockwise. Degenerate inputs yield
/// one or two points.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<Point> = Vec::new();
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point> = Vec::new();
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Separating axis test between two convex hulls.
fn hulls_overlap(a: &[Point], b: &[Point]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let mut axes: Vec<Point> = vec![(1.0, 0.0), (0.0, 1.0)];
    for hull in [a, b] {
        for (i, &p) in hull.iter().enumerate() {
            let q = hull[(i + 1) % hull.len()];
            let edge = (q.0 - p.0, q.1 - p.1);
            if edge == (0.0, 0.0) {
                continue;
            }
            axes.push((-edge.1, edge.0));
            if hull.len() == 2 {
                axes.push(edge);
            }
        }
    }

    axes.iter().all(|&axis| {
        let (min_a, max_a) = project(a, axis);
        let (min_b, max_b) = project(b, axis);
        max_a > min_b && max_b > min_a
    })
}

fn project(hull: &[Point], axis: Point) -> (f64, f64) {
    hull.iter()
        .map(|p| p.0 * axis.0 + p.1 * axis.1)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Attributes that can be hoisted from every one of `elements` to their
/// parent: present on all of them, inheritable, and equal in name,
/// namespace and value.
pub fn intersect_inheritable_attrs(elements: &[&Element]) -> Vec<Attribute> {
    let Some((first, rest)) = elements.split_first() else {
        return Vec::new();
    };
    first
        .attributes()
        .filter(|attr| attr.name.prefix.is_none() && is_inheritable(&attr.name.local))
        .filter(|attr| {
            rest.iter().all(|other| {
                other
                    .attributes()
                    .any(|o| o.name == attr.name && o.value == attr.value)
            })
        })
        .cloned()
        .collect()
}
