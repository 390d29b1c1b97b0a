use thiserror::Error;

use crate::data::{ClusterNode, Level};

/// Gap kept between sibling circles, in unscaled layout units.
pub const SIBLING_PADDING: f64 = 6.0;

/// Hard bound on nesting depth. The hierarchy is validated as a tree on
/// load, so hitting this means corrupted input; failing beats looping.
const MAX_DEPTH: usize = 32;

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("hierarchy nesting exceeds {MAX_DEPTH} levels; refusing to pack")]
    DepthExceeded,
    #[error("cannot pack into a {width}x{height} viewport")]
    EmptyViewport { width: f32, height: f32 },
}

/// Layout output for one node, valid for a single layout pass. Recomputed
/// wholesale whenever the view root or the canvas changes.
#[derive(Clone, Debug)]
pub struct PackedNode {
    pub id: String,
    pub name: String,
    pub level: Level,
    pub weight: u64,
    pub has_children: bool,
    pub x: f32,
    pub y: f32,
    pub r: f32,
    pub depth: usize,
    pub parent: Option<usize>,
}

impl PackedNode {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let dx = x - self.x;
        let dy = y - self.y;
        (dx * dx + dy * dy).sqrt() <= self.r
    }
}

/// Packs the subtree rooted at `root` into a `width` x `height` canvas.
///
/// Leaves get radius `sqrt(max(1, weight))`; siblings are sorted by
/// descending subtree value (original order breaking ties) and placed with
/// front-chain packing; each parent circle is the minimal enclosing circle
/// of its packed children plus padding. The whole layout is scaled so the
/// root circle spans the shorter canvas axis, centered on the canvas.
/// Output is a pre-order flattened list, depth 0 being the view root.
pub fn pack_hierarchy(
    root: &ClusterNode,
    width: f32,
    height: f32,
) -> Result<Vec<PackedNode>, LayoutError> {
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return Err(LayoutError::EmptyViewport { width, height });
    }

    let (placed, _value) = measure(root, 0)?;

    let target_r = (width.min(height) as f64) / 2.0;
    let scale = if placed.r > 0.0 { target_r / placed.r } else { 1.0 };

    let mut packed = Vec::new();
    flatten(
        &placed,
        (width as f64) / 2.0,
        (height as f64) / 2.0,
        scale,
        0,
        None,
        &mut packed,
    );
    Ok(packed)
}

struct Placed<'a> {
    node: &'a ClusterNode,
    r: f64,
    dx: f64,
    dy: f64,
    children: Vec<Placed<'a>>,
}

fn measure<'a>(node: &'a ClusterNode, depth: usize) -> Result<(Placed<'a>, u64), LayoutError> {
    if depth > MAX_DEPTH {
        return Err(LayoutError::DepthExceeded);
    }

    if node.children.is_empty() {
        let value = node.packing_value();
        return Ok((
            Placed {
                node,
                r: (value as f64).sqrt(),
                dx: 0.0,
                dy: 0.0,
                children: Vec::new(),
            },
            value,
        ));
    }

    let mut children = Vec::with_capacity(node.children.len());
    let mut values = Vec::with_capacity(node.children.len());
    for child in &node.children {
        let (placed, value) = measure(child, depth + 1)?;
        children.push(placed);
        values.push(value);
    }

    // Descending value; the stable sort keeps original order for ties.
    let mut order = (0..children.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| values[b].cmp(&values[a]));

    let mut circles = order
        .iter()
        .map(|&index| Circle {
            x: 0.0,
            y: 0.0,
            r: children[index].r + SIBLING_PADDING / 2.0,
        })
        .collect::<Vec<_>>();
    let enclosing_r = pack_siblings(&mut circles);

    for (slot, &index) in order.iter().enumerate() {
        children[index].dx = circles[slot].x;
        children[index].dy = circles[slot].y;
    }

    Ok((
        Placed {
            node,
            r: enclosing_r + SIBLING_PADDING / 2.0,
            dx: 0.0,
            dy: 0.0,
            children,
        },
        values.iter().sum(),
    ))
}

fn flatten(
    placed: &Placed<'_>,
    x: f64,
    y: f64,
    scale: f64,
    depth: usize,
    parent: Option<usize>,
    out: &mut Vec<PackedNode>,
) {
    let index = out.len();
    out.push(PackedNode {
        id: placed.node.id.clone(),
        name: placed.node.name.clone(),
        level: placed.node.level,
        weight: placed.node.weight,
        has_children: placed.node.has_children(),
        x: x as f32,
        y: y as f32,
        r: (placed.r * scale) as f32,
        depth,
        parent,
    });

    for child in &placed.children {
        flatten(
            child,
            x + child.dx * scale,
            y + child.dy * scale,
            scale,
            depth + 1,
            Some(index),
            out,
        );
    }
}

#[derive(Clone, Copy, Debug)]
struct Circle {
    x: f64,
    y: f64,
    r: f64,
}

/// Front-chain sibling packing (Wang et al.), the enclosure method d3 made
/// canonical. Places the circles around the origin without overlap, then
/// recenters them on their minimal enclosing circle. Returns its radius.
fn pack_siblings(circles: &mut [Circle]) -> f64 {
    let n = circles.len();
    if n == 0 {
        return 0.0;
    }

    circles[0].x = 0.0;
    circles[0].y = 0.0;
    if n == 1 {
        return circles[0].r;
    }

    circles[0].x = -circles[1].r;
    circles[1].x = circles[0].r;
    circles[1].y = 0.0;
    if n == 2 {
        return circles[0].r + circles[1].r;
    }

    let third = placed_tangent(circles[1], circles[0], circles[2].r);
    circles[2] = third;

    // Doubly linked front chain over circle indices.
    let mut next = vec![0usize; n];
    let mut prev = vec![0usize; n];
    next[0] = 1;
    prev[2] = 1;
    next[1] = 2;
    prev[0] = 2;
    next[2] = 0;
    prev[1] = 0;

    let mut a = 0usize;
    let mut b = 1usize;

    let mut i = 3;
    'pack: while i < n {
        let c = i;
        circles[c] = placed_tangent(circles[a], circles[b], circles[c].r);

        // Walk outward from the insertion point looking for an intersection
        // with the rest of the chain; on hit, close the chain over the
        // offending arc and retry the same circle.
        let mut j = next[b];
        let mut k = prev[a];
        let mut sj = circles[b].r;
        let mut sk = circles[a].r;
        loop {
            if sj <= sk {
                if intersects(circles[j], circles[c]) {
                    b = j;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sj += circles[j].r;
                j = next[j];
            } else {
                if intersects(circles[k], circles[c]) {
                    a = k;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sk += circles[k].r;
                k = prev[k];
            }
            if j == next[k] {
                break;
            }
        }

        prev[c] = a;
        next[c] = b;
        next[a] = c;
        prev[b] = c;
        b = c;

        // Move the insertion point to the chain pair closest to the origin.
        let mut best = a;
        let mut best_score = chain_score(best, circles, &next);
        let mut cursor = next[c];
        while cursor != c {
            let score = chain_score(cursor, circles, &next);
            if score < best_score {
                best = cursor;
                best_score = score;
            }
            cursor = next[cursor];
        }
        a = best;
        b = next[a];

        i += 1;
    }

    let mut chain = vec![circles[b]];
    let mut cursor = next[b];
    while cursor != b {
        chain.push(circles[cursor]);
        cursor = next[cursor];
    }
    let enclosing = enclose(&chain);

    for circle in circles.iter_mut() {
        circle.x -= enclosing.x;
        circle.y -= enclosing.y;
    }
    enclosing.r
}

/// Position for a circle of radius `r` tangent to both `a` and `b`.
fn placed_tangent(b: Circle, a: Circle, r: f64) -> Circle {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d2 = dx * dx + dy * dy;
    if d2 > f64::EPSILON {
        let a2 = {
            let sum = a.r + r;
            sum * sum
        };
        let b2 = {
            let sum = b.r + r;
            sum * sum
        };
        if a2 > b2 {
            let x = (d2 + b2 - a2) / (2.0 * d2);
            let y = (b2 / d2 - x * x).max(0.0).sqrt();
            Circle {
                x: b.x - x * dx - y * dy,
                y: b.y - x * dy + y * dx,
                r,
            }
        } else {
            let x = (d2 + a2 - b2) / (2.0 * d2);
            let y = (a2 / d2 - x * x).max(0.0).sqrt();
            Circle {
                x: a.x + x * dx - y * dy,
                y: a.y + x * dy + y * dx,
                r,
            }
        }
    } else {
        Circle {
            x: a.x + r,
            y: a.y,
            r,
        }
    }
}

fn intersects(a: Circle, b: Circle) -> bool {
    let dr = a.r + b.r - 1e-6;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

fn chain_score(index: usize, circles: &[Circle], next: &[usize]) -> f64 {
    let a = circles[index];
    let b = circles[next[index]];
    let ab = a.r + b.r;
    let dx = (a.x * b.r + b.x * a.r) / ab;
    let dy = (a.y * b.r + b.y * a.r) / ab;
    dx * dx + dy * dy
}

/// Minimal enclosing circle of a set of circles, by incremental basis
/// extension. Deterministic: circles are visited in input order.
fn enclose(circles: &[Circle]) -> Circle {
    let mut enclosing: Option<Circle> = None;
    let mut basis: Vec<Circle> = Vec::new();

    let mut i = 0;
    while i < circles.len() {
        let p = circles[i];
        match enclosing {
            Some(e) if encloses_weak(e, p) => i += 1,
            _ => {
                basis = extend_basis(&basis, p);
                enclosing = Some(enclose_basis(&basis));
                i = 0;
            }
        }
    }

    enclosing.unwrap_or(Circle {
        x: 0.0,
        y: 0.0,
        r: 0.0,
    })
}

fn extend_basis(basis: &[Circle], p: Circle) -> Vec<Circle> {
    if encloses_weak_all(p, basis) {
        return vec![p];
    }

    for &a in basis {
        if encloses_not(p, a) && encloses_weak_all(enclose_basis2(a, p), basis) {
            return vec![a, p];
        }
    }

    for i in 0..basis.len() {
        for j in (i + 1)..basis.len() {
            let (a, b) = (basis[i], basis[j]);
            if encloses_not(enclose_basis2(a, b), p)
                && encloses_not(enclose_basis2(a, p), b)
                && encloses_not(enclose_basis2(b, p), a)
                && encloses_weak_all(enclose_basis3(a, b, p), basis)
            {
                return vec![a, b, p];
            }
        }
    }

    unreachable!("enclosing basis cannot be extended");
}

fn encloses_not(a: Circle, b: Circle) -> bool {
    let dr = a.r - b.r;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr < 0.0 || dr * dr < dx * dx + dy * dy
}

fn encloses_weak(a: Circle, b: Circle) -> bool {
    let dr = a.r - b.r + a.r.max(b.r).max(1.0) * 1e-9;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

fn encloses_weak_all(a: Circle, circles: &[Circle]) -> bool {
    circles.iter().all(|&c| encloses_weak(a, c))
}

fn enclose_basis(basis: &[Circle]) -> Circle {
    match basis {
        [a] => *a,
        [a, b] => enclose_basis2(*a, *b),
        [a, b, c] => enclose_basis3(*a, *b, *c),
        _ => unreachable!("basis holds at most three circles"),
    }
}

fn enclose_basis2(a: Circle, b: Circle) -> Circle {
    let x21 = b.x - a.x;
    let y21 = b.y - a.y;
    let r21 = b.r - a.r;
    let l = (x21 * x21 + y21 * y21).sqrt();
    Circle {
        x: (a.x + b.x + x21 / l * r21) / 2.0,
        y: (a.y + b.y + y21 / l * r21) / 2.0,
        r: (l + a.r + b.r) / 2.0,
    }
}

fn enclose_basis3(a: Circle, b: Circle, c: Circle) -> Circle {
    let a2 = a.x - b.x;
    let a3 = a.x - c.x;
    let b2 = a.y - b.y;
    let b3 = a.y - c.y;
    let c2 = b.r - a.r;
    let c3 = c.r - a.r;
    let d1 = a.x * a.x + a.y * a.y - a.r * a.r;
    let d2 = d1 - b.x * b.x - b.y * b.y + b.r * b.r;
    let d3 = d1 - c.x * c.x - c.y * c.y + c.r * c.r;
    let ab = a3 * b2 - a2 * b3;
    let xa = (b2 * d3 - b3 * d2) / (ab * 2.0) - a.x;
    let xb = (b3 * c2 - b2 * c3) / ab;
    let ya = (a3 * d2 - a2 * d3) / (ab * 2.0) - a.y;
    let yb = (a2 * c3 - a3 * c2) / ab;
    let big_a = xb * xb + yb * yb - 1.0;
    let big_b = 2.0 * (a.r + xa * xb + ya * yb);
    let big_c = xa * xa + ya * ya - a.r * a.r;
    let r = -(if big_a.abs() > 1e-6 {
        (big_b + (big_b * big_b - 4.0 * big_a * big_c).max(0.0).sqrt()) / (2.0 * big_a)
    } else {
        big_c / big_b
    });
    Circle {
        x: a.x + xa + xb * r,
        y: a.y + ya + yb * r,
        r,
    }
}
