use eframe::egui::{Vec2, vec2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

const ENCLOSE_SEED: u64 = 0x00c1_7c1e;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Circle {
    pub fn new(x: f64, y: f64, r: f64) -> Self {
        Self { x, y, r }
    }

    pub fn center(self) -> Vec2 {
        vec2(self.x as f32, self.y as f32)
    }

    #[cfg(test)]
    pub fn contains_circle(self, other: Circle, tolerance: f64) -> bool {
        let distance = (other.x - self.x).hypot(other.y - self.y);
        distance + other.r <= self.r + tolerance
    }
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

fn encloses_weak_all(a: Circle, basis: &[Circle]) -> bool {
    basis.iter().all(|b| encloses_weak(a, *b))
}

fn enclose_basis(basis: &[Circle]) -> Option<Circle> {
    match *basis {
        [a] => Some(a),
        [a, b] => Some(enclose_basis2(a, b)),
        [a, b, c] => enclose_basis3(a, b, c),
        _ => None,
    }
}

fn enclose_basis2(a: Circle, b: Circle) -> Circle {
    let x21 = b.x - a.x;
    let y21 = b.y - a.y;
    let r21 = b.r - a.r;
    let l = x21.hypot(y21);
    if l == 0.0 {
        return if a.r >= b.r { a } else { b };
    }
    Circle::new(
        (a.x + b.x + x21 / l * r21) / 2.0,
        (a.y + b.y + y21 / l * r21) / 2.0,
        (l + a.r + b.r) / 2.0,
    )
}

fn enclose_basis3(a: Circle, b: Circle, c: Circle) -> Option<Circle> {
    let (x1, y1, r1) = (a.x, a.y, a.r);
    let a2 = x1 - b.x;
    let a3 = x1 - c.x;
    let b2 = y1 - b.y;
    let b3 = y1 - c.y;
    let c2 = b.r - r1;
    let c3 = c.r - r1;
    let d1 = x1 * x1 + y1 * y1 - r1 * r1;
    let d2 = d1 - b.x * b.x - b.y * b.y + b.r * b.r;
    let d3 = d1 - c.x * c.x - c.y * c.y + c.r * c.r;
    let ab = a3 * b2 - a2 * b3;
    if ab == 0.0 {
        return None;
    }

    let xa = (b2 * d3 - b3 * d2) / (ab * 2.0) - x1;
    let xb = (b3 * c2 - b2 * c3) / ab;
    let ya = (a3 * d2 - a2 * d3) / (ab * 2.0) - y1;
    let yb = (a2 * c3 - a3 * c2) / ab;
    let qa = xb * xb + yb * yb - 1.0;
    let qb = 2.0 * (r1 + xa * xb + ya * yb);
    let qc = xa * xa + ya * ya - r1 * r1;
    let r = -(if qa.abs() > 1e-6 {
        (qb + (qb * qb - 4.0 * qa * qc).sqrt()) / (2.0 * qa)
    } else {
        qc / qb
    });

    let circle = Circle::new(x1 + xa + xb * r, y1 + ya + yb * r, r);
    (circle.x.is_finite() && circle.y.is_finite() && circle.r.is_finite()).then_some(circle)
}

fn extend_basis(basis: &[Circle], p: Circle) -> Option<Vec<Circle>> {
    if encloses_weak_all(p, basis) {
        return Some(vec![p]);
    }

    for &b in basis {
        if encloses_not(p, b) && encloses_weak_all(enclose_basis2(b, p), basis) {
            return Some(vec![b, p]);
        }
    }

    for i in 0..basis.len().saturating_sub(1) {
        for j in (i + 1)..basis.len() {
            let (bi, bj) = (basis[i], basis[j]);
            if encloses_not(enclose_basis2(bi, bj), p)
                && encloses_not(enclose_basis2(bi, p), bj)
                && encloses_not(enclose_basis2(bj, p), bi)
                && let Some(candidate) = enclose_basis3(bi, bj, p)
                && encloses_weak_all(candidate, basis)
            {
                return Some(vec![bi, bj, p]);
            }
        }
    }

    None
}

/// Centroid-based cover used when the basis search fails numerically.
fn enclose_fallback(circles: &[Circle]) -> Circle {
    let count = circles.len() as f64;
    let x = circles.iter().map(|c| c.x).sum::<f64>() / count;
    let y = circles.iter().map(|c| c.y).sum::<f64>() / count;
    let r = circles
        .iter()
        .map(|c| (c.x - x).hypot(c.y - y) + c.r)
        .fold(0.0, f64::max);
    Circle::new(x, y, r)
}

/// Smallest circle enclosing all `circles`, by incremental extension of a
/// support basis of up to three circles over a shuffled input.
pub fn enclose(circles: &[Circle]) -> Option<Circle> {
    match circles {
        [] => return None,
        [single] => return Some(*single),
        _ => {}
    }

    let mut shuffled = circles.to_vec();
    shuffled.shuffle(&mut StdRng::seed_from_u64(ENCLOSE_SEED));

    let limit = shuffled.len() * shuffled.len().max(16) * 4;
    let mut basis: Vec<Circle> = Vec::new();
    let mut enclosing: Option<Circle> = None;
    let mut index = 0;
    let mut visits = 0;

    while index < shuffled.len() {
        visits += 1;
        if visits > limit {
            return Some(enclose_fallback(circles));
        }

        let p = shuffled[index];
        if enclosing.is_some_and(|e| encloses_weak(e, p)) {
            index += 1;
            continue;
        }

        let Some(next) = extend_basis(&basis, p) else {
            return Some(enclose_fallback(circles));
        };
        basis = next;
        enclosing = enclose_basis(&basis);
        index = 0;
    }

    enclosing.or_else(|| Some(enclose_fallback(circles)))
}

fn place(b: Circle, a: Circle, c: &mut Circle) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d2 = dx * dx + dy * dy;
    if d2 == 0.0 {
        c.x = a.x + c.r;
        c.y = a.y;
        return;
    }

    let a2 = (a.r + c.r).powi(2);
    let b2 = (b.r + c.r).powi(2);
    if a2 > b2 {
        let x = (d2 + b2 - a2) / (2.0 * d2);
        let y = (b2 / d2 - x * x).max(0.0).sqrt();
        c.x = b.x - x * dx - y * dy;
        c.y = b.y - x * dy + y * dx;
    } else {
        let x = (d2 + a2 - b2) / (2.0 * d2);
        let y = (a2 / d2 - x * x).max(0.0).sqrt();
        c.x = a.x + x * dx - y * dy;
        c.y = a.y + x * dy + y * dx;
    }
}

fn intersects(a: Circle, b: Circle) -> bool {
    let dr = a.r + b.r - 1e-6;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

/// Front-chain packing: circles are placed tangent to a pair of neighbours
/// on the chain, in input order, choosing the pair closest to the centroid.
/// Returns the enclosing radius; circles end up centred on the enclosing circle.
pub fn pack_siblings(circles: &mut [Circle]) -> f64 {
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

    let (first, second) = (circles[0], circles[1]);
    place(second, first, &mut circles[2]);

    // front chain as a circular doubly linked list over circle indices
    let mut next = vec![usize::MAX; n];
    let mut prev = vec![usize::MAX; n];
    let (mut a, mut b) = (0, 1);
    next[0] = 1;
    prev[1] = 0;
    next[1] = 2;
    prev[2] = 1;
    next[2] = 0;
    prev[0] = 2;

    let score = |circles: &[Circle], next: &[usize], node: usize| {
        let a = circles[node];
        let b = circles[next[node]];
        let ab = a.r + b.r;
        let dx = (a.x * b.r + b.x * a.r) / ab;
        let dy = (a.y * b.r + b.y * a.r) / ab;
        dx * dx + dy * dy
    };

    let mut i = 3;
    'pack: while i < n {
        let (anchor_a, anchor_b) = (circles[a], circles[b]);
        place(anchor_a, anchor_b, &mut circles[i]);
        let c = circles[i];

        let (mut j, mut k) = (next[b], prev[a]);
        let (mut sj, mut sk) = (circles[b].r, circles[a].r);
        loop {
            if sj <= sk {
                if intersects(circles[j], c) {
                    b = j;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sj += circles[j].r;
                j = next[j];
            } else {
                if intersects(circles[k], c) {
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

        prev[i] = a;
        next[i] = b;
        next[a] = i;
        prev[b] = i;
        b = i;

        let mut best = score(circles, &next, a);
        let mut node = next[i];
        while node != b {
            let candidate = score(circles, &next, node);
            if candidate < best {
                a = node;
                best = candidate;
            }
            node = next[node];
        }
        b = next[a];
        i += 1;
    }

    let mut chain = vec![circles[b]];
    let mut node = next[b];
    while node != b {
        chain.push(circles[node]);
        node = next[node];
    }
    let Some(enclosing) = enclose(&chain) else {
        return 0.0;
    };

    for circle in circles.iter_mut() {
        circle.x -= enclosing.x;
        circle.y -= enclosing.y;
    }
    enclosing.r
}

/// Which of the two circle centres an arc between two points is drawn around.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArcSide {
    Clockwise,
    CounterClockwise,
}

/// Both centres of circles of radius `radius` through `from` and `to`, or
/// `None` when the points are further apart than the diameter.
pub fn arc_centers(from: Vec2, to: Vec2, radius: f32) -> Option<(Vec2, Vec2)> {
    let chord = to - from;
    let half = chord.length() * 0.5;
    if radius <= 0.0 || half > radius || half == 0.0 {
        return None;
    }

    let midpoint = from + chord * 0.5;
    let offset = (radius * radius - half * half).max(0.0).sqrt();
    let perpendicular = vec2(-chord.y, chord.x) / (2.0 * half);
    Some((midpoint + perpendicular * offset, midpoint - perpendicular * offset))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arc {
    pub center: Vec2,
    pub radius: f32,
    pub start_angle: f32,
    /// Signed sweep: positive runs toward increasing angle.
    pub sweep: f32,
}

impl Arc {
    pub fn point_at(self, t: f32) -> Vec2 {
        let angle = self.start_angle + self.sweep * t;
        self.center + vec2(angle.cos(), angle.sin()) * self.radius
    }

    pub fn length(self) -> f32 {
        self.sweep.abs() * self.radius
    }
}

/// Minor arc of radius `radius` from `from` to `to` around the chosen centre.
pub fn arc_between(from: Vec2, to: Vec2, radius: f32, side: ArcSide) -> Option<Arc> {
    let (clockwise, counter_clockwise) = arc_centers(from, to, radius)?;
    let center = match side {
        ArcSide::Clockwise => clockwise,
        ArcSide::CounterClockwise => counter_clockwise,
    };

    let start = from - center;
    let end = to - center;
    let start_angle = start.y.atan2(start.x);
    let mut sweep = end.y.atan2(end.x) - start_angle;
    while sweep > std::f32::consts::PI {
        sweep -= std::f32::consts::TAU;
    }
    while sweep < -std::f32::consts::PI {
        sweep += std::f32::consts::TAU;
    }

    Some(Arc {
        center,
        radius,
        start_angle,
        sweep,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covers_all(outer: Circle, circles: &[Circle]) -> bool {
        circles.iter().all(|c| outer.contains_circle(*c, 1e-6))
    }

    #[test]
    fn enclose_handles_degenerate_inputs() {
        assert_eq!(enclose(&[]), None);
        let single = Circle::new(3.0, -2.0, 5.0);
        assert_eq!(enclose(&[single]), Some(single));
    }

    #[test]
    fn enclose_two_circles_spans_their_far_edges() {
        let outer = enclose(&[Circle::new(-10.0, 0.0, 5.0), Circle::new(10.0, 0.0, 5.0)]).unwrap();
        assert!(outer.x.abs() < 1e-9 && outer.y.abs() < 1e-9);
        assert!((outer.r - 15.0).abs() < 1e-9);
    }

    #[test]
    fn enclose_three_equal_circles_in_a_triangle() {
        let side: f64 = 20.0;
        let height = side * 3.0_f64.sqrt() / 2.0;
        let circles = [
            Circle::new(0.0, 0.0, 2.0),
            Circle::new(side, 0.0, 2.0),
            Circle::new(side / 2.0, height, 2.0),
        ];
        let outer = enclose(&circles).unwrap();
        let circumradius = side / 3.0_f64.sqrt();
        assert!((outer.r - (circumradius + 2.0)).abs() < 1e-6);
        assert!(covers_all(outer, &circles));
    }

    #[test]
    fn enclose_ignores_nested_circles() {
        let circles = [
            Circle::new(0.0, 0.0, 30.0),
            Circle::new(5.0, 5.0, 3.0),
            Circle::new(-10.0, 2.0, 8.0),
        ];
        assert_eq!(enclose(&circles), Some(circles[0]));
    }

    #[test]
    fn packed_siblings_do_not_overlap_and_are_enclosed() {
        let mut circles = (0..60)
            .map(|index| Circle::new(0.0, 0.0, 1.0 + (index * 7 % 11) as f64))
            .collect::<Vec<_>>();
        let radius = pack_siblings(&mut circles);

        for (i, a) in circles.iter().enumerate() {
            for b in &circles[i + 1..] {
                let distance = (a.x - b.x).hypot(a.y - b.y);
                assert!(distance + 1e-4 >= a.r + b.r);
            }
        }
        let centred = Circle::new(0.0, 0.0, radius);
        assert!(covers_all(centred, &circles));
        let area = circles.iter().map(|c| c.r * c.r).sum::<f64>();
        assert!(radius * radius < area * 2.5);
    }

    #[test]
    fn pack_small_counts() {
        let mut one = [Circle::new(9.0, 9.0, 4.0)];
        assert_eq!(pack_siblings(&mut one), 4.0);
        assert_eq!((one[0].x, one[0].y), (0.0, 0.0));

        let mut two = [Circle::new(0.0, 0.0, 4.0), Circle::new(0.0, 0.0, 6.0)];
        assert_eq!(pack_siblings(&mut two), 10.0);
        assert_eq!(two[0].x + two[0].r, two[1].x - two[1].r);

        let mut three = [Circle::new(0.0, 0.0, 3.0); 3];
        let radius = pack_siblings(&mut three);
        assert!(covers_all(Circle::new(0.0, 0.0, radius), &three));
        assert_eq!(pack_siblings(&mut []), 0.0);
    }

    #[test]
    fn arc_centers_are_mirrored_across_the_chord() {
        let from = vec2(0.0, 0.0);
        let to = vec2(10.0, 0.0);
        let (c1, c2) = arc_centers(from, to, 10.0).unwrap();

        for center in [c1, c2] {
            assert!(((center - from).length() - 10.0).abs() < 1e-4);
            assert!(((center - to).length() - 10.0).abs() < 1e-4);
        }
        assert!((c1.x - 5.0).abs() < 1e-5 && (c2.x - 5.0).abs() < 1e-5);
        assert!((c1.y + c2.y).abs() < 1e-5);
        assert!(c1.y > 0.0);

        assert!(arc_centers(from, to, 4.0).is_none());
        assert!(arc_centers(from, from, 4.0).is_none());
    }

    #[test]
    fn arc_sides_sweep_in_opposite_directions() {
        let from = vec2(0.0, 0.0);
        let to = vec2(10.0, 0.0);
        let clockwise = arc_between(from, to, 10.0, ArcSide::Clockwise).unwrap();
        let counter = arc_between(from, to, 10.0, ArcSide::CounterClockwise).unwrap();

        assert!(clockwise.sweep > 0.0);
        assert!(counter.sweep < 0.0);
        for arc in [clockwise, counter] {
            assert!((arc.point_at(0.0) - from).length() < 1e-4);
            assert!((arc.point_at(1.0) - to).length() < 1e-4);
            // minor arc of a chord equal to the radius spans 60 degrees
            assert!((arc.sweep.abs() - std::f32::consts::FRAC_PI_3).abs() < 1e-4);
        }
    }
}
