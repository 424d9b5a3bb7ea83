use eframe::egui::{Vec2, vec2};

const QUADTREE_LEAF_CAPACITY: usize = 12;
const QUADTREE_MAX_DEPTH: usize = 10;

/// Axis-aligned square cell.
#[derive(Clone, Copy, Debug)]
pub(crate) struct QuadBounds {
    pub(crate) center: Vec2,
    pub(crate) half_extent: f32,
}

impl QuadBounds {
    /// Square around every point, padded by one unit. `None` when there are
    /// no points or any coordinate is not finite.
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let (min, max) = points.iter().try_fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(min, max), &point| point.is_finite().then(|| (min.min(point), max.max(point))),
        )?;

        let span = (max - min).max_elem().max(1.0);
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span * 0.5 + 1.0,
        })
    }

    pub(crate) fn contains(self, point: Vec2) -> bool {
        let offset = (point - self.center).abs();
        offset.x <= self.half_extent && offset.y <= self.half_extent
    }

    /// Quadrant bits: 1 for the right half, 2 for the lower half (larger y).
    fn quadrant_for(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let sign = |bit: usize| if quadrant & bit == 0 { -quarter } else { quarter };
        Self {
            center: self.center + vec2(sign(1), sign(2)),
            half_extent: quarter,
        }
    }

    fn gap_sq(self, center: Vec2, half_extent: f32) -> f32 {
        let gap = (self.center - center).abs() - Vec2::splat(self.half_extent + half_extent);
        gap.max(Vec2::ZERO).length_sq()
    }

    pub(crate) fn distance_sq_to(self, other: Self) -> f32 {
        self.gap_sq(other.center, other.half_extent)
    }

    pub(crate) fn distance_sq_to_point(self, point: Vec2) -> f32 {
        self.gap_sq(point, 0.0)
    }
}

/// Region quadtree over point positions. Each cell also tracks the largest
/// radius below it so circle queries can prune whole subtrees.
#[derive(Debug)]
pub(crate) struct QuadNode {
    pub(crate) bounds: QuadBounds,
    pub(crate) center_of_mass: Vec2,
    pub(crate) mass: f32,
    pub(crate) max_radius: f32,
    pub(crate) indices: Vec<usize>,
    pub(crate) children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
    pub(crate) fn build(positions: &[Vec2], radii: &[f32]) -> Option<Self> {
        let bounds = QuadBounds::enclosing(positions)?;
        let indices = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::cell(bounds, indices, positions, radii, 0))
    }

    fn cell(
        bounds: QuadBounds,
        indices: Vec<usize>,
        positions: &[Vec2],
        radii: &[f32],
        depth: usize,
    ) -> Self {
        let mass = indices.len() as f32;
        let sum = indices.iter().fold(Vec2::ZERO, |sum, &index| sum + positions[index]);
        let max_radius = indices
            .iter()
            .filter_map(|&index| radii.get(index).copied())
            .fold(0.0_f32, f32::max);

        let mut node = Self {
            bounds,
            center_of_mass: if mass > 0.0 { sum / mass } else { Vec2::ZERO },
            mass,
            max_radius,
            indices,
            children: Default::default(),
        };
        if depth >= QUADTREE_MAX_DEPTH || node.indices.len() <= QUADTREE_LEAF_CAPACITY {
            return node;
        }

        let mut buckets: [Vec<usize>; 4] = Default::default();
        for &index in &node.indices {
            buckets[bounds.quadrant_for(positions[index])].push(index);
        }
        // All points in one quadrant (e.g. coincident): splitting never ends.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return node;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                let child = Self::cell(bounds.child(quadrant), bucket, positions, radii, depth + 1);
                node.children[quadrant] = Some(Box::new(child));
            }
        }
        node.indices.clear();
        node
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_none())
    }

    /// Index and distance of the position closest to `point`.
    pub(crate) fn nearest(&self, point: Vec2, positions: &[Vec2]) -> Option<(usize, f32)> {
        let mut best = None;
        self.nearest_into(point, positions, &mut best);
        best.map(|(index, distance_sq)| (index, distance_sq.sqrt()))
    }

    fn nearest_into(&self, point: Vec2, positions: &[Vec2], best: &mut Option<(usize, f32)>) {
        if let Some((_, best_sq)) = *best
            && self.bounds.distance_sq_to_point(point) >= best_sq
        {
            return;
        }

        if self.is_leaf() {
            for &index in &self.indices {
                let distance_sq = (positions[index] - point).length_sq();
                if best.is_none_or(|(_, best_sq)| distance_sq < best_sq) {
                    *best = Some((index, distance_sq));
                }
            }
            return;
        }

        let mut order = self
            .children
            .iter()
            .flatten()
            .map(|child| (child.bounds.distance_sq_to_point(point), child))
            .collect::<Vec<_>>();
        order.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (_, child) in order {
            child.nearest_into(point, positions, best);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(count: usize) -> Vec<Vec2> {
        (0..count)
            .map(|index| vec2((index % 10) as f32 * 13.0, (index / 10) as f32 * 7.0))
            .collect()
    }

    #[test]
    fn nearest_matches_linear_scan() {
        let positions = grid(150);
        let radii = vec![2.0; positions.len()];
        let tree = QuadNode::build(&positions, &radii).unwrap();
        assert!(!tree.is_leaf());

        for query in [vec2(-5.0, -5.0), vec2(61.0, 30.2), vec2(200.0, 90.0), vec2(6.4, 3.6)] {
            let (index, distance) = tree.nearest(query, &positions).unwrap();
            let expected = positions
                .iter()
                .map(|position| (*position - query).length())
                .fold(f32::INFINITY, f32::min);
            assert!((distance - expected).abs() < 1e-4, "{query:?} -> {index}");
        }
    }

    #[test]
    fn cells_track_largest_radius() {
        let positions = grid(40);
        let mut radii = vec![1.0; positions.len()];
        radii[33] = 9.0;
        let tree = QuadNode::build(&positions, &radii).unwrap();
        assert_eq!(tree.max_radius, 9.0);
        assert_eq!(tree.mass, 40.0);
    }

    #[test]
    fn children_split_the_cell_by_quadrant_bits() {
        let bounds = QuadBounds {
            center: Vec2::ZERO,
            half_extent: 8.0,
        };
        for (quadrant, point) in [vec2(-1.0, -1.0), vec2(1.0, -1.0), vec2(-1.0, 1.0), vec2(1.0, 1.0)]
            .into_iter()
            .enumerate()
        {
            assert_eq!(bounds.quadrant_for(point), quadrant);
            let child = bounds.child(quadrant);
            assert!(child.contains(point * 4.0));
            assert_eq!(child.half_extent, 4.0);
        }
        assert_eq!(bounds.distance_sq_to_point(vec2(11.0, 12.0)), 25.0);
        assert_eq!(bounds.distance_sq_to(bounds.child(3)), 0.0);
    }

    #[test]
    fn empty_or_non_finite_input_builds_nothing() {
        assert!(QuadNode::build(&[], &[]).is_none());
        assert!(QuadNode::build(&[vec2(f32::NAN, 0.0)], &[1.0]).is_none());
    }
}
