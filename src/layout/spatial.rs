use eframe::egui::Vec2;

use super::quadtree::QuadNode;

/// Nearest-centre lookup over a fixed set of circles. Rebuilt after a layout
/// pass, never per relaxation step.
#[derive(Debug, Default)]
pub struct NodeIndex {
    positions: Vec<Vec2>,
    radii: Vec<f32>,
    tree: Option<QuadNode>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub index: usize,
    pub distance: f32,
}

impl NodeIndex {
    pub fn build(circles: impl IntoIterator<Item = (Vec2, f32)>) -> Self {
        let (positions, radii): (Vec<_>, Vec<_>) = circles.into_iter().unzip();
        let tree = QuadNode::build(&positions, &radii);
        Self {
            positions,
            radii,
            tree,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn nearest(&self, point: Vec2) -> Option<Hit> {
        let (index, distance) = self.tree.as_ref()?.nearest(point, &self.positions)?;
        Some(Hit { index, distance })
    }

    /// Nearest circle whose centre lies within its radius plus `slack` of `point`.
    pub fn hit(&self, point: Vec2, slack: f32) -> Option<Hit> {
        self.nearest(point)
            .filter(|hit| hit.distance < self.radii[hit.index] + slack)
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    #[test]
    fn hit_requires_distance_below_radius_plus_slack() {
        let index = NodeIndex::build([(vec2(0.0, 0.0), 10.0), (vec2(100.0, 0.0), 2.0)]);
        assert_eq!(index.len(), 2);

        assert_eq!(index.hit(vec2(45.0, 0.0), 50.0).map(|hit| hit.index), Some(0));
        assert_eq!(index.hit(vec2(70.0, 0.0), 40.0).map(|hit| hit.index), Some(1));
        assert!(index.hit(vec2(50.0, 200.0), 50.0).is_none());
    }

    #[test]
    fn empty_index_never_hits() {
        let index = NodeIndex::build(std::iter::empty());
        assert!(index.is_empty());
        assert!(index.nearest(Vec2::ZERO).is_none());
        assert!(index.hit(Vec2::ZERO, 1000.0).is_none());
    }
}
