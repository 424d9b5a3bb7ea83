pub mod geometry;
pub mod orbit;
pub(crate) mod quadtree;
pub mod relax;
pub mod spatial;
pub mod timeline;

pub use orbit::{OrbitLayoutConfig, RingGeometry, layout_orbit_graph};
pub use spatial::{Hit, NodeIndex};
pub use timeline::{CommitRef, RevealPhase, TimelineLayout, TimelineLayoutConfig};
