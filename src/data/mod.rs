pub mod orbit;
pub mod rows;
pub mod scale;
pub mod timeline;

pub use orbit::{NodeKind, OrbitGraph, OrbitInput, OrbitNode, OrbitSources, prepare_orbit_graph};
pub use timeline::{Commit, MonthGroup, load_commit_rows, prepare_commit_timeline};
