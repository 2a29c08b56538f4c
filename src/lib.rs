mod builder;
pub mod geometry;
mod morton;
pub mod scheduler;
mod traverse;
mod util;
mod validate;

#[cfg(test)]
mod test_fixtures;

pub use builder::{Builder, Bvh, Node, build};
pub use geometry::{Aabb, Intersection, Ray, Real};
pub use morton::MortonCode;
pub use scheduler::{DefaultScheduler, Scheduler, SerialScheduler, WorkDivision, WorkerCount};
pub use traverse::{Traverser, traverse};
pub use util::Stats;
pub use validate::{ValidationError, ValidationFailure, check_bvh, validate};
