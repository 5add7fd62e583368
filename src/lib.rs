//! Scene-graph transform propagation and skeletal skinning, producing
//! per-node world matrices and per-bone skinning matrices for a renderer to
//! consume.
//!
//! Matrices compose as `parent_world * local` with column vectors transformed
//! on the right. This convention holds everywhere: the scene graph, the bind
//! pose and the per-frame bone pass.

mod frame;
mod math;
mod pose;
mod scene;
mod skeleton;
mod skinning;
mod transform;

pub use frame::*;
pub use math::*;
pub use pose::*;
pub use scene::*;
pub use skeleton::*;
pub use skinning::*;
pub use transform::*;
