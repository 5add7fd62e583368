use glam::Mat4;

use crate::pose::{Pose, PoseError, SkinningMatrices, skinning_matrices};
use crate::scene::{NodeId, SceneError, SceneGraph};
use crate::skeleton::Skeleton;

/// Everything the host's pose function reports for one frame: bone local
/// matrices in bone-index order, plus local-matrix overrides for animated
/// scene nodes.
#[derive(Clone, Debug, Default)]
pub struct FramePose {
    pub bones: Pose,
    pub nodes: Vec<(NodeId, Mat4)>,
}

impl FramePose {
    pub fn bones_only(bones: Pose) -> Self {
        Self {
            bones,
            nodes: Vec::new(),
        }
    }
}

/// Matrices produced by one tick. Node world matrices are read from the
/// scene graph once the tick has returned.
#[derive(Debug)]
pub struct Frame {
    pub skinning: SkinningMatrices,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Pose(#[from] PoseError),
}

/// Run one synchronous frame tick: sample the pose function, apply its
/// node-local updates, propagate every root of the scene graph once, then
/// compute the skinning matrix for every bone.
///
/// An error aborts the tick and is surfaced to the host loop; nothing is
/// retried internally. Both the graph pass and the bone pass recompute from
/// scratch, so the next tick starts clean. World matrices must only be read
/// after `tick` returns.
pub fn tick(
    scene: &mut SceneGraph,
    skeleton: &Skeleton,
    mut pose_fn: impl FnMut(f32) -> FramePose,
    time: f32,
) -> Result<Frame, FrameError> {
    let frame_pose = pose_fn(time);

    for (node, local_matrix) in frame_pose.nodes {
        scene.set_local_matrix(node, local_matrix)?;
    }
    scene.update_world_matrices()?;

    let skinning = skinning_matrices(skeleton, &frame_pose.bones)?;

    Ok(Frame { skinning })
}
