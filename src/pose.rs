use glam::Mat4;

use crate::skeleton::{BONE_SENTINEL, BoneIndex, Skeleton};

/// Per-bone local matrices for one frame, in bone-index order.
///
/// Produced by the host's pose function; how it samples or interpolates its
/// animation data is its own business.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    pub locals: Vec<Mat4>,
}

impl Pose {
    pub fn new(locals: Vec<Mat4>) -> Self {
        Self { locals }
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum PoseError {
    #[error("pose supplies {actual} bones, skeleton has {expected}")]
    BoneCountMismatch { expected: usize, actual: usize },

    #[error("bone {index} has a non-finite pose matrix")]
    NonFinite { index: BoneIndex },
}

/// Compose posed world matrices along each ancestor chain in a single
/// parents-first pass. A non-finite local matrix aborts the pass; the caller
/// retries naturally next frame since nothing is cached.
pub fn world_matrices(skeleton: &Skeleton, pose: &Pose) -> Result<Vec<Mat4>, PoseError> {
    if pose.locals.len() != skeleton.len() {
        return Err(PoseError::BoneCountMismatch {
            expected: skeleton.len(),
            actual: pose.locals.len(),
        });
    }

    let mut worlds: Vec<Mat4> = Vec::with_capacity(skeleton.len());
    for (index, (bone, local)) in skeleton.bones().iter().zip(&pose.locals).enumerate() {
        if !local.is_finite() {
            return Err(PoseError::NonFinite {
                index: index as BoneIndex,
            });
        }

        let world = if bone.parent == BONE_SENTINEL {
            *local
        } else {
            worlds[bone.parent as usize] * *local
        };
        worlds.push(world);
    }

    Ok(worlds)
}

/// Per-bone skinning matrices for one frame: posed world matrix times the
/// cached inverse bind matrix. Recomputed from scratch every call; a change
/// anywhere in a chain moves every descendant bone.
pub fn skinning_matrices(skeleton: &Skeleton, pose: &Pose) -> Result<SkinningMatrices, PoseError> {
    let worlds = world_matrices(skeleton, pose)?;
    let matrices = worlds
        .iter()
        .zip(skeleton.inverse_bind_matrices())
        .map(|(world, inverse_bind)| *world * *inverse_bind)
        .collect();

    Ok(SkinningMatrices { matrices })
}

/// Flat, bone-index-ordered skinning matrix block for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SkinningMatrices {
    matrices: Vec<Mat4>,
}

impl SkinningMatrices {
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    pub fn get(&self, bone: BoneIndex) -> Option<&Mat4> {
        self.matrices.get(bone as usize)
    }

    pub fn as_slice(&self) -> &[Mat4] {
        &self.matrices
    }

    /// The upload layout: contiguous 16-float column-major blocks, one per
    /// bone, in bone-index order.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.matrices)
    }
}
