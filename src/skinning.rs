use glam::{Mat4, Vec3, Vec4};

use crate::skeleton::BoneIndex;

/// Maximum bone influences per vertex.
pub const MAX_INFLUENCES: usize = 4;

/// Up to four (bone, weight) pairs for one vertex. Unused slots carry weight
/// zero; their bone index is ignored.
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct VertexInfluences {
    pub bones: [BoneIndex; MAX_INFLUENCES],
    pub weights: [f32; MAX_INFLUENCES],
}

impl Default for VertexInfluences {
    fn default() -> Self {
        Self {
            bones: [0; MAX_INFLUENCES],
            weights: [0.0; MAX_INFLUENCES],
        }
    }
}

impl VertexInfluences {
    /// A vertex following a single bone.
    pub fn single(bone: BoneIndex) -> Self {
        Self {
            bones: [bone, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }

    /// A vertex split evenly between two bones.
    pub fn blended(a: BoneIndex, b: BoneIndex) -> Self {
        Self {
            bones: [a, b, 0, 0],
            weights: [0.5, 0.5, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum SkinError {
    #[error("vertex {vertex} references bone {bone}, but the skeleton has {bone_count} bones")]
    BoneIndexOutOfRange {
        vertex: usize,
        bone: BoneIndex,
        bone_count: usize,
    },
}

/// Blend `rest` through up to four skinning matrices.
///
/// Weights are applied exactly as authored: a set that does not sum to one
/// scales the result accordingly and is never renormalized here. Bone
/// indices with nonzero weight must be in range for `matrices` (see
/// [`SkinBinding::new`]). Reads only shared slices, so hosts may fan this
/// out across vertices on worker threads.
pub fn skin_point(matrices: &[Mat4], influences: &VertexInfluences, rest: Vec3) -> Vec3 {
    let rest = rest.extend(1.0);
    let mut skinned = Vec4::ZERO;
    for slot in 0..MAX_INFLUENCES {
        let weight = influences.weights[slot];
        if weight == 0.0 {
            continue;
        }
        skinned += matrices[influences.bones[slot] as usize] * rest * weight;
    }
    skinned.truncate()
}

/// Per-vertex influences validated against a bone count.
///
/// Validation happens once, here, so the per-vertex blend can index the
/// matrix array without checks.
#[derive(Clone, Debug)]
pub struct SkinBinding {
    influences: Vec<VertexInfluences>,
}

impl SkinBinding {
    /// Slots with nonzero weight must reference a bone inside the skeleton.
    /// Zero-weight slots may carry any index; their contribution is
    /// multiplied by zero and the index is never used.
    pub fn new(
        influences: Vec<VertexInfluences>,
        bone_count: usize,
    ) -> Result<Self, SkinError> {
        for (vertex, influence) in influences.iter().enumerate() {
            for slot in 0..MAX_INFLUENCES {
                if influence.weights[slot] != 0.0 && influence.bones[slot] as usize >= bone_count {
                    return Err(SkinError::BoneIndexOutOfRange {
                        vertex,
                        bone: influence.bones[slot],
                        bone_count,
                    });
                }
            }
        }

        Ok(Self { influences })
    }

    pub fn len(&self) -> usize {
        self.influences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.influences.is_empty()
    }

    pub fn influences(&self) -> &[VertexInfluences] {
        &self.influences
    }

    /// Skin every rest position through `matrices`.
    pub fn skin_positions(&self, matrices: &[Mat4], rest_positions: &[Vec3]) -> Vec<Vec3> {
        self.influences
            .iter()
            .zip(rest_positions)
            .map(|(influences, &rest)| skin_point(matrices, influences, rest))
            .collect()
    }
}
