use ahash::HashMap;
use glam::Mat4;

use crate::math;
use crate::pose::Pose;

pub type BoneIndex = u32;

/// Parent value for bones without a parent.
pub const BONE_SENTINEL: BoneIndex = BoneIndex::MAX;

/// A single bone. Its slot in the flat bone array is its identity; vertex
/// bone-index attributes refer to it by that slot.
#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,

    /// Index of the parent bone, or [`BONE_SENTINEL`] for a root. Parents
    /// always precede their children in the bone array.
    pub parent: BoneIndex,

    /// Rest-pose transform relative to the parent bone.
    pub bind_local: Mat4,
}

#[derive(Debug, thiserror::Error)]
pub enum SkeletonError {
    #[error("bone {index} has parent {parent}; parents must precede their children")]
    UnorderedParent { index: BoneIndex, parent: BoneIndex },

    #[error("bind pose of bone {index} (\"{name}\") is not invertible")]
    SingularBindPose { index: BoneIndex, name: String },
}

/// A fixed tree of bones with a cached inverse bind pose.
///
/// Topology and bone count never change after construction; the flat matrix
/// arrays are indexed by [`BoneIndex`] and never reordered, since vertex data
/// references bones by index.
#[derive(Clone, Debug)]
pub struct Skeleton {
    bones: Vec<Bone>,
    bind_world: Vec<Mat4>,
    inverse_bind: Vec<Mat4>,
    names: HashMap<String, BoneIndex>,
}

impl Skeleton {
    /// Build a skeleton from bones in topological order (parents before
    /// children). Bind-pose world matrices are composed along each ancestor
    /// chain and inverted once, here; a bind pose that cannot be inverted is
    /// a configuration error and the skeleton is unusable.
    pub fn new(bones: Vec<Bone>) -> Result<Self, SkeletonError> {
        let mut bind_world = Vec::with_capacity(bones.len());
        let mut inverse_bind = Vec::with_capacity(bones.len());
        let mut names = HashMap::default();

        for (index, bone) in bones.iter().enumerate() {
            let index = index as BoneIndex;
            let parent_world = if bone.parent == BONE_SENTINEL {
                Mat4::IDENTITY
            } else if bone.parent < index {
                bind_world[bone.parent as usize]
            } else {
                return Err(SkeletonError::UnorderedParent {
                    index,
                    parent: bone.parent,
                });
            };

            let world = parent_world * bone.bind_local;
            let inverse =
                math::try_inverse(&world).map_err(|_| SkeletonError::SingularBindPose {
                    index,
                    name: bone.name.clone(),
                })?;

            bind_world.push(world);
            inverse_bind.push(inverse);

            if names.contains_key(&bone.name) {
                tracing::warn!("duplicate bone name: {}", bone.name);
            } else {
                names.insert(bone.name.clone(), index);
            }
        }

        tracing::debug!("built skeleton with {} bones", bones.len());

        Ok(Self {
            bones,
            bind_world,
            inverse_bind,
            names,
        })
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, index: BoneIndex) -> Option<&Bone> {
        self.bones.get(index as usize)
    }

    /// Index of the first bone with this name.
    pub fn bone_by_name(&self, name: &str) -> Option<BoneIndex> {
        self.names.get(name).copied()
    }

    pub fn bind_world_matrices(&self) -> &[Mat4] {
        &self.bind_world
    }

    pub fn inverse_bind_matrices(&self) -> &[Mat4] {
        &self.inverse_bind
    }

    /// The rest pose: every bone at its bind-local transform.
    pub fn bind_pose(&self) -> Pose {
        Pose::new(self.bones.iter().map(|bone| bone.bind_local).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn chain(spacing: f32, count: usize) -> Vec<Bone> {
        (0..count)
            .map(|index| Bone {
                name: format!("bone_{index}"),
                parent: if index == 0 {
                    BONE_SENTINEL
                } else {
                    index as BoneIndex - 1
                },
                bind_local: if index == 0 {
                    Mat4::IDENTITY
                } else {
                    Mat4::from_translation(Vec3::new(spacing, 0.0, 0.0))
                },
            })
            .collect()
    }

    #[test]
    fn bind_world_composes_along_the_chain() {
        let skeleton = Skeleton::new(chain(4.0, 3)).unwrap();

        assert_eq!(skeleton.bind_world_matrices()[0], Mat4::IDENTITY);
        assert_eq!(
            skeleton.bind_world_matrices()[2],
            Mat4::from_translation(Vec3::new(8.0, 0.0, 0.0))
        );
        assert_eq!(
            skeleton.inverse_bind_matrices()[2],
            Mat4::from_translation(Vec3::new(-8.0, 0.0, 0.0))
        );
    }

    #[test]
    fn parents_must_precede_children() {
        let mut bones = chain(4.0, 2);
        bones[1].parent = 1;

        assert!(matches!(
            Skeleton::new(bones),
            Err(SkeletonError::UnorderedParent { index: 1, parent: 1 })
        ));
    }

    #[test]
    fn out_of_range_parent_is_rejected() {
        let mut bones = chain(4.0, 2);
        bones[0].parent = 7;

        assert!(matches!(
            Skeleton::new(bones),
            Err(SkeletonError::UnorderedParent { index: 0, parent: 7 })
        ));
    }

    #[test]
    fn singular_bind_pose_is_fatal() {
        let mut bones = chain(4.0, 2);
        bones[1].bind_local = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));

        match Skeleton::new(bones) {
            Err(SkeletonError::SingularBindPose { index, name }) => {
                assert_eq!(index, 1);
                assert_eq!(name, "bone_1");
            }
            other => panic!("expected a singular bind pose, got {other:?}"),
        }
    }

    #[test]
    fn bones_are_found_by_name() {
        let skeleton = Skeleton::new(chain(4.0, 3)).unwrap();
        assert_eq!(skeleton.bone_by_name("bone_2"), Some(2));
        assert_eq!(skeleton.bone_by_name("missing"), None);
    }
}
