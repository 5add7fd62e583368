use generational_arena::Arena;
use glam::Mat4;

/// Handle to a node stored in a [`SceneGraph`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NodeId(generational_arena::Index);

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("unknown node ({0:?})")]
    UnknownNode(NodeId),

    #[error("parenting {child:?} to {parent:?} would make it its own ancestor")]
    Cycle { child: NodeId, parent: NodeId },

    #[error("{child:?} is missing from the child list of {parent:?}")]
    MissingChildLink { child: NodeId, parent: NodeId },
}

#[derive(Clone, Debug)]
struct Node {
    local_matrix: Mat4,
    world_matrix: Mat4,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(local_matrix: Mat4) -> Self {
        Self {
            local_matrix,
            world_matrix: Mat4::IDENTITY,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// A tree of transforms. Each node owns a local matrix and a derived world
/// matrix; world matrices are only valid once a propagation pass has run.
#[derive(Default)]
pub struct SceneGraph {
    nodes: Arena<Node>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self { nodes: Arena::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a detached node. Its world matrix stays identity until the
    /// first propagation pass.
    pub fn insert(&mut self, local_matrix: Mat4) -> NodeId {
        NodeId(self.nodes.insert(Node::new(local_matrix)))
    }

    pub fn local_matrix(&self, id: NodeId) -> Option<&Mat4> {
        self.nodes.get(id.0).map(|node| &node.local_matrix)
    }

    pub fn set_local_matrix(&mut self, id: NodeId, local_matrix: Mat4) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id.0).ok_or(SceneError::UnknownNode(id))?;
        node.local_matrix = local_matrix;
        Ok(())
    }

    /// The world matrix computed by the last propagation pass.
    pub fn world_matrix(&self, id: NodeId) -> Option<&Mat4> {
        self.nodes.get(id.0).map(|node| &node.world_matrix)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Attach `child` under `parent`, or detach it when `parent` is `None`.
    ///
    /// The child keeps its local matrix; no world-space compensation is
    /// applied. An assignment that would make the child its own ancestor is
    /// rejected before any link is touched. Reparenting to the current
    /// parent re-appends the child at the back of the child list.
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        if !self.nodes.contains(child.0) {
            return Err(SceneError::UnknownNode(child));
        }
        if let Some(parent) = parent {
            if !self.nodes.contains(parent.0) {
                return Err(SceneError::UnknownNode(parent));
            }
            if parent == child || self.is_ancestor(child, parent) {
                return Err(SceneError::Cycle { child, parent });
            }
        }

        self.unlink_from_parent(child)?;

        if let Some(parent) = parent
            && let Some(parent_node) = self.nodes.get_mut(parent.0)
        {
            parent_node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(child.0) {
            node.parent = parent;
        }

        Ok(())
    }

    /// Remove a node entirely. Its children are detached and become roots.
    /// Detaching via [`SceneGraph::set_parent`] never destroys a node; this
    /// does.
    pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
        if !self.nodes.contains(id.0) {
            return Err(SceneError::UnknownNode(id));
        }

        self.unlink_from_parent(id)?;

        let Some(node) = self.nodes.remove(id.0) else {
            return Err(SceneError::UnknownNode(id));
        };
        for child in node.children {
            if let Some(child_node) = self.nodes.get_mut(child.0) {
                child_node.parent = None;
            }
        }

        Ok(())
    }

    /// Recompute `id`'s world matrix and propagate depth-first through its
    /// children, so a child never composes against a stale parent matrix.
    ///
    /// Called without `parent_world`, the node is treated as a root; its
    /// actual parent is neither consulted nor modified. An error halts the
    /// traversal.
    pub fn update_world_matrix(
        &mut self,
        id: NodeId,
        parent_world: Option<&Mat4>,
    ) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id.0).ok_or(SceneError::UnknownNode(id))?;
        node.world_matrix = match parent_world {
            Some(parent_world) => *parent_world * node.local_matrix,
            None => node.local_matrix,
        };

        let world_matrix = node.world_matrix;
        let mut index = 0;
        while let Some(child) = self.child_at(id, index) {
            self.update_world_matrix(child, Some(&world_matrix))?;
            index += 1;
        }

        Ok(())
    }

    /// One propagation pass over every root, in storage order. World
    /// matrices are stale-free once this returns, and not before.
    pub fn update_world_matrices(&mut self) -> Result<(), SceneError> {
        let roots: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(index, _)| NodeId(index))
            .collect();

        for root in roots {
            self.update_world_matrix(root, None)?;
        }

        Ok(())
    }

    /// Node to world matrix mapping from the last propagation pass.
    pub fn world_matrices(&self) -> impl Iterator<Item = (NodeId, &Mat4)> {
        self.nodes
            .iter()
            .map(|(index, node)| (NodeId(index), &node.world_matrix))
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(parent) = self.parent(node) {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    fn unlink_from_parent(&mut self, child: NodeId) -> Result<(), SceneError> {
        let Some(parent) = self.parent(child) else {
            return Ok(());
        };
        let Some(parent_node) = self.nodes.get_mut(parent.0) else {
            return Ok(());
        };

        match parent_node.children.iter().position(|&id| id == child) {
            Some(index) => {
                parent_node.children.remove(index);
            }
            None => {
                tracing::warn!("child list of {parent:?} lost {child:?}");
                return Err(SceneError::MissingChildLink { child, parent });
            }
        }

        Ok(())
    }

    fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes
            .get(id.0)
            .and_then(|node| node.children.get(index))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::transform_point;
    use glam::Vec3;

    fn translation(x: f32, y: f32, z: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x, y, z))
    }

    #[test]
    fn propagation_accumulates_along_the_chain() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(translation(1.0, 0.0, 0.0));
        let a = graph.insert(translation(0.0, 1.0, 0.0));
        let b = graph.insert(translation(0.0, 0.0, 1.0));
        graph.set_parent(a, Some(root)).unwrap();
        graph.set_parent(b, Some(a)).unwrap();

        graph.update_world_matrix(root, None).unwrap();

        let world = graph.world_matrix(b).unwrap();
        assert_eq!(transform_point(world, Vec3::ZERO), Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn reparenting_keeps_links_consistent() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Mat4::IDENTITY);
        let a = graph.insert(Mat4::IDENTITY);
        let b = graph.insert(Mat4::IDENTITY);
        graph.set_parent(a, Some(root)).unwrap();
        graph.set_parent(b, Some(root)).unwrap();

        graph.set_parent(b, None).unwrap();
        assert!(!graph.children(root).contains(&b));
        assert_eq!(graph.parent(b), None);

        graph.set_parent(b, Some(a)).unwrap();
        assert_eq!(graph.children(a), &[b][..]);
        assert_eq!(graph.parent(b), Some(a));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Mat4::IDENTITY);
        let a = graph.insert(Mat4::IDENTITY);
        let b = graph.insert(Mat4::IDENTITY);
        graph.set_parent(a, Some(root)).unwrap();
        graph.set_parent(b, Some(a)).unwrap();

        let err = graph.set_parent(root, Some(b)).unwrap_err();
        assert!(matches!(err, SceneError::Cycle { .. }));

        // The tree is untouched.
        assert_eq!(graph.parent(root), None);
        assert_eq!(graph.parent(a), Some(root));
        assert_eq!(graph.parent(b), Some(a));
        assert!(graph.children(b).is_empty());
    }

    #[test]
    fn self_parenting_is_rejected() {
        let mut graph = SceneGraph::new();
        let a = graph.insert(Mat4::IDENTITY);
        assert!(matches!(
            graph.set_parent(a, Some(a)),
            Err(SceneError::Cycle { .. })
        ));
    }

    #[test]
    fn update_as_temporary_root_ignores_the_real_parent() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(translation(5.0, 0.0, 0.0));
        let a = graph.insert(translation(0.0, 2.0, 0.0));
        graph.set_parent(a, Some(root)).unwrap();
        graph.update_world_matrix(root, None).unwrap();

        graph.update_world_matrix(a, None).unwrap();

        assert_eq!(*graph.world_matrix(a).unwrap(), translation(0.0, 2.0, 0.0));
        assert_eq!(graph.parent(a), Some(root));
        assert_eq!(
            *graph.world_matrix(root).unwrap(),
            translation(5.0, 0.0, 0.0)
        );
    }

    #[test]
    fn update_pass_covers_every_root() {
        let mut graph = SceneGraph::new();
        let first = graph.insert(translation(1.0, 0.0, 0.0));
        let second = graph.insert(translation(0.0, 1.0, 0.0));

        graph.update_world_matrices().unwrap();

        assert_eq!(*graph.world_matrix(first).unwrap(), translation(1.0, 0.0, 0.0));
        assert_eq!(*graph.world_matrix(second).unwrap(), translation(0.0, 1.0, 0.0));
    }

    #[test]
    fn removing_a_node_detaches_its_children() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Mat4::IDENTITY);
        let a = graph.insert(Mat4::IDENTITY);
        let b = graph.insert(Mat4::IDENTITY);
        graph.set_parent(a, Some(root)).unwrap();
        graph.set_parent(b, Some(a)).unwrap();

        graph.remove(a).unwrap();

        assert!(graph.children(root).is_empty());
        assert_eq!(graph.parent(b), None);
        assert_eq!(graph.len(), 2);
        assert!(graph.world_matrix(a).is_none());
    }

    #[test]
    fn reparenting_to_the_same_parent_moves_it_last() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Mat4::IDENTITY);
        let a = graph.insert(Mat4::IDENTITY);
        let b = graph.insert(Mat4::IDENTITY);
        graph.set_parent(a, Some(root)).unwrap();
        graph.set_parent(b, Some(root)).unwrap();

        graph.set_parent(a, Some(root)).unwrap();

        assert_eq!(graph.children(root), &[b, a][..]);
    }
}
