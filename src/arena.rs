//! Node storage.
//!
//! Records never own nodes; they hold a [`NodeId`] that the store resolves.
//! This lets one insertion reach the same node from several call frames and
//! keeps allocation order under the store's control.

use crate::error::Result;
use crate::record::{Node, NodeId};

/// Resolves node ids and allocates new nodes.
///
/// Ids handed out by `allocate` must stay valid for the lifetime of the store.
pub trait NodeStore {
    /// The node for `id`.
    fn resolve(&self, id: NodeId) -> &Node;

    /// The node for `id`, mutably.
    fn resolve_mut(&mut self, id: NodeId) -> &mut Node;

    /// Stores `node` and returns its new id.
    ///
    /// Fails with [`Error::NodeSpaceExhausted`](crate::Error::NodeSpaceExhausted)
    /// once ids no longer fit in a `u32`.
    fn allocate(&mut self, node: Node) -> Result<NodeId>;
}

/// Growable arena of nodes addressed by index.
///
/// Nodes are never freed. Merging can leave nodes unreachable from the root;
/// they stay in the arena until it is dropped.
#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Number of allocated nodes, reachable or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeStore for NodeArena {
    #[inline]
    fn resolve(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    fn resolve_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    #[inline]
    fn allocate(&mut self, node: Node) -> Result<NodeId> {
        let id = NodeId::new(self.nodes.len())?;
        self.nodes.push(node);
        Ok(id)
    }
}
