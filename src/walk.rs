use crate::arena::NodeStore;
use crate::record::{bit_at, NodeId, Record};

/// Finds the record that answers for `address`.
///
/// Follows `Node`, `FixedNode` and `Alias` records and returns the first leaf
/// (`Empty`, `Data` or `Reserved`) with the depth at which it was found, i.e.
/// the prefix length of the network it covers.
pub fn lookup<N: NodeStore + ?Sized>(nodes: &N, root: NodeId, address: &[u8]) -> (usize, Record) {
    let mut node = nodes.resolve(root);
    let mut depth = 0usize;

    loop {
        let record = node.children[bit_at(address, depth)];
        depth += 1;

        match record {
            Record::Node(id) | Record::FixedNode(id) | Record::Alias(id) => {
                node = nodes.resolve(id);
            }
            Record::Empty | Record::Data(_) | Record::Reserved => return (depth, record),
        }
    }
}

/// Numbers every node owned by the tree in pre-order, bit `0` before bit `1`,
/// starting from zero. Returns the number of nodes.
///
/// Only `Node` and `FixedNode` edges are followed: an aliased node is numbered
/// where it is owned, never through the alias.
pub fn finalize<N: NodeStore + ?Sized>(nodes: &mut N, root: NodeId) -> usize {
    let mut next = 0usize;
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        let node = nodes.resolve_mut(id);
        node.number = Some(next);
        next += 1;

        // Reversed so that child 0 is popped first.
        for record in node.children.iter().rev() {
            match *record {
                Record::Node(child) | Record::FixedNode(child) => stack.push(child),
                Record::Empty | Record::Data(_) | Record::Alias(_) | Record::Reserved => {}
            }
        }
    }

    next
}
