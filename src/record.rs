use std::fmt;

use crate::error::{Error, Result};
use crate::store::DataKey;

// =============================================================================
// Bit utilities
// =============================================================================

/// Returns bit `depth` of `address`, where depth `0` is the most significant
/// bit of the first byte.
///
/// # Panics
/// If `depth` is not less than the bit length of `address`.
#[inline]
pub fn bit_at(address: &[u8], depth: usize) -> usize {
    ((address[depth / 8] >> (7 - depth % 8)) & 1) as usize
}

// =============================================================================
// Node identifiers
// =============================================================================

/// Stable index of a node inside a [`NodeStore`](crate::NodeStore).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The id for store position `index`.
    #[inline]
    pub(crate) fn new(index: usize) -> Result<Self> {
        u32::try_from(index)
            .map(Self)
            .map_err(|_| Error::NodeSpaceExhausted)
    }

    /// Position of the node in its store.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// =============================================================================
// Records
// =============================================================================

/// Kind of a [`Record`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// No value and no children.
    Empty,
    /// A stored value.
    Data,
    /// A mutable child node.
    Node,
    /// A child node whose record is never replaced or merged.
    FixedNode,
    /// A node owned by another part of the tree.
    Alias,
    /// A network that may not receive data directly.
    Reserved,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Empty => "empty",
            RecordKind::Data => "data",
            RecordKind::Node => "node",
            RecordKind::FixedNode => "fixed node",
            RecordKind::Alias => "alias",
            RecordKind::Reserved => "reserved",
        };
        f.write_str(name)
    }
}

/// One slot of the binary trie.
///
/// Only the node-carrying kinds hold a [`NodeId`]; `Data` holds the value
/// store's key, never the value itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Record {
    /// No value and no children.
    #[default]
    Empty,
    /// A value in the value store.
    Data(DataKey),
    /// A mutable child node, merged back when its children become equal.
    Node(NodeId),
    /// A child node that insertion may descend into but never replace.
    FixedNode(NodeId),
    /// A node owned elsewhere; lookups continue there.
    Alias(NodeId),
    /// A protected network.
    Reserved,
}

impl Record {
    /// The kind of this record.
    #[inline]
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Empty => RecordKind::Empty,
            Record::Data(_) => RecordKind::Data,
            Record::Node(_) => RecordKind::Node,
            Record::FixedNode(_) => RecordKind::FixedNode,
            Record::Alias(_) => RecordKind::Alias,
            Record::Reserved => RecordKind::Reserved,
        }
    }

    /// The node this record points at, for `Node`, `FixedNode` and `Alias`.
    #[inline]
    pub fn node(&self) -> Option<NodeId> {
        match *self {
            Record::Node(id) | Record::FixedNode(id) | Record::Alias(id) => Some(id),
            Record::Empty | Record::Data(_) | Record::Reserved => None,
        }
    }

    /// The value key, for `Data` records.
    #[inline]
    pub fn data_key(&self) -> Option<DataKey> {
        match *self {
            Record::Data(key) => Some(key),
            _ => None,
        }
    }
}

// =============================================================================
// Nodes
// =============================================================================

/// A trie node: the records for bit `0` and bit `1`, plus the number assigned
/// by [`finalize`](crate::finalize).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub(crate) children: [Record; 2],
    pub(crate) number: Option<usize>,
}

impl Node {
    /// Creates an unnumbered node from its two children.
    #[inline]
    pub fn new(zero: Record, one: Record) -> Self {
        Self {
            children: [zero, one],
            number: None,
        }
    }

    /// Both children, indexed by bit.
    #[inline]
    pub fn children(&self) -> &[Record; 2] {
        &self.children
    }

    /// The child for `bit` (`0` or `1`).
    #[inline]
    pub fn child(&self, bit: usize) -> Record {
        self.children[bit]
    }

    /// Pre-order number from the last finalize, if the node was reached.
    #[inline]
    pub fn number(&self) -> Option<usize> {
        self.number
    }
}
