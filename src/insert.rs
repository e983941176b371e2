//! Prefix-aware insertion with splitting and merging.
//!
//! Insertion walks the trie one bit per level. Once the walk is inside the
//! target network every branch below is visited, so a broad network lands on
//! every leaf it covers; sibling leaves that end up equal are merged back on
//! the way out. Merging only looks one level down, which is enough because
//! every mutable subtree is fully merged after each insertion.

use std::marker::PhantomData;

use tracing::trace;

use crate::arena::NodeStore;
use crate::error::{describe, BoxError, Error, Result};
use crate::record::{bit_at, Node, NodeId, Record, RecordKind};
use crate::store::ValueStore;

const TARGET: &str = "mmdb_tree::insert";

/// What an insertion writes into the records covering its network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Install {
    /// Run the updater and store its result.
    Data,
    /// Attach an existing mutable node.
    Node(NodeId),
    /// Attach an existing node that later insertions may not replace.
    FixedNode(NodeId),
    /// Point at a node owned by another part of the tree.
    Alias(NodeId),
    /// Protect the network from direct insertion.
    Reserved,
}

impl Install {
    /// The record to write for structural installs; `None` for `Data`.
    fn record(self) -> Option<Record> {
        match self {
            Install::Data => None,
            Install::Node(id) => Some(Record::Node(id)),
            Install::FixedNode(id) => Some(Record::FixedNode(id)),
            Install::Alias(id) => Some(Record::Alias(id)),
            Install::Reserved => Some(Record::Reserved),
        }
    }
}

/// A single insertion: the target network and what to put there.
///
/// The updater receives the value currently stored in a covered record (if
/// any) and returns the value to store, or `None` to delete. It runs once per
/// covered leaf, so it may be called many times for a broad network.
pub struct Insertion<'a, F> {
    /// Address bytes; only the first `prefix_len` bits matter.
    pub address: &'a [u8],
    /// Prefix length in bits.
    pub prefix_len: usize,
    /// Kind of record to install.
    pub install: Install,
    /// Produces the new value for `Install::Data`.
    pub updater: F,
}

impl<'a, F> Insertion<'a, F> {
    /// A data insertion driven by `updater`.
    pub fn new<V>(address: &'a [u8], prefix_len: usize, updater: F) -> Self
    where
        F: FnMut(Option<&V>) -> std::result::Result<Option<V>, BoxError>,
    {
        Self {
            address,
            prefix_len,
            install: Install::Data,
            updater,
        }
    }

    /// Replaces the kind of record to install.
    pub fn with_install(mut self, install: Install) -> Self {
        self.install = install;
        self
    }
}

/// Inserts into the trie rooted at `root`.
///
/// On error the walk stops immediately; records already rewritten stay
/// rewritten.
pub fn insert<V, N, S, F>(
    nodes: &mut N,
    values: &mut S,
    root: NodeId,
    insertion: Insertion<'_, F>,
) -> Result<()>
where
    V: PartialEq,
    N: NodeStore + ?Sized,
    S: ValueStore<V> + ?Sized,
    F: FnMut(Option<&V>) -> std::result::Result<Option<V>, BoxError>,
{
    let Insertion {
        address,
        prefix_len,
        install,
        updater,
    } = insertion;
    debug_assert!(prefix_len <= address.len() * 8);

    let mut inserter = Inserter {
        nodes,
        values,
        address,
        prefix_len,
        install,
        updater,
        _value: PhantomData,
    };
    inserter.insert_node(root, 0)
}

struct Inserter<'a, V, N: ?Sized, S: ?Sized, F> {
    nodes: &'a mut N,
    values: &'a mut S,
    address: &'a [u8],
    prefix_len: usize,
    install: Install,
    updater: F,
    _value: PhantomData<fn(&V)>,
}

impl<V, N, S, F> Inserter<'_, V, N, S, F>
where
    V: PartialEq,
    N: NodeStore + ?Sized,
    S: ValueStore<V> + ?Sized,
    F: FnMut(Option<&V>) -> std::result::Result<Option<V>, BoxError>,
{
    fn insert_node(&mut self, id: NodeId, current_depth: usize) -> Result<()> {
        let new_depth = current_depth + 1;
        if new_depth > self.prefix_len {
            // Already inside the network: both halves are covered.
            self.insert_record(id, 0, new_depth)?;
            return self.insert_record(id, 1, new_depth);
        }

        let bit = bit_at(self.address, current_depth);
        self.insert_record(id, bit, new_depth)
    }

    /// Inserts into child `bit` of `parent`, which sits at `new_depth`.
    fn insert_record(&mut self, parent: NodeId, bit: usize, new_depth: usize) -> Result<()> {
        let record = self.nodes.resolve(parent).children[bit];
        match record {
            Record::Node(child) => {
                self.insert_node(child, new_depth)?;
                self.merge_children(parent, bit, child)
            }
            Record::FixedNode(child) => self.insert_node(child, new_depth),
            Record::Empty | Record::Data(_) => {
                if new_depth >= self.prefix_len {
                    return self.overwrite(parent, bit, record);
                }
                self.split(parent, bit, record, new_depth)
            }
            Record::Reserved => {
                if self.prefix_len >= new_depth {
                    return Err(Error::ReservedNetwork {
                        network: describe(self.address, self.prefix_len),
                        depth: new_depth,
                    });
                }
                trace!(target: TARGET, depth = new_depth, "dropping reserved network");
                self.overwrite(parent, bit, Record::Empty)
            }
            Record::Alias(_) => {
                if self.prefix_len < new_depth {
                    trace!(target: TARGET, depth = new_depth, "keeping alias");
                    return Ok(());
                }
                Err(Error::AliasedNetwork {
                    network: describe(self.address, self.prefix_len),
                    depth: new_depth,
                })
            }
        }
    }

    /// Rewrites a leaf record that the network fully covers. `record` is the
    /// leaf's current content (`Empty` or `Data`).
    fn overwrite(&mut self, parent: NodeId, bit: usize, record: Record) -> Result<()> {
        let old_key = record.data_key();

        let new_record = match self.install.record() {
            Some(installed) => {
                if let Some(key) = old_key {
                    self.values.remove(key);
                }
                installed
            }
            None => {
                let old = old_key.and_then(|key| self.values.get(key));
                let new = (self.updater)(old).map_err(Error::Updater)?;
                match new {
                    None => {
                        if let Some(key) = old_key {
                            self.values.remove(key);
                        }
                        Record::Empty
                    }
                    Some(value) => {
                        if old.is_some_and(|old| *old == value) {
                            return Ok(());
                        }
                        // Release the old value only once the new one is in.
                        let key = self.values.store(value)?;
                        if let Some(old_key) = old_key {
                            self.values.remove(old_key);
                        }
                        Record::Data(key)
                    }
                }
            }
        };

        self.nodes.resolve_mut(parent).children[bit] = new_record;
        Ok(())
    }

    /// Pushes a leaf one level down so the walk can continue below it.
    fn split(&mut self, parent: NodeId, bit: usize, record: Record, new_depth: usize) -> Result<()> {
        let child = self.nodes.allocate(Node::new(record, record))?;
        // Both copies own a reference.
        if let Record::Data(key) = record {
            self.values.retain(key);
        }
        trace!(
            target: TARGET,
            depth = new_depth,
            node = child.index(),
            kind = %record.kind(),
            "split"
        );

        self.nodes.resolve_mut(parent).children[bit] = Record::Node(child);
        self.insert_node(child, new_depth)?;
        self.merge_children(parent, bit, child)
    }

    /// Collapses the `Node` record at child `bit` of `parent` if both children
    /// of `child` are the same leaf.
    fn merge_children(&mut self, parent: NodeId, bit: usize, child: NodeId) -> Result<()> {
        let [zero, one] = self.nodes.resolve(child).children;
        if zero.kind() != one.kind() {
            return Ok(());
        }

        let merged = match zero {
            Record::Node(_) | Record::FixedNode(_) => return Ok(()),
            Record::Empty => Record::Empty,
            Record::Reserved => Record::Reserved,
            Record::Data(key) => match one.data_key() {
                Some(other) if other == key => {
                    self.values.remove(other);
                    Record::Data(key)
                }
                _ => return Ok(()),
            },
            Record::Alias(_) => return Err(Error::UnmergeableRecords(RecordKind::Alias)),
        };

        trace!(target: TARGET, node = child.index(), kind = %merged.kind(), "merged children");
        self.nodes.resolve_mut(parent).children[bit] = merged;
        Ok(())
    }
}
