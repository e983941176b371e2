//! # mmdb-tree
//!
//! An in-memory binary prefix trie for building IP lookup databases
//! (geolocation, ASN and similar "MMDB"-style files).
//!
//! Networks are inserted with an updater that decides, for every leaf the
//! network covers, what value to store. The trie splits leaves as needed,
//! merges sibling leaves back together as soon as they become equal, and
//! supports three protected record kinds:
//!
//! - **fixed nodes**, subtrees whose attachment point is never replaced;
//! - **aliases**, records answering with a subtree owned elsewhere (used for
//!   IPv4-mapped, Teredo and 6to4 addresses);
//! - **reserved** networks, which reject direct insertion.
//!
//! After all insertions, [`finalize`] numbers the nodes in pre-order so a
//! writer can lay them out linearly.
//!
//! ## Example
//!
//! ```rust
//! use mmdb_tree::{Network, Options, Tree};
//!
//! let mut tree: Tree<u32> = Tree::new(Options::default()).unwrap();
//! tree.insert(&Network::new("8.8.0.0".parse().unwrap(), 16).unwrap(), 15169).unwrap();
//!
//! let (network, asn) = tree.get("8.8.8.8".parse().unwrap()).unwrap();
//! assert_eq!(network.to_string(), "8.8.0.0/16");
//! assert_eq!(asn, Some(&15169));
//!
//! let nodes = tree.finalize();
//! assert_eq!(tree.node_count(), Some(nodes));
//! ```
//!
//! The core operations ([`insert()`], [`lookup`], [`finalize`]) are also
//! available directly over any [`NodeStore`] and [`ValueStore`].

#![forbid(unsafe_code)]

mod arena;
mod error;
mod insert;
mod network;
mod record;
mod store;
mod tree;
mod walk;

pub use arena::{NodeArena, NodeStore};
pub use error::{BoxError, Error, Result};
pub use insert::{insert, Insertion, Install};
pub use network::{IpVersion, Network};
pub use record::{bit_at, Node, NodeId, Record, RecordKind};
pub use store::{DataKey, DataMap, ValueStore};
pub use tree::{Options, Tree};
pub use walk::{finalize, lookup};

#[cfg(test)]
mod proptests;
