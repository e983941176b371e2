use std::hash::Hash;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tracing::debug;

use crate::arena::{NodeArena, NodeStore};
use crate::error::{BoxError, Result};
use crate::insert::{insert, Insertion, Install};
use crate::network::{tree_prefix_len, IpVersion, Network, TreeAddress};
use crate::record::{Node, NodeId, Record};
use crate::store::{DataMap, ValueStore};
use crate::walk;

const TARGET: &str = "mmdb_tree::tree";

// =============================================================================
// Configuration
// =============================================================================

/// IPv6 networks that answer with the IPv4 subtree.
const IPV4_ALIASES: [(Ipv6Addr, u8); 3] = [
    // IPv4-mapped
    (Ipv6Addr::new(0, 0, 0, 0, 0, 0xffff, 0, 0), 96),
    // Teredo
    (Ipv6Addr::new(0x2001, 0, 0, 0, 0, 0, 0, 0), 32),
    // 6to4
    (Ipv6Addr::new(0x2002, 0, 0, 0, 0, 0, 0, 0), 16),
];

const RESERVED_IPV4: [(Ipv4Addr, u8); 15] = [
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(100, 64, 0, 0), 10),
    (Ipv4Addr::new(127, 0, 0, 0), 8),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 0, 0, 0), 29),
    (Ipv4Addr::new(192, 0, 2, 0), 24),
    (Ipv4Addr::new(192, 88, 99, 0), 24),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
    (Ipv4Addr::new(198, 18, 0, 0), 15),
    (Ipv4Addr::new(198, 51, 100, 0), 24),
    (Ipv4Addr::new(203, 0, 113, 0), 24),
    (Ipv4Addr::new(224, 0, 0, 0), 4),
    (Ipv4Addr::new(240, 0, 0, 0), 4),
];

const RESERVED_IPV6: [(Ipv6Addr, u8); 6] = [
    (Ipv6Addr::new(0x100, 0, 0, 0, 0, 0, 0, 0), 64),
    (Ipv6Addr::new(0x2001, 0x10, 0, 0, 0, 0, 0, 0), 28),
    (Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0), 32),
    (Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7),
    (Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10),
    (Ipv6Addr::new(0xff00, 0, 0, 0, 0, 0, 0, 0), 8),
];

/// How a [`Tree`] is set up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// Address family of the tree.
    pub ip_version: IpVersion,
    /// Allow data in private, documentation and other special-purpose
    /// networks. When `false` those networks are marked reserved.
    pub include_reserved_networks: bool,
    /// Do not alias `::ffff:0:0/96`, `2001::/32` and `2002::/16` to the IPv4
    /// subtree. Only meaningful for IPv6 trees.
    pub disable_ipv4_aliasing: bool,
}

// =============================================================================
// Tree
// =============================================================================

/// A prefix tree mapping networks to values, ready to be numbered for
/// serialization.
///
/// ```
/// use mmdb_tree::{Network, Options, Tree};
///
/// let mut tree: Tree<&str> = Tree::new(Options::default()).unwrap();
/// let net = Network::new("1.2.3.0".parse().unwrap(), 24).unwrap();
/// tree.insert(&net, "example").unwrap();
///
/// let (found, value) = tree.get("1.2.3.4".parse().unwrap()).unwrap();
/// assert_eq!(found, net);
/// assert_eq!(value, Some(&"example"));
///
/// // The IPv4-mapped form answers from the same subtree.
/// let (_, value) = tree.get("::ffff:1.2.3.4".parse().unwrap()).unwrap();
/// assert_eq!(value, Some(&"example"));
/// ```
#[derive(Clone, Debug)]
pub struct Tree<V> {
    options: Options,
    nodes: NodeArena,
    values: DataMap<V>,
    root: NodeId,
    ipv4_root: Option<NodeId>,
    node_count: Option<usize>,
}

impl<V: Clone + Eq + Hash> Tree<V> {
    /// Creates a tree, installing the IPv4 aliases and reserved networks the
    /// options ask for.
    pub fn new(options: Options) -> Result<Self> {
        let mut nodes = NodeArena::new();
        let root = nodes.allocate(Node::default())?;
        let mut tree = Self {
            options,
            nodes,
            values: DataMap::new(),
            root,
            ipv4_root: None,
            node_count: None,
        };

        if options.ip_version == IpVersion::V6 && !options.disable_ipv4_aliasing {
            tree.insert_ipv4_aliases()?;
        }
        if !options.include_reserved_networks {
            tree.insert_reserved_networks()?;
        }

        debug!(target: TARGET, ?options, nodes = tree.nodes.len(), "created tree");
        Ok(tree)
    }

    fn insert_ipv4_aliases(&mut self) -> Result<()> {
        let ipv4_root = self.nodes.allocate(Node::default())?;
        let ipv4_space = Network::v6(Ipv6Addr::UNSPECIFIED, 96)?;
        self.install(&ipv4_space, Install::FixedNode(ipv4_root))?;

        for (addr, prefix_len) in IPV4_ALIASES {
            self.install(&Network::v6(addr, prefix_len)?, Install::Alias(ipv4_root))?;
        }
        self.ipv4_root = Some(ipv4_root);
        Ok(())
    }

    fn insert_reserved_networks(&mut self) -> Result<()> {
        for (addr, prefix_len) in RESERVED_IPV4 {
            self.install(&Network::v4(addr, prefix_len)?, Install::Reserved)?;
        }
        if self.options.ip_version == IpVersion::V6 {
            for (addr, prefix_len) in RESERVED_IPV6 {
                self.install(&Network::v6(addr, prefix_len)?, Install::Reserved)?;
            }
        }
        Ok(())
    }

    fn install(&mut self, network: &Network, install: Install) -> Result<()> {
        self.insert_record(network, install, |_: Option<&V>| Ok(None))
    }

    fn insert_record<F>(&mut self, network: &Network, install: Install, updater: F) -> Result<()>
    where
        F: FnMut(Option<&V>) -> std::result::Result<Option<V>, BoxError>,
    {
        let address = TreeAddress::new(self.options.ip_version, network.addr())?;
        let prefix_len = tree_prefix_len(self.options.ip_version, network);
        self.node_count = None;

        insert(
            &mut self.nodes,
            &mut self.values,
            self.root,
            Insertion::new(address.as_bytes(), prefix_len, updater).with_install(install),
        )
    }

    /// Sets the value of every address in `network`, replacing what was
    /// there.
    pub fn insert(&mut self, network: &Network, value: V) -> Result<()> {
        self.insert_with(network, move |_| Ok(Some(value.clone())))
    }

    /// Runs `updater` on every distinct value (or gap) inside `network` and
    /// stores what it returns; `None` deletes.
    pub fn insert_with<F>(&mut self, network: &Network, updater: F) -> Result<()>
    where
        F: FnMut(Option<&V>) -> std::result::Result<Option<V>, BoxError>,
    {
        self.insert_record(network, Install::Data, updater)
    }

    /// Deletes every value inside `network`.
    pub fn remove(&mut self, network: &Network) -> Result<()> {
        self.insert_with(network, |_| Ok(None))
    }

    /// The record answering for `ip` and its depth in the tree.
    pub fn lookup(&self, ip: IpAddr) -> Result<(usize, Record)> {
        let address = TreeAddress::new(self.options.ip_version, ip)?;
        Ok(walk::lookup(&self.nodes, self.root, address.as_bytes()))
    }

    /// The largest network containing `ip` that has a single answer, and the
    /// value stored for it.
    ///
    /// IPv4 queries against an IPv6 tree report IPv4 networks once the walk
    /// reached the IPv4 subtree.
    pub fn get(&self, ip: IpAddr) -> Result<(Network, Option<&V>)> {
        let (depth, record) = self.lookup(ip)?;
        let value = record.data_key().and_then(|key| self.values.get(key));

        let network = match (self.options.ip_version, ip) {
            (IpVersion::V6, IpAddr::V4(v4)) if depth < 96 => {
                Network::new(IpAddr::V6(v4.to_ipv6_compatible()), depth as u8)?
            }
            (IpVersion::V6, IpAddr::V4(_)) => Network::new(ip, (depth - 96) as u8)?,
            _ => Network::new(ip, depth as u8)?,
        };
        Ok((network, value))
    }

    /// Numbers the nodes for serialization and returns how many there are.
    pub fn finalize(&mut self) -> usize {
        let count = walk::finalize(&mut self.nodes, self.root);
        debug!(
            target: TARGET,
            nodes = count,
            allocated = self.nodes.len(),
            values = self.values.len(),
            "finalized tree"
        );
        self.node_count = Some(count);
        count
    }

    /// Node count from the last [`finalize`](Self::finalize), cleared by any
    /// later insertion.
    #[inline]
    pub fn node_count(&self) -> Option<usize> {
        self.node_count
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The node installed at `::/96`, when IPv4 aliasing is enabled.
    #[inline]
    pub fn ipv4_root(&self) -> Option<NodeId> {
        self.ipv4_root
    }

    #[inline]
    pub fn nodes(&self) -> &NodeArena {
        &self.nodes
    }

    #[inline]
    pub fn values(&self) -> &DataMap<V> {
        &self.values
    }

    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }
}
