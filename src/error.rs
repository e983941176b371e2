use std::net::IpAddr;

use crate::record::RecordKind;

/// Boxed error returned by updaters and forwarded unchanged.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while building the tree.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The insertion targets a network equal to or inside a reserved network.
    #[error("attempt to insert {network}, which is in a reserved network at depth {depth}")]
    ReservedNetwork {
        /// The network being inserted, in tree address space.
        network: String,
        /// Depth of the reserved record.
        depth: usize,
    },

    /// The insertion targets a network at or inside an aliased network.
    #[error("attempt to insert {network}, which is in an aliased network at depth {depth}")]
    AliasedNetwork {
        /// The network being inserted, in tree address space.
        network: String,
        /// Depth of the alias record.
        depth: usize,
    },

    /// Two sibling records of this kind cannot be collapsed into one.
    #[error("merging {0} records is not implemented")]
    UnmergeableRecords(RecordKind),

    /// The updater supplied with the insertion failed.
    #[error(transparent)]
    Updater(BoxError),

    /// The value store has no keys left.
    #[error("value store exhausted its key space")]
    StoreExhausted,

    /// The node store has no ids left.
    #[error("node store exhausted its id space")]
    NodeSpaceExhausted,

    /// A prefix length longer than the address.
    #[error("prefix length {prefix_len} exceeds the {max} bits of the address")]
    InvalidPrefixLength {
        /// Requested prefix length.
        prefix_len: u8,
        /// Bit length of the address family.
        max: u8,
    },

    /// An IPv6 address or network was used with an IPv4-only tree.
    #[error("cannot use IPv6 address {0} in an IPv4-only tree")]
    Ipv6InIpv4Tree(IpAddr),
}

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Renders `address/prefix_len` for error messages. Four and sixteen byte
/// addresses print as IP addresses, anything else as hex.
pub(crate) fn describe(address: &[u8], prefix_len: usize) -> String {
    if let Ok(octets) = <[u8; 4]>::try_from(address) {
        return format!("{}/{}", std::net::Ipv4Addr::from(octets), prefix_len);
    }
    if let Ok(octets) = <[u8; 16]>::try_from(address) {
        return format!("{}/{}", std::net::Ipv6Addr::from(octets), prefix_len);
    }
    let hex: String = address.iter().map(|b| format!("{b:02x}")).collect();
    format!("0x{hex}/{prefix_len}")
}
