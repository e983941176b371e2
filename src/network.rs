use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{Error, Result};

/// Address family of a tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IpVersion {
    /// 32-bit addresses only.
    V4,
    /// 128-bit addresses; IPv4 lives under `::/96`.
    #[default]
    V6,
}

impl IpVersion {
    /// Address length in bits.
    #[inline]
    pub fn bits(self) -> usize {
        match self {
            IpVersion::V4 => 32,
            IpVersion::V6 => 128,
        }
    }
}

/// An address and a prefix length. Host bits are always zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Network {
    addr: IpAddr,
    prefix_len: u8,
}

impl Network {
    /// Creates a network, clearing the bits after `prefix_len`.
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self> {
        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max {
            return Err(Error::InvalidPrefixLength { prefix_len, max });
        }
        let addr = match addr {
            IpAddr::V4(a) => {
                let mut octets = a.octets();
                mask(&mut octets, prefix_len as usize);
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            IpAddr::V6(a) => {
                let mut octets = a.octets();
                mask(&mut octets, prefix_len as usize);
                IpAddr::V6(Ipv6Addr::from(octets))
            }
        };
        Ok(Self { addr, prefix_len })
    }

    /// Shorthand for an IPv4 network.
    pub fn v4(addr: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        Self::new(IpAddr::V4(addr), prefix_len)
    }

    /// Shorthand for an IPv6 network.
    pub fn v6(addr: Ipv6Addr, prefix_len: u8) -> Result<Self> {
        Self::new(IpAddr::V6(addr), prefix_len)
    }

    #[inline]
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    #[inline]
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Whether `ip` is inside this network. Addresses of the other family
    /// never are.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mut octets = ip.octets();
                mask(&mut octets, self.prefix_len as usize);
                octets == net.octets()
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mut octets = ip.octets();
                mask(&mut octets, self.prefix_len as usize);
                octets == net.octets()
            }
            _ => false,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

/// Zeroes every bit of `bytes` from position `prefix_len` on.
pub(crate) fn mask(bytes: &mut [u8], prefix_len: usize) {
    for (i, b) in bytes.iter_mut().enumerate() {
        let start = i * 8;
        if start >= prefix_len {
            *b = 0;
        } else if start + 8 > prefix_len {
            *b &= 0xFFu8 << (8 - (prefix_len - start));
        }
    }
}

/// Address bytes in a tree's address space. IPv4 addresses in an IPv6 tree
/// are placed in the last 32 bits (`::a.b.c.d`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TreeAddress {
    bytes: [u8; 16],
    len: usize,
}

impl TreeAddress {
    pub(crate) fn new(version: IpVersion, ip: IpAddr) -> Result<Self> {
        let mut bytes = [0u8; 16];
        match (version, ip) {
            (IpVersion::V4, IpAddr::V4(a)) => {
                bytes[..4].copy_from_slice(&a.octets());
                Ok(Self {
                    bytes,
                    len: version.bits() / 8,
                })
            }
            (IpVersion::V4, IpAddr::V6(_)) => Err(Error::Ipv6InIpv4Tree(ip)),
            (IpVersion::V6, IpAddr::V4(a)) => {
                bytes[12..].copy_from_slice(&a.octets());
                Ok(Self {
                    bytes,
                    len: version.bits() / 8,
                })
            }
            (IpVersion::V6, IpAddr::V6(a)) => Ok(Self {
                bytes: a.octets(),
                len: version.bits() / 8,
            }),
        }
    }

    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Prefix length of `network` in a tree of `version`.
pub(crate) fn tree_prefix_len(version: IpVersion, network: &Network) -> usize {
    match (version, network.addr) {
        (IpVersion::V6, IpAddr::V4(_)) => 96 + network.prefix_len as usize,
        _ => network.prefix_len as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_masks_host_bits() {
        let n = Network::v4(Ipv4Addr::new(10, 1, 2, 3), 12).unwrap();
        assert_eq!(n.addr(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)));
        assert_eq!(n.to_string(), "10.0.0.0/12");

        let n = Network::v6("2001:db8:ffff::1".parse().unwrap(), 36).unwrap();
        assert_eq!(n.to_string(), "2001:db8:f000::/36");
    }

    #[test]
    fn new_rejects_long_prefixes() {
        let err = Network::v4(Ipv4Addr::LOCALHOST, 33).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidPrefixLength {
                prefix_len: 33,
                max: 32
            }
        ));
        assert!(Network::v6(Ipv6Addr::LOCALHOST, 128).is_ok());
    }

    #[test]
    fn contains_respects_prefix_and_family() {
        let n = Network::v4(Ipv4Addr::new(192, 168, 0, 0), 16).unwrap();
        assert!(n.contains("192.168.44.1".parse().unwrap()));
        assert!(!n.contains("192.169.0.1".parse().unwrap()));
        assert!(!n.contains("::1".parse().unwrap()));

        let all = Network::v4(Ipv4Addr::UNSPECIFIED, 0).unwrap();
        assert!(all.contains("255.255.255.255".parse().unwrap()));
    }

    #[test]
    fn tree_address_maps_ipv4_into_ipv6() {
        let ip: IpAddr = "1.2.3.4".parse().unwrap();
        let a = TreeAddress::new(IpVersion::V6, ip).unwrap();
        assert_eq!(a.as_bytes().len(), 16);
        assert_eq!(&a.as_bytes()[12..], &[1, 2, 3, 4]);
        assert!(a.as_bytes()[..12].iter().all(|&b| b == 0));

        let a = TreeAddress::new(IpVersion::V4, ip).unwrap();
        assert_eq!(a.as_bytes(), &[1, 2, 3, 4]);

        let v6: IpAddr = "::1".parse().unwrap();
        assert!(matches!(
            TreeAddress::new(IpVersion::V4, v6),
            Err(Error::Ipv6InIpv4Tree(_))
        ));
    }

    #[test]
    fn tree_prefix_len_offsets_ipv4() {
        let n = Network::v4(Ipv4Addr::new(10, 0, 0, 0), 8).unwrap();
        assert_eq!(tree_prefix_len(IpVersion::V6, &n), 104);
        assert_eq!(tree_prefix_len(IpVersion::V4, &n), 8);
    }
}
