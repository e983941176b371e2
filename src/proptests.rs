use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Checks the structural invariants of `t` and returns its owned nodes in
/// pre-order.
///
/// - no `Node` record has two children that should have been merged;
/// - every reachable `Data` record owns exactly one reference in the store,
///   and the store holds nothing else.
fn validate_tree<V: Clone + Eq + std::hash::Hash>(t: &Tree<V>) -> Vec<NodeId> {
    let nodes = t.nodes();
    let mut order = Vec::new();
    let mut refs: HashMap<DataKey, usize> = HashMap::new();

    // (node, reached through a mergeable `Node` record)
    let mut stack = vec![(t.root(), false)];
    while let Some((id, mergeable)) = stack.pop() {
        order.push(id);
        let node = nodes.resolve(id);
        let [zero, one] = *node.children();

        if mergeable {
            let collapsible = match (zero, one) {
                (Record::Empty, Record::Empty) | (Record::Reserved, Record::Reserved) => true,
                (Record::Data(a), Record::Data(b)) => a == b,
                _ => false,
            };
            assert!(!collapsible, "node {id:?} has mergeable children {zero:?}");
        }

        for record in [one, zero] {
            match record {
                Record::Node(child) => stack.push((child, true)),
                Record::FixedNode(child) => stack.push((child, false)),
                Record::Data(key) => *refs.entry(key).or_default() += 1,
                Record::Empty | Record::Alias(_) | Record::Reserved => {}
            }
        }
    }

    for (&key, &count) in &refs {
        assert!(t.values().get(key).is_some(), "dangling data key {key:?}");
        assert_eq!(t.values().references(key), count, "reference count of {key:?}");
    }
    assert_eq!(t.values().len(), refs.len(), "store holds unreachable values");

    order
}

fn v4_tree() -> Tree<u32> {
    Tree::new(Options {
        ip_version: IpVersion::V4,
        include_reserved_networks: true,
        ..Options::default()
    })
    .unwrap()
}

fn clustered_addr() -> impl Strategy<Value = u32> {
    // Few distinct leading bits so networks overlap and siblings merge.
    any::<u32>().prop_map(|a| a & 0xFFF0_0000)
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 5)]
    Insert {
        #[proptest(strategy = "clustered_addr()")]
        addr: u32,
        #[proptest(strategy = "0u8..=12")]
        prefix_len: u8,
        #[proptest(strategy = "0u32..3")]
        value: u32,
    },
    #[proptest(weight = 2)]
    Remove {
        #[proptest(strategy = "clustered_addr()")]
        addr: u32,
        #[proptest(strategy = "0u8..=12")]
        prefix_len: u8,
    },
    #[proptest(weight = 3)]
    Get(u32),
    Finalize,
}

fn expected(model: &[(Network, Option<u32>)], ip: IpAddr) -> Option<u32> {
    model
        .iter()
        .rev()
        .find(|(n, _)| n.contains(ip))
        .and_then(|(_, v)| *v)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_with_model(ops in prop::collection::vec(any::<Op>(), 0..=200)) {
        let mut t = v4_tree();
        let mut model: Vec<(Network, Option<u32>)> = Vec::new();

        for op in ops {
            match op {
                Op::Insert { addr, prefix_len, value } => {
                    let n = Network::v4(Ipv4Addr::from(addr), prefix_len).unwrap();
                    t.insert(&n, value).unwrap();
                    model.push((n, Some(value)));
                }
                Op::Remove { addr, prefix_len } => {
                    let n = Network::v4(Ipv4Addr::from(addr), prefix_len).unwrap();
                    t.remove(&n).unwrap();
                    model.push((n, None));
                }
                Op::Get(addr) => {
                    let ip = IpAddr::V4(Ipv4Addr::from(addr));
                    let (found, got) = t.get(ip).unwrap();
                    prop_assert_eq!(got.copied(), expected(&model, ip));
                    prop_assert!(found.contains(ip));
                }
                Op::Finalize => {
                    let order = validate_tree(&t);
                    prop_assert_eq!(t.finalize(), order.len());
                    for (i, id) in order.iter().enumerate() {
                        prop_assert_eq!(t.nodes().resolve(*id).number(), Some(i));
                    }
                }
            }
            validate_tree(&t);
        }
    }

    #[test]
    fn prop_ipv4_aliases_agree(addr in any::<u32>(), prefix_len in 0u8..=32, probe in any::<u32>(), value in any::<u16>()) {
        let mut t: Tree<u16> = Tree::new(Options {
            include_reserved_networks: true,
            ..Options::default()
        })
        .unwrap();
        let n = Network::v4(Ipv4Addr::from(addr), prefix_len).unwrap();
        t.insert(&n, value).unwrap();

        let v4 = Ipv4Addr::from(probe);
        let [a, b, c, d] = v4.octets();
        let hi = u16::from_be_bytes([a, b]);
        let lo = u16::from_be_bytes([c, d]);

        let direct = t.get(IpAddr::V4(v4)).unwrap().1.copied();
        prop_assert_eq!(direct, n.contains(IpAddr::V4(v4)).then_some(value));
        for alias in [
            Ipv6Addr::new(0, 0, 0, 0, 0, 0xffff, hi, lo),
            Ipv6Addr::new(0x2001, 0, hi, lo, 0, 0, 0, 0),
            Ipv6Addr::new(0x2002, hi, lo, 0, 0, 0, 0, 0),
        ] {
            prop_assert_eq!(t.get(IpAddr::V6(alias)).unwrap().1.copied(), direct);
        }
        validate_tree(&t);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_merges_to_same_shape() {
    let networks: Vec<Network> = [
        ("10.0.0.0", 9),
        ("10.128.0.0", 10),
        ("10.192.0.0", 10),
        ("11.0.0.0", 8),
    ]
    .iter()
    .map(|(a, l)| Network::new(a.parse().unwrap(), *l).unwrap())
    .collect();

    for_each_permutation(&networks, |perm| {
        let mut t = v4_tree();
        for n in &perm {
            t.insert(n, 1).unwrap();
        }
        validate_tree(&t);
        assert_eq!(t.finalize(), 7, "order {perm:?}");
        let (found, value) = t.get("11.2.3.4".parse().unwrap()).unwrap();
        assert_eq!(found.to_string(), "10.0.0.0/7");
        assert_eq!(value, Some(&1));
    });
}

#[test]
fn exhaustive_remove_order_empties_tree() {
    let networks: Vec<Network> = [
        ("10.0.0.0", 8),
        ("10.1.0.0", 16),
        ("10.1.2.0", 24),
        ("10.200.0.0", 13),
        ("172.16.0.0", 12),
    ]
    .iter()
    .map(|(a, l)| Network::new(a.parse().unwrap(), *l).unwrap())
    .collect();

    let mut base = v4_tree();
    for (i, n) in networks.iter().enumerate() {
        base.insert(n, i as u32).unwrap();
    }
    validate_tree(&base);

    for_each_permutation(&networks, |perm| {
        let mut t = base.clone();
        for n in perm {
            t.remove(&n).unwrap();
            validate_tree(&t);
        }
        assert!(t.values().is_empty());
        assert_eq!(t.finalize(), 1);
    });
}
