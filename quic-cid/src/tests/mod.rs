use std::collections::BTreeMap;

use hex_literal::hex;
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
use tracing::info;

use crate::{
    ConnectionId, ConnectionIdGenerator, ConnectionIdMap, RandomConnectionIdGenerator,
    StorageStrategy, DEFAULT_CID_SIZE, MAX_CID_SIZE,
};

use util::*;

const STRATEGIES: [StorageStrategy; 2] = [StorageStrategy::Legacy, StorageStrategy::Hybrid];

fn random_cid(rng: &mut StdRng, strategy: StorageStrategy) -> ConnectionId {
    let len = rng.gen_range(0..=MAX_CID_SIZE);
    let mut bytes = [0; MAX_CID_SIZE];
    rng.fill_bytes(&mut bytes[..len]);
    ConnectionId::with_strategy(&bytes[..len], strategy)
}

#[test]
fn default_length_cid() {
    let _guard = subscribe();
    for strategy in STRATEGIES {
        let cid = ConnectionId::with_strategy(&hex!("0102030405060708"), strategy);
        assert_eq!(cid.len(), DEFAULT_CID_SIZE);
        assert_eq!(cid.to_string(), "0102030405060708");
        assert_eq!(cid.hash_value(), u64::from_be_bytes(hex!("0102030405060708")));
    }
}

#[test]
fn empty_cid() {
    let _guard = subscribe();
    for cid in [
        ConnectionId::empty(),
        ConnectionId::default(),
        ConnectionId::with_strategy(&[], StorageStrategy::Legacy),
    ] {
        assert!(cid.is_empty());
        assert_eq!(cid.len(), 0);
        assert_eq!(cid.data(), &[] as &[u8]);
        assert_eq!(cid.to_string(), "0");
        assert_eq!(cid.hash_value(), u64::from_be(DEFAULT_CID_SIZE as u64));
    }
}

#[test]
fn oversize_cid_is_reported() {
    let (_guard, captured) = subscribe_captured();
    let input = [0xee; MAX_CID_SIZE + 5];
    for strategy in STRATEGIES {
        let cid = ConnectionId::with_strategy(&input, strategy);
        assert_eq!(cid.len(), MAX_CID_SIZE);
        assert_eq!(cid.data(), &input[..MAX_CID_SIZE]);
    }
    let logs = captured.contents();
    assert!(logs.contains("connection ID too long"), "{logs}");
    assert!(logs.contains("requested=25"), "{logs}");
    assert_eq!(logs.matches("connection ID too long").count(), 2);
}

#[test]
fn oversize_set_len_is_reported() {
    let (_guard, captured) = subscribe_captured();
    let mut cid = ConnectionId::with_strategy(&[1; 9], StorageStrategy::Hybrid);
    cid.set_len(64);
    assert_eq!(cid.len(), MAX_CID_SIZE);
    assert!(captured.contents().contains("requested=64"));
}

#[test]
fn in_range_cids_log_nothing() {
    let (_guard, captured) = subscribe_captured();
    for strategy in STRATEGIES {
        let mut cid = ConnectionId::with_strategy(&[3; MAX_CID_SIZE], strategy);
        cid.set_len(1);
        cid.set_len(MAX_CID_SIZE);
    }
    assert!(!captured.contents().contains("ERROR"));
}

#[test]
fn equality_is_an_equivalence() {
    let _guard = subscribe();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..200 {
        let a = random_cid(&mut rng, StorageStrategy::Hybrid);
        let b = ConnectionId::with_strategy(&a, StorageStrategy::Legacy);
        let c = b.clone();
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_eq!(b, c);
        assert_eq!(a, c);
        assert_eq!(a.hash_value(), c.hash_value());

        let other = random_cid(&mut rng, StorageStrategy::Hybrid);
        assert_eq!(
            a == other,
            a.len() == other.len() && a.data() == other.data()
        );
    }
}

#[test]
fn ordering_is_length_first() {
    let _guard = subscribe();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let a = random_cid(&mut rng, StorageStrategy::Hybrid);
        let b = random_cid(&mut rng, StorageStrategy::Legacy);
        let expected = a
            .len()
            .cmp(&b.len())
            .then_with(|| a.data().cmp(b.data()));
        assert_eq!(a.cmp(&b), expected);
        assert_eq!(b.cmp(&a), expected.reverse());
    }

    let mut routes = BTreeMap::new();
    routes.insert(ConnectionId::new(&[0xff; 3]), "three");
    routes.insert(ConnectionId::new(&[0x00; 5]), "five");
    routes.insert(ConnectionId::new(&[0x00; 12]), "twelve");
    routes.insert(ConnectionId::new(&[0x01; 3]), "three again");
    let order: Vec<_> = routes.values().copied().collect();
    assert_eq!(order, ["three again", "three", "five", "twelve"]);
}

#[test]
fn set_len_walks_every_transition() {
    let _guard = subscribe();
    let bytes: Vec<u8> = (0xa0..0xa0 + MAX_CID_SIZE as u8).collect();
    let mut cid = ConnectionId::with_strategy(&bytes[..2], StorageStrategy::Hybrid);
    let mut expected = bytes[..2].to_vec();
    // inline -> inline -> heap -> heap -> heap -> inline -> empty
    for len in [DEFAULT_CID_SIZE, 9, MAX_CID_SIZE, 10, 4, 0] {
        info!(from = cid.len(), to = len, "resizing");
        cid.set_len(len);
        expected.resize(len, 0);
        assert_eq!(cid.data(), &expected[..]);
        assert_eq!(cid.is_heap(), len > DEFAULT_CID_SIZE);
    }
}

#[test]
fn routing_table_by_generated_cids() {
    let _guard = subscribe();
    let mut table = ConnectionIdMap::default();
    let mut cids = Vec::new();
    for len in [4, DEFAULT_CID_SIZE, MAX_CID_SIZE] {
        let mut generator = RandomConnectionIdGenerator::from_seed(len, [len as u8; 32]);
        cids.extend((0..2048).map(|_| generator.generate_cid()));
    }
    for (i, cid) in cids.iter().enumerate() {
        table.insert(cid.clone(), i);
    }
    // 4-byte CIDs may repeat across 2048 draws
    assert!(table.len() > cids.len() - 8);
    for cid in &cids {
        let legacy = ConnectionId::with_strategy(cid, StorageStrategy::Legacy);
        assert_eq!(table.get(&legacy), table.get(cid));
        assert!(table.contains_key(&legacy));
    }
}
