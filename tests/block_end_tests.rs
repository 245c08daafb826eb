// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone as _, Utc};
use parking_lot::RwLock;
use pretty_assertions::assert_eq;
use staking_queue_cache::staking::keys::{parse_validator_queue_key, validator_queue_key};
use staking_queue_cache::{Error, QueueCache, QueueKind, QueueMap, ValAddress};

type Store = Arc<RwLock<BTreeMap<String, Vec<ValAddress>>>>;

struct Block {
    height: i64,
    time: DateTime<Utc>,
}

impl Block {
    fn matures(&self, key: &str) -> bool {
        let (time, height) = parse_validator_queue_key(key).unwrap();
        time <= self.time && height <= self.height
    }
}

/// Minimal staking keeper writing the unbonding validators queue through the
/// cache and into a shared store.
struct Keeper {
    store: Store,
    cache: QueueCache<Block>,
}

impl Keeper {
    fn new(size: usize) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let store = Store::default();
        let loader_store = store.clone();
        let cache = QueueCache::new(
            size,
            |block: &Block| tracing::info_span!("end_block", height = block.height),
            move |_: &Block| -> anyhow::Result<QueueMap<ValAddress>> {
                Ok(loader_store
                    .read()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect())
            },
            |_: &Block| Ok(QueueMap::default()),
            |_: &Block| Ok(QueueMap::default()),
        );
        Self { store, cache }
    }

    fn insert_unbonding_validator(
        &self,
        addr: &str,
        end_time: DateTime<Utc>,
        end_height: i64,
    ) -> Result<(), Error> {
        let key = validator_queue_key(end_time, end_height);
        let addrs = {
            let mut store = self.store.write();
            let addrs = store.entry(key.clone()).or_default();
            addrs.push(addr.to_string());
            addrs.clone()
        };
        self.cache.set_unbonding_validator_queue_entry(key, addrs)
    }

    /// Dequeues every validator whose unbonding has matured at `block`.
    fn end_block(&self, block: &Block) -> Vec<ValAddress> {
        let mature = match self
            .cache
            .get_mature_unbonding_validators(block, block.time, block.height)
        {
            Ok(mature) => mature.into_values().flatten().collect(),
            Err(e) if e.is_max_size_reached() => self
                .store
                .read()
                .iter()
                .filter(|(key, _)| block.matures(key))
                .flat_map(|(_, addrs)| addrs.clone())
                .collect(),
            Err(e) => panic!("unexpected cache error: {e}"),
        };
        let keys: Vec<String> = self
            .store
            .read()
            .keys()
            .filter(|key| block.matures(key))
            .cloned()
            .collect();
        for key in keys {
            self.store.write().remove(&key);
            self.cache.delete_unbonding_validator_queue_entry(&key);
        }
        mature
    }
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
}

#[test]
fn mature_validators_are_dequeued_in_order() {
    let keeper = Keeper::new(100);
    keeper.insert_unbonding_validator("val3", at(3), 30).unwrap();
    keeper.insert_unbonding_validator("val1", at(1), 10).unwrap();
    keeper.insert_unbonding_validator("val2", at(1), 10).unwrap();
    keeper.insert_unbonding_validator("val4", at(2), 40).unwrap();

    let block = Block {
        height: 35,
        time: at(3),
    };
    assert_eq!(keeper.end_block(&block), vec!["val1", "val2", "val3"]);
    assert!(keeper.end_block(&block).is_empty());

    let remaining = keeper.cache.get_unbonding_validators_queue(&block).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[&validator_queue_key(at(2), 40)], vec!["val4"]);
}

#[test]
fn out_of_band_writes_are_reloaded_after_mark_dirty() {
    let keeper = Keeper::new(100);
    let block = Block {
        height: 1,
        time: at(0),
    };
    assert!(keeper
        .cache
        .get_unbonding_validators_queue(&block)
        .unwrap()
        .is_empty());

    // reaches the store without going through the cache
    keeper
        .store
        .write()
        .insert(validator_queue_key(at(1), 1), vec!["val1".into()]);
    assert!(keeper
        .cache
        .get_unbonding_validators_queue(&block)
        .unwrap()
        .is_empty());

    keeper.cache.mark_all_dirty();
    assert_eq!(
        keeper
            .cache
            .get_unbonding_validators_queue(&block)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn full_cache_falls_back_to_store() {
    let keeper = Keeper::new(2);
    keeper.insert_unbonding_validator("val1", at(1), 1).unwrap();
    keeper.insert_unbonding_validator("val2", at(2), 2).unwrap();
    let err = keeper
        .insert_unbonding_validator("val3", at(3), 3)
        .unwrap_err();
    assert!(err.is_max_size_reached());
    assert!(keeper.cache.is_full(QueueKind::UnbondingValidators));
    assert!(keeper.cache.is_dirty(QueueKind::UnbondingValidators));

    let block = Block {
        height: 1,
        time: at(1),
    };
    assert_eq!(keeper.end_block(&block), vec!["val1"]);

    // the dequeue made room, so the next read reloads the store
    assert!(!keeper.cache.is_full(QueueKind::UnbondingValidators));
    let queue = keeper.cache.get_unbonding_validators_queue(&block).unwrap();
    assert_eq!(queue.len(), 2);
    assert!(!keeper.cache.is_dirty(QueueKind::UnbondingValidators));
}
