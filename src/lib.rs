// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Bounded in-memory cache of the staking module's time-keyed queues.

pub mod metrics;
pub mod staking;
#[cfg(test)]
mod test_utils;

pub use staking::cache::{
    DEFAULT_QUEUE_CACHE_SIZE, Error, QueueCache, QueueCacheConfig, QueueKind, QueueMap,
};
pub use staking::types::{DvPair, DvvTriplet, ValAddress};
