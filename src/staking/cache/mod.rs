// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! In-memory index over the three time-keyed staking queues.
//!
//! Block-end processing reads the unbonding validators, unbonding delegations
//! and redelegations queues on every block. [`QueueCache`] serves those reads
//! from memory and only goes back to the store, through the loaders supplied
//! at construction, when a queue has been marked dirty.
//!
//! Writes go through the cache and the store alike; the store side belongs to
//! the caller. Whenever the store changes behind the cache's back (a discarded
//! block, a write rejected with [`Error::MaxSizeReached`]) the affected queue
//! must be marked dirty so that its next read reloads.

pub mod config;
mod entry;
mod errors;

pub use self::{
    config::{DEFAULT_QUEUE_CACHE_SIZE, QueueCacheConfig},
    entry::CacheEntry,
    errors::Error,
};

use std::collections::BTreeMap;
use std::time::Instant;

use ahash::HashMap;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::metrics::{self, KindLabel};
use crate::staking::keys::{
    parse_time_string, parse_validator_queue_key, redelegation_queue_key,
    unbonding_delegation_queue_key, validator_queue_key,
};
use crate::staking::types::{DvPair, DvvTriplet, ValAddress};

/// Snapshot of one queue: canonical key to the values maturing under it.
pub type QueueMap<T> = HashMap<String, Vec<T>>;

/// Reads the full contents of one queue from the store.
pub type Loader<C, T> = Box<dyn Fn(&C) -> anyhow::Result<QueueMap<T>> + Send + Sync>;

/// Produces the span that reload events are logged under.
pub type LoggerFn<C> = Box<dyn Fn(&C) -> tracing::Span + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum QueueKind {
    #[strum(to_string = "Unbonding validators")]
    UnbondingValidators,
    #[strum(to_string = "Unbonding delegations")]
    UnbondingDelegations,
    #[strum(to_string = "Redelegations")]
    Redelegations,
}

impl QueueKind {
    fn metric_label(self) -> &'static KindLabel {
        match self {
            QueueKind::UnbondingValidators => &metrics::values::UNBONDING_VALIDATORS,
            QueueKind::UnbondingDelegations => &metrics::values::UNBONDING_DELEGATIONS,
            QueueKind::Redelegations => &metrics::values::REDELEGATIONS,
        }
    }
}

struct Queue<C: ?Sized, T> {
    kind: QueueKind,
    entry: CacheEntry<String, T>,
    loader: Loader<C, T>,
}

impl<C: ?Sized, T: Clone> Queue<C, T> {
    fn new(kind: QueueKind, max: usize, loader: Loader<C, T>) -> Self {
        Self {
            kind,
            entry: CacheEntry::new(max),
            loader,
        }
    }

    fn max_size_reached(&self) -> Error {
        metrics::QUEUE_CACHE_MAX_SIZE_REACHED
            .get_or_create(self.kind.metric_label())
            .inc();
        Error::MaxSizeReached
    }

    /// Fails while the queue is full, and reloads it from the store if dirty.
    fn ensure_loaded(&self, ctx: &C, logger: &LoggerFn<C>) -> Result<(), Error> {
        if self.entry.is_full() {
            return Err(self.max_size_reached());
        }
        if self.entry.is_dirty() {
            logger(ctx).in_scope(|| {
                info!(
                    "{} queue is dirty. Reinitializing cache from store.",
                    self.kind
                )
            });
            self.reload(ctx)?;
        }
        Ok(())
    }

    /// Replaces the queue contents with a fresh store snapshot. The loader runs
    /// without any lock held. On failure the queue stays dirty.
    fn reload(&self, ctx: &C) -> Result<(), Error> {
        let start = Instant::now();
        self.entry.clear();
        let snapshot = (self.loader)(ctx)?;
        for (key, values) in snapshot {
            if !self.entry.set_entry(key, values) {
                return Err(self.max_size_reached());
            }
        }
        self.entry.set_dirty(false);

        let label = self.kind.metric_label();
        metrics::QUEUE_CACHE_RELOAD.get_or_create(label).inc();
        metrics::QUEUE_CACHE_RELOAD_TIME
            .get_or_create(label)
            .observe(start.elapsed().as_secs_f64());
        Ok(())
    }

    fn get(&self, ctx: &C, logger: &LoggerFn<C>) -> Result<QueueMap<T>, Error> {
        self.ensure_loaded(ctx, logger)?;
        Ok(self.entry.get())
    }

    fn get_entry(&self, ctx: &C, logger: &LoggerFn<C>, key: &str) -> Result<Vec<T>, Error> {
        self.ensure_loaded(ctx, logger)?;
        Ok(self.entry.get_entry(key))
    }

    fn set_entry(&self, key: String, values: Vec<T>) -> Result<(), Error> {
        if !self.entry.set_entry(key, values) {
            // The caller has already written the store, so memory is now stale.
            self.entry.set_dirty(true);
            return Err(self.max_size_reached());
        }
        Ok(())
    }

    fn delete_entry(&self, key: &str) {
        self.entry.delete_entry(key);
    }
}

/// Bounded, lazily loaded, write-through cache of the staking queues.
///
/// Each queue is guarded independently; no operation holds more than one
/// queue's lock at a time, and no ordering is guaranteed across queues.
pub struct QueueCache<C: ?Sized> {
    logger: LoggerFn<C>,
    unbonding_validators: Queue<C, ValAddress>,
    unbonding_delegations: Queue<C, DvPair>,
    redelegations: Queue<C, DvvTriplet>,
}

impl<C: ?Sized> QueueCache<C> {
    /// Creates a cache holding at most `size` keys per queue (`0` for
    /// unlimited). All queues start dirty and load on first read.
    pub fn new(
        size: usize,
        logger: impl Fn(&C) -> tracing::Span + Send + Sync + 'static,
        load_validators: impl Fn(&C) -> anyhow::Result<QueueMap<ValAddress>> + Send + Sync + 'static,
        load_delegations: impl Fn(&C) -> anyhow::Result<QueueMap<DvPair>> + Send + Sync + 'static,
        load_redelegations: impl Fn(&C) -> anyhow::Result<QueueMap<DvvTriplet>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            logger: Box::new(logger),
            unbonding_validators: Queue::new(
                QueueKind::UnbondingValidators,
                size,
                Box::new(load_validators),
            ),
            unbonding_delegations: Queue::new(
                QueueKind::UnbondingDelegations,
                size,
                Box::new(load_delegations),
            ),
            redelegations: Queue::new(
                QueueKind::Redelegations,
                size,
                Box::new(load_redelegations),
            ),
        }
    }

    pub fn get_unbonding_validators_queue(
        &self,
        ctx: &C,
    ) -> Result<QueueMap<ValAddress>, Error> {
        self.unbonding_validators.get(ctx, &self.logger)
    }

    /// Validators whose unbonding ends at exactly `end_time` and `end_height`.
    pub fn get_unbonding_validators_queue_entry(
        &self,
        ctx: &C,
        end_time: DateTime<Utc>,
        end_height: i64,
    ) -> Result<Vec<ValAddress>, Error> {
        let key = validator_queue_key(end_time, end_height);
        self.unbonding_validators.get_entry(ctx, &self.logger, &key)
    }

    /// `key` is expected to come from [`validator_queue_key`].
    ///
    /// Unlike the reads, set operations take no request context: a set never
    /// reloads from the store, so there is nothing for the context to reach.
    pub fn set_unbonding_validator_queue_entry(
        &self,
        key: impl Into<String>,
        addrs: impl Into<Vec<ValAddress>>,
    ) -> Result<(), Error> {
        self.unbonding_validators
            .set_entry(key.into(), addrs.into())
    }

    pub fn delete_unbonding_validator_queue_entry(&self, key: &str) {
        self.unbonding_validators.delete_entry(key)
    }

    pub fn get_unbonding_delegations_queue(&self, ctx: &C) -> Result<QueueMap<DvPair>, Error> {
        self.unbonding_delegations.get(ctx, &self.logger)
    }

    pub fn get_unbonding_delegations_queue_entry(
        &self,
        ctx: &C,
        end_time: DateTime<Utc>,
    ) -> Result<Vec<DvPair>, Error> {
        let key = unbonding_delegation_queue_key(end_time);
        self.unbonding_delegations
            .get_entry(ctx, &self.logger, &key)
    }

    /// `key` is expected to come from [`unbonding_delegation_queue_key`].
    /// Takes no request context, as for [`Self::set_unbonding_validator_queue_entry`].
    pub fn set_unbonding_delegations_queue_entry(
        &self,
        key: impl Into<String>,
        pairs: impl Into<Vec<DvPair>>,
    ) -> Result<(), Error> {
        self.unbonding_delegations
            .set_entry(key.into(), pairs.into())
    }

    pub fn delete_unbonding_delegation_queue_entry(&self, key: &str) {
        self.unbonding_delegations.delete_entry(key)
    }

    pub fn get_redelegations_queue(&self, ctx: &C) -> Result<QueueMap<DvvTriplet>, Error> {
        self.redelegations.get(ctx, &self.logger)
    }

    pub fn get_redelegations_queue_entry(
        &self,
        ctx: &C,
        end_time: DateTime<Utc>,
    ) -> Result<Vec<DvvTriplet>, Error> {
        let key = redelegation_queue_key(end_time);
        self.redelegations.get_entry(ctx, &self.logger, &key)
    }

    /// `key` is expected to come from [`redelegation_queue_key`].
    /// Takes no request context, as for [`Self::set_unbonding_validator_queue_entry`].
    pub fn set_redelegations_queue_entry(
        &self,
        key: impl Into<String>,
        triplets: impl Into<Vec<DvvTriplet>>,
    ) -> Result<(), Error> {
        self.redelegations.set_entry(key.into(), triplets.into())
    }

    pub fn delete_redelegations_queue_entry(&self, key: &str) {
        self.redelegations.delete_entry(key)
    }

    /// Unbonding validator slices that are due at `block_time` and
    /// `block_height`, i.e. whose end time and end height have both passed.
    /// Nothing is removed from the cache.
    pub fn get_mature_unbonding_validators(
        &self,
        ctx: &C,
        block_time: DateTime<Utc>,
        block_height: i64,
    ) -> Result<BTreeMap<(DateTime<Utc>, i64), Vec<ValAddress>>, Error> {
        let mut mature = BTreeMap::new();
        for (key, addrs) in self.get_unbonding_validators_queue(ctx)? {
            let (end_time, end_height) = match parse_validator_queue_key(&key) {
                Ok(parsed) => parsed,
                Err(e) => return Err(malformed_key(key, e)),
            };
            if end_time <= block_time && end_height <= block_height {
                mature.insert((end_time, end_height), addrs);
            }
        }
        Ok(mature)
    }

    /// Unbonding delegation slices maturing at or before `now`.
    pub fn get_mature_unbonding_delegations(
        &self,
        ctx: &C,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<DateTime<Utc>, Vec<DvPair>>, Error> {
        mature_by_time(self.get_unbonding_delegations_queue(ctx)?, now)
    }

    /// Redelegation slices completing at or before `now`.
    pub fn get_mature_redelegations(
        &self,
        ctx: &C,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<DateTime<Utc>, Vec<DvvTriplet>>, Error> {
        mature_by_time(self.get_redelegations_queue(ctx)?, now)
    }

    /// Forces the next read of `kind` to reload from the store.
    pub fn mark_dirty(&self, kind: QueueKind) {
        match kind {
            QueueKind::UnbondingValidators => self.unbonding_validators.entry.set_dirty(true),
            QueueKind::UnbondingDelegations => self.unbonding_delegations.entry.set_dirty(true),
            QueueKind::Redelegations => self.redelegations.entry.set_dirty(true),
        }
    }

    /// Marks every queue dirty, e.g. after a block failed to commit.
    pub fn mark_all_dirty(&self) {
        for kind in <QueueKind as strum::IntoEnumIterator>::iter() {
            self.mark_dirty(kind);
        }
    }

    pub fn is_dirty(&self, kind: QueueKind) -> bool {
        match kind {
            QueueKind::UnbondingValidators => self.unbonding_validators.entry.is_dirty(),
            QueueKind::UnbondingDelegations => self.unbonding_delegations.entry.is_dirty(),
            QueueKind::Redelegations => self.redelegations.entry.is_dirty(),
        }
    }

    pub fn is_full(&self, kind: QueueKind) -> bool {
        match kind {
            QueueKind::UnbondingValidators => self.unbonding_validators.entry.is_full(),
            QueueKind::UnbondingDelegations => self.unbonding_delegations.entry.is_full(),
            QueueKind::Redelegations => self.redelegations.entry.is_full(),
        }
    }

    #[cfg(test)]
    fn set_dirty(&self, kind: QueueKind, dirty: bool) {
        match kind {
            QueueKind::UnbondingValidators => self.unbonding_validators.entry.set_dirty(dirty),
            QueueKind::UnbondingDelegations => self.unbonding_delegations.entry.set_dirty(dirty),
            QueueKind::Redelegations => self.redelegations.entry.set_dirty(dirty),
        }
    }
}

fn mature_by_time<T>(
    queue: QueueMap<T>,
    now: DateTime<Utc>,
) -> Result<BTreeMap<DateTime<Utc>, Vec<T>>, Error> {
    let mut mature = BTreeMap::new();
    for (key, values) in queue {
        let end_time = match parse_time_string(&key) {
            Ok(end_time) => end_time,
            Err(e) => return Err(malformed_key(key, e)),
        };
        if end_time <= now {
            mature.insert(end_time, values);
        }
    }
    Ok(mature)
}

fn malformed_key(key: String, e: anyhow::Error) -> Error {
    Error::MalformedKey {
        key,
        reason: format!("{e:#}"),
    }
}
