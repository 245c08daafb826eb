// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use parking_lot::{RwLock, RwLockWriteGuard};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{
        counter::Counter,
        family::Family,
        histogram::{Histogram, exponential_buckets},
    },
};
use std::sync::LazyLock;

static DEFAULT_REGISTRY: LazyLock<RwLock<prometheus_client::registry::Registry>> =
    LazyLock::new(Default::default);

pub fn default_registry<'a>() -> RwLockWriteGuard<'a, prometheus_client::registry::Registry> {
    DEFAULT_REGISTRY.write()
}

pub static QUEUE_CACHE_RELOAD: LazyLock<Family<KindLabel, Counter>> = LazyLock::new(|| {
    let metric = Family::default();
    default_registry().register(
        "queue_cache_reload",
        "Number of staking queue cache reloads from the store",
        metric.clone(),
    );
    metric
});

pub static QUEUE_CACHE_MAX_SIZE_REACHED: LazyLock<Family<KindLabel, Counter>> =
    LazyLock::new(|| {
        let metric = Family::default();
        default_registry().register(
            "queue_cache_max_size_reached",
            "Number of staking queue cache operations rejected because the queue is full",
            metric.clone(),
        );
        metric
    });

pub static QUEUE_CACHE_RELOAD_TIME: LazyLock<Family<KindLabel, Histogram>> =
    LazyLock::new(|| {
        let metric = Family::<KindLabel, Histogram>::new_with_constructor(|| {
            // 0.1ms up to 10s
            Histogram::new(exponential_buckets(0.0001, 10., 6))
        });
        default_registry().register(
            "queue_cache_reload_time",
            "Duration of staking queue cache reloads in seconds",
            metric.clone(),
        );
        metric
    });

/// Encodes the default registry in the prometheus text format.
pub fn encode_metrics() -> anyhow::Result<String> {
    let mut metrics = String::new();
    prometheus_client::encoding::text::encode(&mut metrics, &DEFAULT_REGISTRY.read())?;
    Ok(metrics)
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct KindLabel {
    kind: &'static str,
}

pub mod values {
    use super::KindLabel;

    pub static UNBONDING_VALIDATORS: KindLabel = KindLabel {
        kind: "unbonding_validators",
    };
    pub static UNBONDING_DELEGATIONS: KindLabel = KindLabel {
        kind: "unbonding_delegations",
    };
    pub static REDELEGATIONS: KindLabel = KindLabel {
        kind: "redelegations",
    };
}
