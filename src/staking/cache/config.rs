// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// Default maximum number of keys held per queue.
pub const DEFAULT_QUEUE_CACHE_SIZE: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, smart_default::SmartDefault)]
#[serde(default)]
pub struct QueueCacheConfig {
    /// Maximum number of distinct keys per queue, `0` for unlimited.
    #[default(DEFAULT_QUEUE_CACHE_SIZE)]
    pub size: usize,
}

impl QueueCacheConfig {
    pub fn from_toml(toml_string: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_string).context("invalid queue cache configuration")
    }

    pub fn is_unlimited(&self) -> bool {
        self.size == 0
    }
}
