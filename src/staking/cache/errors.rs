// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Queue cache error.
#[derive(Debug, Error)]
pub enum Error {
    /// The queue holds its maximum number of keys. Callers fall back to the store.
    #[error("cache max size reached")]
    MaxSizeReached,

    /// The store loader failed; the queue stays dirty and the next read retries.
    #[error(transparent)]
    Loader(#[from] anyhow::Error),

    #[error("malformed queue key {key:?}: {reason}")]
    MalformedKey { key: String, reason: String },
}

impl Error {
    pub fn is_max_size_reached(&self) -> bool {
        matches!(self, Error::MaxSizeReached)
    }
}
