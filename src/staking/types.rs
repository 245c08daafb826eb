// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};

/// Bech32 operator address of a validator. Treated as opaque by the queues.
pub type ValAddress = String;

/// Delegator / validator pair stored in the unbonding delegations queue.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Constructor,
)]
pub struct DvPair {
    pub delegator_address: String,
    pub validator_address: ValAddress,
}

/// Delegator / source validator / destination validator triplet stored in the
/// redelegations queue.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Constructor,
)]
pub struct DvvTriplet {
    pub delegator_address: String,
    pub validator_src_address: ValAddress,
    pub validator_dst_address: ValAddress,
}
