// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Canonical string keys for the staking queues.
//!
//! Loaders must key their snapshots with these same functions, otherwise reads
//! through the cache will miss entries that the store does hold.

use anyhow::Context as _;
use chrono::{DateTime, Datelike as _, NaiveDateTime, Utc};

/// Fixed width layout, so that lexicographic order of keys is chronological
/// order for years `0000..=9999`.
pub const SORTABLE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9f";

/// Years for which [`SORTABLE_TIME_FORMAT`] is fixed width.
pub const SORTABLE_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

const HEIGHT_SEPARATOR: char = '/';

/// Renders `time` in [`SORTABLE_TIME_FORMAT`].
///
/// Only times within [`SORTABLE_YEARS`] are fixed width. Years past 9999
/// render with a leading `+` and negative years with a `-`, which breaks
/// chronological ordering, and [`parse_time_string`] rejects both.
pub fn format_time_string(time: DateTime<Utc>) -> String {
    time.format(SORTABLE_TIME_FORMAT).to_string()
}

/// Inverse of [`format_time_string`]. Only the canonical rendering of a time
/// within [`SORTABLE_YEARS`] is accepted.
pub fn parse_time_string(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let time = NaiveDateTime::parse_from_str(s, SORTABLE_TIME_FORMAT)
        .with_context(|| format!("invalid sortable time {s:?}"))?
        .and_utc();
    anyhow::ensure!(
        SORTABLE_YEARS.contains(&time.year()),
        "sortable time {s:?} is outside years 0000 to 9999"
    );
    anyhow::ensure!(
        format_time_string(time) == s,
        "sortable time {s:?} is not in canonical form"
    );
    Ok(time)
}

/// Key of the unbonding validators queue slice ending at `end_time` and `end_height`.
pub fn validator_queue_key(end_time: DateTime<Utc>, end_height: i64) -> String {
    format!(
        "{}{HEIGHT_SEPARATOR}{end_height}",
        format_time_string(end_time)
    )
}

/// Inverse of [`validator_queue_key`].
pub fn parse_validator_queue_key(key: &str) -> anyhow::Result<(DateTime<Utc>, i64)> {
    let (time, height) = key
        .rsplit_once(HEIGHT_SEPARATOR)
        .with_context(|| format!("validator queue key {key:?} has no height"))?;
    let height = height
        .parse::<i64>()
        .with_context(|| format!("invalid height in validator queue key {key:?}"))?;
    let time = parse_time_string(time)?;
    anyhow::ensure!(
        validator_queue_key(time, height) == key,
        "validator queue key {key:?} is not in canonical form"
    );
    Ok((time, height))
}

/// Key of the unbonding delegations queue slice maturing at `end_time`.
pub fn unbonding_delegation_queue_key(end_time: DateTime<Utc>) -> String {
    format_time_string(end_time)
}

/// Key of the redelegations queue slice maturing at `end_time`.
pub fn redelegation_queue_key(end_time: DateTime<Utc>) -> String {
    format_time_string(end_time)
}
