//! Access layer configuration.
//!
//! The defaults are the store's documented per-call limits. Any of them can
//! be overridden through the builder or from environment variables.

use std::env;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use nodb_model::types::ReturnConsumedCapacity;

/// Per-call item limits imposed by the store, plus chain tuning.
///
/// # Examples
///
/// ```
/// use nodb_core::NoDbConfig;
///
/// let config = NoDbConfig::builder().write_batch_limit(10).build();
/// assert_eq!(config.write_batch_limit, 10);
/// assert_eq!(config.read_batch_limit, 100);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct NoDbConfig {
    /// Maximum number of puts/deletes in one `BatchWriteItem` call.
    #[builder(default = 25)]
    pub write_batch_limit: usize,
    /// Maximum number of keys in one `BatchGetItem` call.
    #[builder(default = 100)]
    pub read_batch_limit: usize,
    /// Maximum number of actions in one `TransactWriteItems` call.
    #[builder(default = 10)]
    pub transact_item_limit: usize,
    /// How many consecutive calls may hand back unprocessed entries without
    /// the outstanding work shrinking before a batch chain gives up.
    #[builder(default = 5)]
    pub max_unprocessed_retries: u32,
    /// Ask the store to report consumed capacity on batch and query calls.
    #[builder(default = true)]
    pub return_consumed_capacity: bool,
}

impl NoDbConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads `NODB_WRITE_BATCH_LIMIT`, `NODB_READ_BATCH_LIMIT`,
    /// `NODB_TRANSACT_ITEM_LIMIT`, `NODB_MAX_UNPROCESSED_RETRIES` and
    /// `NODB_RETURN_CONSUMED_CAPACITY`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            write_batch_limit: env_usize("NODB_WRITE_BATCH_LIMIT", defaults.write_batch_limit),
            read_batch_limit: env_usize("NODB_READ_BATCH_LIMIT", defaults.read_batch_limit),
            transact_item_limit: env_usize(
                "NODB_TRANSACT_ITEM_LIMIT",
                defaults.transact_item_limit,
            ),
            max_unprocessed_retries: env::var("NODB_MAX_UNPROCESSED_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_unprocessed_retries),
            return_consumed_capacity: env_bool(
                "NODB_RETURN_CONSUMED_CAPACITY",
                defaults.return_consumed_capacity,
            ),
        }
    }

    /// The `ReturnConsumedCapacity` setting to put on batch and query calls.
    #[must_use]
    pub fn consumed_capacity(&self) -> Option<ReturnConsumedCapacity> {
        self.return_consumed_capacity
            .then_some(ReturnConsumedCapacity::Total)
    }
}

impl Default for NoDbConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}

/// Zero is rejected: a zero capacity would never make progress.
fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}
