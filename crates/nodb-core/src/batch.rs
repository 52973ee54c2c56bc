//! Chunked batch execution.
//!
//! A batch chain repeatedly plans a chunk with [`plan_chunk`], sends it as a
//! single batch call, and continues with whatever is left. Calls are strictly
//! sequential. The first failed call ends the chain; chunks applied before it
//! stay applied.
//!
//! The store may acknowledge a call but hand some entries back as
//! unprocessed. Those go to the front of the next chunk. A chain that gets
//! nothing through for more than `max_unprocessed_retries` consecutive calls
//! stops with [`NoDbError::UnprocessedItems`].

use std::collections::HashMap;

use tracing::Instrument;
use uuid::Uuid;

use nodb_model::error::StoreError;
use nodb_model::input::{BatchGetItemInput, BatchWriteItemInput};
use nodb_model::output::{BatchGetItemOutput, BatchWriteItemOutput};
use nodb_model::types::{
    Item, Key, KeysAndAttributes, PrimaryKey, ReturnConsumedCapacity, WriteRequest,
};
use nodb_model::{StoreOperation, StoreRequest, StoreResponse};

use crate::chunk::{Collection, outstanding, plan_chunk, requeue};
use crate::client::{StoreClient, call};
use crate::config::NoDbConfig;
use crate::error::{NoDbError, NoDbResult};

/// One write within a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemIntent {
    /// Put a whole item.
    Put(Item),
    /// Delete the item at a key.
    DeleteKey(PrimaryKey),
}

impl From<ItemIntent> for WriteRequest {
    fn from(intent: ItemIntent) -> Self {
        match intent {
            ItemIntent::Put(item) => Self::put(item),
            ItemIntent::DeleteKey(key) => Self::delete(key.into()),
        }
    }
}

/// Limits that shape one chain.
#[derive(Debug, Clone, Copy)]
pub struct ChainLimits {
    /// Entries per call.
    pub capacity: usize,
    /// Consecutive calls allowed to make no progress.
    pub max_unprocessed_retries: u32,
    /// Consumed capacity reporting asked of the store.
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,
}

impl ChainLimits {
    #[must_use]
    pub fn for_writes(config: &NoDbConfig) -> Self {
        Self {
            capacity: config.write_batch_limit,
            max_unprocessed_retries: config.max_unprocessed_retries,
            return_consumed_capacity: config.consumed_capacity(),
        }
    }

    #[must_use]
    pub fn for_reads(config: &NoDbConfig) -> Self {
        Self {
            capacity: config.read_batch_limit,
            ..Self::for_writes(config)
        }
    }
}

/// How a finished chain went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainReport {
    /// Store calls issued.
    pub calls: usize,
    /// Entries the store accepted.
    pub processed: usize,
}

/// One kind of batch call: how to shape a chunk into a request and how to
/// take its response apart.
trait BatchCall: Send {
    type Entry: Send;
    type Output;

    const OPERATION: StoreOperation;

    fn request(
        &self,
        chunk: Vec<Collection<Self::Entry>>,
        consumed: Option<ReturnConsumedCapacity>,
    ) -> StoreRequest;

    fn unwrap_response(response: StoreResponse) -> Result<Self::Output, StoreError>;

    /// Take in one response and return the entries handed back unprocessed.
    fn absorb(&mut self, output: Self::Output) -> HashMap<String, Vec<Self::Entry>>;
}

struct WriteCall;

impl BatchCall for WriteCall {
    type Entry = WriteRequest;
    type Output = BatchWriteItemOutput;

    const OPERATION: StoreOperation = StoreOperation::BatchWriteItem;

    fn request(
        &self,
        chunk: Vec<Collection<WriteRequest>>,
        consumed: Option<ReturnConsumedCapacity>,
    ) -> StoreRequest {
        BatchWriteItemInput {
            request_items: into_table_map(chunk),
            return_consumed_capacity: consumed,
        }
        .into()
    }

    fn unwrap_response(response: StoreResponse) -> Result<BatchWriteItemOutput, StoreError> {
        response.into_batch_write_item()
    }

    fn absorb(&mut self, output: BatchWriteItemOutput) -> HashMap<String, Vec<WriteRequest>> {
        output.unprocessed_items
    }
}

#[derive(Default)]
struct GetCall {
    found: HashMap<String, Vec<Item>>,
}

impl BatchCall for GetCall {
    type Entry = Key;
    type Output = BatchGetItemOutput;

    const OPERATION: StoreOperation = StoreOperation::BatchGetItem;

    fn request(
        &self,
        chunk: Vec<Collection<Key>>,
        consumed: Option<ReturnConsumedCapacity>,
    ) -> StoreRequest {
        let request_items = into_table_map(chunk)
            .into_iter()
            .map(|(table, keys)| {
                let keys = KeysAndAttributes {
                    keys,
                    ..KeysAndAttributes::default()
                };
                (table, keys)
            })
            .collect();
        BatchGetItemInput {
            request_items,
            return_consumed_capacity: consumed,
        }
        .into()
    }

    fn unwrap_response(response: StoreResponse) -> Result<BatchGetItemOutput, StoreError> {
        response.into_batch_get_item()
    }

    fn absorb(&mut self, output: BatchGetItemOutput) -> HashMap<String, Vec<Key>> {
        for (table, items) in output.responses {
            self.found.entry(table).or_default().extend(items);
        }
        output
            .unprocessed_keys
            .into_iter()
            .map(|(table, keys)| (table, keys.keys))
            .collect()
    }
}

/// Write every intent, `limits.capacity` at a time.
pub async fn write_all(
    client: &dyn StoreClient,
    limits: ChainLimits,
    collections: Vec<Collection<ItemIntent>>,
) -> NoDbResult<ChainReport> {
    let collections = collections
        .into_iter()
        .map(|(table, intents)| (table, intents.into_iter().map(WriteRequest::from).collect()))
        .collect();
    let (_, report) = drive(client, limits, WriteCall, collections).await?;
    Ok(report)
}

/// Read every key, `limits.capacity` at a time, and return the items found
/// per table.
///
/// Tables with no hits are absent from the result. Item order within a table
/// follows the store's responses.
pub async fn get_all(
    client: &dyn StoreClient,
    limits: ChainLimits,
    collections: Vec<Collection<PrimaryKey>>,
) -> NoDbResult<HashMap<String, Vec<Item>>> {
    let collections = collections
        .into_iter()
        .map(|(table, keys)| (table, keys.into_iter().map(Key::from).collect()))
        .collect();
    let (call, _) = drive(client, limits, GetCall::default(), collections).await?;
    Ok(call.found)
}

async fn drive<B: BatchCall>(
    client: &dyn StoreClient,
    limits: ChainLimits,
    mut batch_call: B,
    collections: Vec<Collection<B::Entry>>,
) -> NoDbResult<(B, ChainReport)> {
    if limits.capacity == 0 {
        return Err(NoDbError::usage("batch capacity must be at least 1"));
    }

    let chain_id = Uuid::new_v4();
    let total = outstanding(&collections);
    let span = tracing::info_span!("batch_chain", operation = %B::OPERATION, %chain_id, total);

    async move {
        let mut pending = collections;
        let mut report = ChainReport::default();
        let mut stalled = 0_u32;

        while outstanding(&pending) > 0 {
            let plan = plan_chunk(pending, limits.capacity);
            let sent = plan.batch_len();
            let order: Vec<String> = plan.batch.iter().map(|(name, _)| name.clone()).collect();
            let request = batch_call.request(plan.batch, limits.return_consumed_capacity);

            let output = call(client, request, B::unwrap_response).await?;
            report.calls += 1;

            let handed_back = in_order(batch_call.absorb(output), &order);
            let unprocessed = outstanding(&handed_back);
            report.processed += sent.saturating_sub(unprocessed);
            pending = requeue(handed_back, plan.remainder);

            if unprocessed == 0 {
                stalled = 0;
            } else if unprocessed < sent {
                stalled = 0;
                tracing::warn!(unprocessed, "store handed back part of a chunk");
            } else {
                stalled += 1;
                tracing::warn!(unprocessed, stalled, "store processed nothing in a chunk");
                if stalled > limits.max_unprocessed_retries {
                    return Err(NoDbError::UnprocessedItems {
                        operation: B::OPERATION,
                        remaining: outstanding(&pending),
                    });
                }
            }
        }

        tracing::debug!(calls = report.calls, processed = report.processed, "batch chain finished");
        Ok((batch_call, report))
    }
    .instrument(span)
    .await
}

/// Merge a chunk into the per-table map a batch call carries.
fn into_table_map<T>(chunk: Vec<Collection<T>>) -> HashMap<String, Vec<T>> {
    let mut map: HashMap<String, Vec<T>> = HashMap::with_capacity(chunk.len());
    for (table, entries) in chunk {
        map.entry(table).or_default().extend(entries);
    }
    map
}

/// Order handed-back entries by the tables' position in the chunk that was
/// sent. Tables the chunk did not name go last.
fn in_order<T>(mut by_table: HashMap<String, Vec<T>>, order: &[String]) -> Vec<Collection<T>> {
    let mut ordered: Vec<Collection<T>> = order
        .iter()
        .filter_map(|table| by_table.remove(table).map(|entries| (table.clone(), entries)))
        .collect();
    ordered.extend(by_table);
    ordered.retain(|(_, entries)| !entries.is_empty());
    ordered
}
