//! Scripted store client for unit tests.

use std::collections::VecDeque;

use parking_lot::Mutex;

use nodb_model::attribute_value::AttributeValue;
use nodb_model::error::StoreError;
use nodb_model::input::{BatchGetItemInput, BatchWriteItemInput, QueryInput};
use nodb_model::types::Item;
use nodb_model::{StoreOperation, StoreRequest, StoreResponse};

use crate::client::{StoreClient, StoreFuture};

/// Replays queued responses in order and records every request it receives.
#[derive(Debug, Default)]
pub(crate) struct ScriptedClient {
    responses: Mutex<VecDeque<Result<StoreResponse, StoreError>>>,
    requests: Mutex<Vec<StoreRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_ok(&self, response: StoreResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    pub(crate) fn push_err(&self, error: StoreError) {
        self.responses.lock().push_back(Err(error));
    }

    pub(crate) fn requests(&self) -> Vec<StoreRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn operations(&self) -> Vec<StoreOperation> {
        self.requests.lock().iter().map(StoreRequest::operation).collect()
    }

    pub(crate) fn batch_writes(&self) -> Vec<BatchWriteItemInput> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                StoreRequest::BatchWriteItem(input) => Some(input),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn batch_gets(&self) -> Vec<BatchGetItemInput> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                StoreRequest::BatchGetItem(input) => Some(input),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn queries(&self) -> Vec<QueryInput> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                StoreRequest::Query(input) => Some(input),
                _ => None,
            })
            .collect()
    }
}

impl StoreClient for ScriptedClient {
    fn send(&self, request: StoreRequest) -> StoreFuture<'_> {
        let operation = request.operation();
        self.requests.lock().push(request);
        let next = self.responses.lock().pop_front();
        Box::pin(async move {
            next.unwrap_or_else(|| {
                Err(StoreError::internal_error(format!(
                    "no scripted response left for {operation}"
                )))
            })
        })
    }
}

/// An item `{ "id": <id> }`.
pub(crate) fn item(id: usize) -> Item {
    let mut item = Item::new();
    item.insert("id".to_owned(), AttributeValue::from(id));
    item
}
