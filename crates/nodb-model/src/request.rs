//! Closed sets of request and response variants, one per call kind.
//!
//! A store client receives a [`StoreRequest`] and answers with the
//! [`StoreResponse`] variant of the same kind. Callers unwrap the response
//! with the typed `into_*` accessors, which turn a kind mismatch into a
//! [`StoreError`].

use serde::Serialize;

use crate::error::StoreError;
use crate::input::{
    BatchGetItemInput, BatchWriteItemInput, DeleteItemInput, GetItemInput, PutItemInput,
    QueryInput, TransactWriteItemsInput, UpdateItemInput,
};
use crate::operations::StoreOperation;
use crate::output::{
    BatchGetItemOutput, BatchWriteItemOutput, DeleteItemOutput, GetItemOutput, PutItemOutput,
    QueryOutput, TransactWriteItemsOutput, UpdateItemOutput,
};

/// A request to the store.
///
/// Serializes as the bare input body, which is what gets logged when a call
/// fails.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StoreRequest {
    GetItem(GetItemInput),
    PutItem(PutItemInput),
    DeleteItem(DeleteItemInput),
    UpdateItem(UpdateItemInput),
    BatchGetItem(BatchGetItemInput),
    BatchWriteItem(BatchWriteItemInput),
    Query(QueryInput),
    TransactWriteItems(TransactWriteItemsInput),
}

/// A successful response from the store.
#[derive(Debug, Clone)]
pub enum StoreResponse {
    GetItem(GetItemOutput),
    PutItem(PutItemOutput),
    DeleteItem(DeleteItemOutput),
    UpdateItem(UpdateItemOutput),
    BatchGetItem(BatchGetItemOutput),
    BatchWriteItem(BatchWriteItemOutput),
    Query(QueryOutput),
    TransactWriteItems(TransactWriteItemsOutput),
}

impl StoreRequest {
    /// The call kind of this request.
    #[must_use]
    pub fn operation(&self) -> StoreOperation {
        match self {
            Self::GetItem(_) => StoreOperation::GetItem,
            Self::PutItem(_) => StoreOperation::PutItem,
            Self::DeleteItem(_) => StoreOperation::DeleteItem,
            Self::UpdateItem(_) => StoreOperation::UpdateItem,
            Self::BatchGetItem(_) => StoreOperation::BatchGetItem,
            Self::BatchWriteItem(_) => StoreOperation::BatchWriteItem,
            Self::Query(_) => StoreOperation::Query,
            Self::TransactWriteItems(_) => StoreOperation::TransactWriteItems,
        }
    }

    /// JSON rendering of the request body, for diagnostics.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("<unserializable request: {e}>"))
    }
}

impl StoreResponse {
    /// The call kind of this response.
    #[must_use]
    pub fn operation(&self) -> StoreOperation {
        match self {
            Self::GetItem(_) => StoreOperation::GetItem,
            Self::PutItem(_) => StoreOperation::PutItem,
            Self::DeleteItem(_) => StoreOperation::DeleteItem,
            Self::UpdateItem(_) => StoreOperation::UpdateItem,
            Self::BatchGetItem(_) => StoreOperation::BatchGetItem,
            Self::BatchWriteItem(_) => StoreOperation::BatchWriteItem,
            Self::Query(_) => StoreOperation::Query,
            Self::TransactWriteItems(_) => StoreOperation::TransactWriteItems,
        }
    }
}

macro_rules! response_accessor {
    ($fn_name:ident, $variant:ident, $output:ty) => {
        impl StoreResponse {
            #[doc = concat!("Unwrap a `", stringify!($variant), "` response.")]
            pub fn $fn_name(self) -> Result<$output, StoreError> {
                match self {
                    Self::$variant(out) => Ok(out),
                    other => Err(StoreError::internal_error(format!(
                        "expected {} response, got {}",
                        StoreOperation::$variant,
                        other.operation()
                    ))),
                }
            }
        }
    };
}

response_accessor!(into_get_item, GetItem, GetItemOutput);
response_accessor!(into_put_item, PutItem, PutItemOutput);
response_accessor!(into_delete_item, DeleteItem, DeleteItemOutput);
response_accessor!(into_update_item, UpdateItem, UpdateItemOutput);
response_accessor!(into_batch_get_item, BatchGetItem, BatchGetItemOutput);
response_accessor!(into_batch_write_item, BatchWriteItem, BatchWriteItemOutput);
response_accessor!(into_query, Query, QueryOutput);
response_accessor!(
    into_transact_write_items,
    TransactWriteItems,
    TransactWriteItemsOutput
);

macro_rules! request_from {
    ($($variant:ident => $input:ty),* $(,)?) => {
        $(
            impl From<$input> for StoreRequest {
                fn from(input: $input) -> Self {
                    Self::$variant(input)
                }
            }
        )*
    };
}

request_from! {
    GetItem => GetItemInput,
    PutItem => PutItemInput,
    DeleteItem => DeleteItemInput,
    UpdateItem => UpdateItemInput,
    BatchGetItem => BatchGetItemInput,
    BatchWriteItem => BatchWriteItemInput,
    Query => QueryInput,
    TransactWriteItems => TransactWriteItemsInput,
}
