//! Request bodies for the eight store calls.
//!
//! All input structs use `PascalCase` JSON field naming to match the store's
//! wire protocol. Optional fields are omitted when `None` and empty maps are
//! omitted to keep payloads minimal.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{
    ExpressionAttributeValues, Item, Key, KeysAndAttributes, ReturnConsumedCapacity, ReturnValue,
    Select, TransactDelete, TransactPut, TransactUpdate, TransactWriteItem, WriteRequest,
};

// ---------------------------------------------------------------------------
// Single item
// ---------------------------------------------------------------------------

/// Input for the `PutItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemInput {
    /// The table to put the item into.
    pub table_name: String,

    /// The full item, key attributes included.
    pub item: Item,

    /// A condition that must hold for the put to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Values referenced by `condition_expression`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,

    /// Which image of the replaced item to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,
}

/// Input for the `GetItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemInput {
    /// The table containing the item.
    pub table_name: String,

    /// The primary key of the item to retrieve.
    pub key: Key,

    /// If `true`, a strongly consistent read is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// The attributes to retrieve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
}

/// Input for the `DeleteItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemInput {
    /// The table from which to delete the item.
    pub table_name: String,

    /// The primary key of the item to delete.
    pub key: Key,

    /// A condition that must hold for the delete to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Values referenced by `condition_expression`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,

    /// Which image of the deleted item to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,
}

/// Input for the `UpdateItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateItemInput {
    /// The table containing the item to update.
    pub table_name: String,

    /// The primary key of the item to update.
    pub key: Key,

    /// The `SET ... REMOVE ...` expression.
    pub update_expression: String,

    /// A condition that must hold for the update to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Values referenced by the update and condition expressions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,

    /// Which image of the item to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Input for the `Query` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryInput {
    /// The table to query.
    pub table_name: String,

    /// A secondary index to query instead of the base table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// The partition key match, optionally followed by a sort key condition.
    pub key_condition_expression: String,

    /// The attributes to retrieve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Values referenced by `key_condition_expression`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,

    /// `true` for ascending sort key order, `false` for descending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,

    /// The maximum number of items to evaluate in this page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// The cursor to resume from, as returned by a previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<Key>,

    /// The attributes to be returned in the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Select>,

    /// Whether consumed capacity is reported back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,
}

// ---------------------------------------------------------------------------
// Batch and transactional operations
// ---------------------------------------------------------------------------

/// Input for the `BatchGetItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchGetItemInput {
    /// Table name to the keys to read from it.
    pub request_items: HashMap<String, KeysAndAttributes>,

    /// Whether consumed capacity is reported back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,
}

/// Input for the `BatchWriteItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchWriteItemInput {
    /// Table name to the puts and deletes to apply to it.
    pub request_items: HashMap<String, Vec<WriteRequest>>,

    /// Whether consumed capacity is reported back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,
}

/// Input for the `TransactWriteItems` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactWriteItemsInput {
    /// The actions, applied all-or-nothing.
    pub transact_items: Vec<TransactWriteItem>,
}

impl From<PutItemInput> for TransactPut {
    fn from(input: PutItemInput) -> Self {
        Self {
            table_name: input.table_name,
            item: input.item,
            condition_expression: input.condition_expression,
            expression_attribute_values: input.expression_attribute_values,
        }
    }
}

impl From<UpdateItemInput> for TransactUpdate {
    fn from(input: UpdateItemInput) -> Self {
        Self {
            table_name: input.table_name,
            key: input.key,
            update_expression: input.update_expression,
            condition_expression: input.condition_expression,
            expression_attribute_values: input.expression_attribute_values,
        }
    }
}

impl From<DeleteItemInput> for TransactDelete {
    fn from(input: DeleteItemInput) -> Self {
        Self {
            table_name: input.table_name,
            key: input.key,
            condition_expression: input.condition_expression,
            expression_attribute_values: input.expression_attribute_values,
        }
    }
}
