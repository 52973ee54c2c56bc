//! Shared model types: enums, nested request structs and item shapes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;

// ---------------------------------------------------------------------------
// Item shapes
// ---------------------------------------------------------------------------

/// An item represented as a map of attribute names to values.
pub type Item = HashMap<String, AttributeValue>;

/// A key represented as a map of key attribute names to values.
pub type Key = HashMap<String, AttributeValue>;

/// Expression attribute values mapping (`:n` placeholders to attribute values).
pub type ExpressionAttributeValues = HashMap<String, AttributeValue>;

/// A primary key: the partition key and, for composite tables, the sort key.
///
/// Lookups and deletes take this instead of a free-form map so that only key
/// attributes can ever be sent as a key.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKey {
    /// Partition key attribute name and value.
    pub partition: (String, AttributeValue),
    /// Sort key attribute name and value, if the table has one.
    pub sort: Option<(String, AttributeValue)>,
}

impl PrimaryKey {
    /// Key for a table with only a partition key.
    #[must_use]
    pub fn partition(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            partition: (name.into(), value.into()),
            sort: None,
        }
    }

    /// Add the sort key component.
    #[must_use]
    pub fn with_sort(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.sort = Some((name.into(), value.into()));
        self
    }

    /// Number of attributes in the key (1 or 2).
    #[must_use]
    pub fn len(&self) -> usize {
        1 + usize::from(self.sort.is_some())
    }

    /// A primary key is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Render the key as the wire map.
    #[must_use]
    pub fn to_key(&self) -> Key {
        let mut key = Key::with_capacity(self.len());
        key.insert(self.partition.0.clone(), self.partition.1.clone());
        if let Some((name, value)) = &self.sort {
            key.insert(name.clone(), value.clone());
        }
        key
    }
}

impl From<PrimaryKey> for Key {
    fn from(pk: PrimaryKey) -> Self {
        let mut key = Key::with_capacity(pk.len());
        key.insert(pk.partition.0, pk.partition.1);
        if let Some((name, value)) = pk.sort {
            key.insert(name, value);
        }
        key
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which item image an update, put or delete returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReturnValue {
    /// Nothing is returned.
    #[default]
    #[serde(rename = "NONE")]
    None,
    /// All attributes as they were before the operation.
    #[serde(rename = "ALL_OLD")]
    AllOld,
    /// Only the updated attributes as they were before the operation.
    #[serde(rename = "UPDATED_OLD")]
    UpdatedOld,
    /// All attributes as they are after the operation.
    #[serde(rename = "ALL_NEW")]
    AllNew,
    /// Only the updated attributes as they are after the operation.
    #[serde(rename = "UPDATED_NEW")]
    UpdatedNew,
}

impl ReturnValue {
    /// Returns the wire-format string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::AllOld => "ALL_OLD",
            Self::UpdatedOld => "UPDATED_OLD",
            Self::AllNew => "ALL_NEW",
            Self::UpdatedNew => "UPDATED_NEW",
        }
    }
}

impl std::fmt::Display for ReturnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controls whether consumed capacity information is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReturnConsumedCapacity {
    /// Table and index breakdown.
    #[serde(rename = "INDEXES")]
    Indexes,
    /// Only the total.
    #[serde(rename = "TOTAL")]
    Total,
    /// Nothing (default).
    #[default]
    #[serde(rename = "NONE")]
    None,
}

/// The attributes a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Select {
    /// All attributes of the item.
    #[default]
    #[serde(rename = "ALL_ATTRIBUTES")]
    AllAttributes,
    /// All attributes projected into the queried index.
    #[serde(rename = "ALL_PROJECTED_ATTRIBUTES")]
    AllProjectedAttributes,
    /// Only the attributes named in the projection expression.
    #[serde(rename = "SPECIFIC_ATTRIBUTES")]
    SpecificAttributes,
    /// Only the number of matching items.
    #[serde(rename = "COUNT")]
    Count,
}

impl Select {
    /// Returns the wire-format string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllAttributes => "ALL_ATTRIBUTES",
            Self::AllProjectedAttributes => "ALL_PROJECTED_ATTRIBUTES",
            Self::SpecificAttributes => "SPECIFIC_ATTRIBUTES",
            Self::Count => "COUNT",
        }
    }
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

/// Capacity consumed by one call against one table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConsumedCapacity {
    /// The table that was affected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    /// Total capacity units consumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_units: Option<f64>,
    /// Read capacity units consumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_capacity_units: Option<f64>,
    /// Write capacity units consumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_capacity_units: Option<f64>,
}

// ---------------------------------------------------------------------------
// Batch request entries
// ---------------------------------------------------------------------------

/// Keys to read from one table within a `BatchGetItem` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeysAndAttributes {
    /// The primary keys of the items to retrieve.
    pub keys: Vec<Key>,
    /// The attributes to retrieve. All attributes when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    /// Whether to use a strongly consistent read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
}

/// A single write within a `BatchWriteItem` call.
///
/// Exactly one of `put_request` or `delete_request` is set; build it through
/// [`WriteRequest::put`] or [`WriteRequest::delete`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WriteRequest {
    /// A request to put an item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put_request: Option<PutRequest>,
    /// A request to delete an item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_request: Option<DeleteRequest>,
}

impl WriteRequest {
    /// A put of `item`.
    #[must_use]
    pub fn put(item: Item) -> Self {
        Self {
            put_request: Some(PutRequest { item }),
            delete_request: None,
        }
    }

    /// A delete of the item at `key`.
    #[must_use]
    pub fn delete(key: Key) -> Self {
        Self {
            put_request: None,
            delete_request: Some(DeleteRequest { key }),
        }
    }
}

/// Put half of a [`WriteRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRequest {
    /// The item attributes to put.
    pub item: Item,
}

/// Delete half of a [`WriteRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteRequest {
    /// The primary key of the item to delete.
    pub key: Key,
}

// ---------------------------------------------------------------------------
// Transactional write entries
// ---------------------------------------------------------------------------

/// One action inside a `TransactWriteItems` call.
///
/// Exactly one field is set. Use the constructors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactWriteItem {
    /// Assert a condition on an item without writing it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_check: Option<ConditionCheck>,
    /// Put an item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<TransactPut>,
    /// Update an item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<TransactUpdate>,
    /// Delete an item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<TransactDelete>,
}

impl TransactWriteItem {
    #[must_use]
    pub fn condition_check(check: ConditionCheck) -> Self {
        Self {
            condition_check: Some(check),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn put(put: TransactPut) -> Self {
        Self {
            put: Some(put),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn update(update: TransactUpdate) -> Self {
        Self {
            update: Some(update),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn delete(delete: TransactDelete) -> Self {
        Self {
            delete: Some(delete),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConditionCheck {
    pub table_name: String,
    pub key: Key,
    pub condition_expression: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactPut {
    pub table_name: String,
    pub item: Item,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactUpdate {
    pub table_name: String,
    pub key: Key,
    pub update_expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactDelete {
    pub table_name: String,
    pub key: Key,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,
}
