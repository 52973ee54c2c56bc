//! Store call kinds.

use std::fmt;

/// Every call kind the access layer issues against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    // Single item
    /// Get an item by primary key.
    GetItem,
    /// Put (insert or replace) an item.
    PutItem,
    /// Delete an item by primary key.
    DeleteItem,
    /// Update an item in place.
    UpdateItem,

    // Multi item
    /// Get items from one or more tables.
    BatchGetItem,
    /// Put and delete items in one or more tables.
    BatchWriteItem,
    /// Read a range of items sharing one partition key.
    Query,
    /// All-or-nothing group of check/put/update/delete actions.
    TransactWriteItems,
}

impl StoreOperation {
    /// Returns the store's operation name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetItem => "GetItem",
            Self::PutItem => "PutItem",
            Self::DeleteItem => "DeleteItem",
            Self::UpdateItem => "UpdateItem",
            Self::BatchGetItem => "BatchGetItem",
            Self::BatchWriteItem => "BatchWriteItem",
            Self::Query => "Query",
            Self::TransactWriteItems => "TransactWriteItems",
        }
    }

    /// Parse an operation name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GetItem" => Some(Self::GetItem),
            "PutItem" => Some(Self::PutItem),
            "DeleteItem" => Some(Self::DeleteItem),
            "UpdateItem" => Some(Self::UpdateItem),
            "BatchGetItem" => Some(Self::BatchGetItem),
            "BatchWriteItem" => Some(Self::BatchWriteItem),
            "Query" => Some(Self::Query),
            "TransactWriteItems" => Some(Self::TransactWriteItems),
            _ => None,
        }
    }

    /// Whether the call may touch more than one item.
    #[must_use]
    pub fn is_multi_item(&self) -> bool {
        matches!(
            self,
            Self::BatchGetItem | Self::BatchWriteItem | Self::Query | Self::TransactWriteItems
        )
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
