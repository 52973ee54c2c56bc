//! Builders for single-item store calls.
//!
//! A built command can be sent on its own through the `send_*` operations of
//! [`crate::NoDb`], or collected into [`crate::NoDb::transact_write`].

use nodb_model::input::{DeleteItemInput, GetItemInput, PutItemInput, UpdateItemInput};
use nodb_model::types::{Item, PrimaryKey, ReturnValue};

use crate::error::NoDbResult;
use crate::expression::UpdateClause;

/// Put `item` into `table_name`, replacing any item with the same key.
#[must_use]
pub fn add_record_command(table_name: impl Into<String>, item: Item) -> PutItemInput {
    PutItemInput {
        table_name: table_name.into(),
        item,
        ..PutItemInput::default()
    }
}

#[must_use]
pub fn get_record_command(table_name: impl Into<String>, key: &PrimaryKey) -> GetItemInput {
    GetItemInput {
        table_name: table_name.into(),
        key: key.to_key(),
        ..GetItemInput::default()
    }
}

#[must_use]
pub fn delete_record_command(table_name: impl Into<String>, key: &PrimaryKey) -> DeleteItemInput {
    DeleteItemInput {
        table_name: table_name.into(),
        key: key.to_key(),
        ..DeleteItemInput::default()
    }
}

/// Update the item at `key`. Fails without touching the store when `update`
/// is empty or names a field twice.
pub fn update_record_command(
    table_name: impl Into<String>,
    key: &PrimaryKey,
    update: &UpdateClause,
    return_values: ReturnValue,
) -> NoDbResult<UpdateItemInput> {
    let compiled = update.compile()?;
    Ok(UpdateItemInput {
        table_name: table_name.into(),
        key: key.to_key(),
        update_expression: compiled.expression,
        condition_expression: None,
        expression_attribute_values: compiled.values,
        return_values: Some(return_values),
    })
}
