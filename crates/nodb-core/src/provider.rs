//! The record operation facade.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use nodb_model::StoreResponse;
use nodb_model::input::{
    DeleteItemInput, PutItemInput, TransactWriteItemsInput, UpdateItemInput,
};
use nodb_model::types::{ConditionCheck, Item, PrimaryKey, ReturnValue, Select, TransactWriteItem};

use crate::batch::{self, ChainLimits, ChainReport, ItemIntent};
use crate::chunk::Collection;
use crate::client::{StoreClient, call};
use crate::command::{
    add_record_command, delete_record_command, get_record_command, update_record_command,
};
use crate::config::NoDbConfig;
use crate::error::{NoDbError, NoDbResult};
use crate::expression::UpdateClause;
use crate::query::{QueryOutcome, QueryRequest, run_query};

/// Record operations over a shared store client.
///
/// Cloning is cheap; clones share the client.
#[derive(Clone)]
pub struct NoDb {
    client: Arc<dyn StoreClient>,
    config: NoDbConfig,
}

impl fmt::Debug for NoDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoDb")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NoDb {
    /// Create a facade over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn StoreClient>, config: NoDbConfig) -> Self {
        Self { client, config }
    }

    /// Create a facade configured from the environment.
    #[must_use]
    pub fn from_env(client: Arc<dyn StoreClient>) -> Self {
        Self::new(client, NoDbConfig::from_env())
    }

    #[must_use]
    pub fn config(&self) -> &NoDbConfig {
        &self.config
    }

    fn client(&self) -> &dyn StoreClient {
        self.client.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Single item
// ---------------------------------------------------------------------------

impl NoDb {
    /// Put `item` into `table_name`.
    pub async fn add_record(&self, table_name: &str, item: Item) -> NoDbResult<()> {
        self.send_add_record(add_record_command(table_name, item))
            .await
    }

    /// Send a put built with [`add_record_command`].
    pub async fn send_add_record(&self, command: PutItemInput) -> NoDbResult<()> {
        call(self.client(), command.into(), StoreResponse::into_put_item).await?;
        Ok(())
    }

    /// Read one item. `None` when nothing has that key.
    pub async fn get_record(&self, table_name: &str, key: &PrimaryKey) -> NoDbResult<Option<Item>> {
        let output = call(
            self.client(),
            get_record_command(table_name, key).into(),
            StoreResponse::into_get_item,
        )
        .await?;
        Ok(output.item)
    }

    pub async fn delete_record(&self, table_name: &str, key: &PrimaryKey) -> NoDbResult<()> {
        self.send_delete_record(delete_record_command(table_name, key))
            .await
    }

    /// Send a delete built with [`delete_record_command`].
    pub async fn send_delete_record(&self, command: DeleteItemInput) -> NoDbResult<()> {
        call(self.client(), command.into(), StoreResponse::into_delete_item).await?;
        Ok(())
    }

    /// Apply `update` to the item at `key` and return the image selected by
    /// `return_values`. The image is empty for [`ReturnValue::None`].
    ///
    /// An empty update fails with [`NoDbError::Usage`] before any store call.
    pub async fn update_record(
        &self,
        table_name: &str,
        key: &PrimaryKey,
        update: &UpdateClause,
        return_values: ReturnValue,
    ) -> NoDbResult<Item> {
        let command = update_record_command(table_name, key, update, return_values)?;
        self.send_update_record(command).await
    }

    /// Send an update built with [`update_record_command`].
    pub async fn send_update_record(&self, command: UpdateItemInput) -> NoDbResult<Item> {
        let output = call(self.client(), command.into(), StoreResponse::into_update_item).await?;
        Ok(output.attributes.unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

impl NoDb {
    /// Put any number of items into any number of tables, in chunks of
    /// `write_batch_limit`.
    ///
    /// Chunks are sent one after another. A failure stops the chain; chunks
    /// sent before it stay applied.
    pub async fn add_batch_records(&self, records: Vec<Collection<Item>>) -> NoDbResult<()> {
        let intents = records
            .into_iter()
            .map(|(table, items)| (table, items.into_iter().map(ItemIntent::Put).collect()))
            .collect();
        self.batch_write(intents).await.map(|_| ())
    }

    /// Delete any number of items by key, in chunks of `write_batch_limit`.
    pub async fn delete_batch_records(&self, keys: Vec<Collection<PrimaryKey>>) -> NoDbResult<()> {
        let intents = keys
            .into_iter()
            .map(|(table, keys)| (table, keys.into_iter().map(ItemIntent::DeleteKey).collect()))
            .collect();
        self.batch_write(intents).await.map(|_| ())
    }

    /// Apply puts and deletes mixed freely across tables.
    pub async fn batch_write(&self, intents: Vec<Collection<ItemIntent>>) -> NoDbResult<ChainReport> {
        batch::write_all(self.client(), ChainLimits::for_writes(&self.config), intents).await
    }

    /// Read any number of items by key, in chunks of `read_batch_limit`.
    ///
    /// Returns the items found per table. Tables without hits are absent.
    pub async fn get_batch_records(
        &self,
        keys: Vec<Collection<PrimaryKey>>,
    ) -> NoDbResult<HashMap<String, Vec<Item>>> {
        batch::get_all(self.client(), ChainLimits::for_reads(&self.config), keys).await
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl NoDb {
    pub async fn query_records(&self, request: &QueryRequest) -> NoDbResult<QueryOutcome> {
        run_query(self.client(), request, self.config.consumed_capacity()).await
    }

    /// Count the items matching `request` across all pages.
    ///
    /// Projection, paging and selector on `request` are ignored.
    pub async fn count(&self, request: QueryRequest) -> NoDbResult<u64> {
        let request = QueryRequest {
            projection: Vec::new(),
            paging: None,
            ..request
        }
        .with_select(Select::Count);
        let outcome = self.query_records(&request).await?;
        Ok(outcome.count())
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

impl NoDb {
    /// Apply condition checks, puts, updates and deletes all-or-nothing in a
    /// single call, in that order.
    ///
    /// The group is never chunked. Groups larger than `transact_item_limit`
    /// are sent anyway and left for the store to reject.
    pub async fn transact_write(
        &self,
        checks: Vec<ConditionCheck>,
        puts: Vec<PutItemInput>,
        updates: Vec<UpdateItemInput>,
        deletes: Vec<DeleteItemInput>,
    ) -> NoDbResult<()> {
        let transact_items: Vec<TransactWriteItem> = checks
            .into_iter()
            .map(TransactWriteItem::condition_check)
            .chain(puts.into_iter().map(|p| TransactWriteItem::put(p.into())))
            .chain(updates.into_iter().map(|u| TransactWriteItem::update(u.into())))
            .chain(deletes.into_iter().map(|d| TransactWriteItem::delete(d.into())))
            .collect();

        if transact_items.is_empty() {
            return Err(NoDbError::usage("transaction has no actions"));
        }
        if transact_items.len() > self.config.transact_item_limit {
            tracing::warn!(
                actions = transact_items.len(),
                limit = self.config.transact_item_limit,
                "transaction exceeds the configured action limit"
            );
        }

        call(
            self.client(),
            TransactWriteItemsInput { transact_items }.into(),
            StoreResponse::into_transact_write_items,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nodb_model::attribute_value::AttributeValue;
    use nodb_model::error::StoreError;
    use nodb_model::output::{
        BatchGetItemOutput, BatchWriteItemOutput, DeleteItemOutput, GetItemOutput, PutItemOutput,
        QueryOutput, TransactWriteItemsOutput, UpdateItemOutput,
    };
    use nodb_model::{StoreOperation, StoreRequest};

    use super::*;
    use crate::expression::SortKeyCondition;
    use crate::query::Paging;
    use crate::test_support::{ScriptedClient, item};

    fn setup() -> (Arc<ScriptedClient>, NoDb) {
        let client = Arc::new(ScriptedClient::new());
        let db = NoDb::new(client.clone(), NoDbConfig::default());
        (client, db)
    }

    fn key(id: usize) -> PrimaryKey {
        PrimaryKey::partition("id", id)
    }

    #[tokio::test]
    async fn test_should_put_single_record() {
        let (client, db) = setup();
        client.push_ok(StoreResponse::PutItem(PutItemOutput::default()));

        db.add_record("users", item(1)).await.unwrap();

        match &client.requests()[0] {
            StoreRequest::PutItem(input) => {
                assert_eq!(input.table_name, "users");
                assert_eq!(input.item, item(1));
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_return_none_for_missing_record() {
        let (client, db) = setup();
        client.push_ok(StoreResponse::GetItem(GetItemOutput::default()));

        assert_eq!(db.get_record("users", &key(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_should_return_found_record() {
        let (client, db) = setup();
        client.push_ok(StoreResponse::GetItem(GetItemOutput {
            item: Some(item(1)),
        }));

        assert_eq!(db.get_record("users", &key(1)).await.unwrap(), Some(item(1)));
    }

    #[tokio::test]
    async fn test_should_surface_delete_failure() {
        let (client, db) = setup();
        client.push_err(StoreError::resource_not_found("no table"));

        let err = db.delete_record("users", &key(1)).await.unwrap_err();

        assert!(matches!(
            err,
            NoDbError::Store {
                operation: StoreOperation::DeleteItem,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_should_send_prebuilt_delete() {
        let (client, db) = setup();
        client.push_ok(StoreResponse::DeleteItem(DeleteItemOutput::default()));

        db.send_delete_record(delete_record_command("users", &key(4)))
            .await
            .unwrap();

        assert_eq!(client.operations(), vec![StoreOperation::DeleteItem]);
    }

    #[tokio::test]
    async fn test_should_return_updated_image() {
        let (client, db) = setup();
        let mut image = Item::new();
        image.insert("price".to_owned(), AttributeValue::from(30));
        client.push_ok(StoreResponse::UpdateItem(UpdateItemOutput {
            attributes: Some(image.clone()),
        }));

        let update = UpdateClause::new().set("price", 30).remove("types");
        let got = db
            .update_record("products", &key(1), &update, ReturnValue::UpdatedNew)
            .await
            .unwrap();

        assert_eq!(got, image);
        match &client.requests()[0] {
            StoreRequest::UpdateItem(input) => {
                assert_eq!(input.update_expression, "SET price = :1 REMOVE types");
                assert_eq!(input.return_values, Some(ReturnValue::UpdatedNew));
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_reject_empty_update_without_store_call() {
        let (client, db) = setup();

        let err = db
            .update_record("products", &key(1), &UpdateClause::new(), ReturnValue::AllNew)
            .await
            .unwrap_err();

        assert!(matches!(err, NoDbError::Usage(_)));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_should_chunk_batch_add_with_write_limit() {
        let (client, db) = setup();
        for _ in 0..3 {
            client.push_ok(StoreResponse::BatchWriteItem(BatchWriteItemOutput::default()));
        }

        db.add_batch_records(vec![("users".to_owned(), (0..60).map(item).collect())])
            .await
            .unwrap();

        let sizes: Vec<usize> = client
            .batch_writes()
            .iter()
            .map(|w| w.request_items["users"].len())
            .collect();
        assert_eq!(sizes, vec![25, 25, 10]);
    }

    #[tokio::test]
    async fn test_should_batch_delete_by_key() {
        let (client, db) = setup();
        client.push_ok(StoreResponse::BatchWriteItem(BatchWriteItemOutput::default()));

        db.delete_batch_records(vec![("users".to_owned(), vec![key(1), key(2)])])
            .await
            .unwrap();

        let writes = client.batch_writes();
        let sent = &writes[0].request_items["users"];
        assert!(sent.iter().all(|w| w.delete_request.is_some()));
    }

    #[tokio::test]
    async fn test_should_chunk_batch_get_with_read_limit() {
        let (client, db) = setup();
        let mut first = BatchGetItemOutput::default();
        first.responses.insert("users".to_owned(), vec![item(0)]);
        client.push_ok(StoreResponse::BatchGetItem(first));
        client.push_ok(StoreResponse::BatchGetItem(BatchGetItemOutput::default()));

        let found = db
            .get_batch_records(vec![("users".to_owned(), (0..150).map(key).collect())])
            .await
            .unwrap();

        assert_eq!(found["users"], vec![item(0)]);
        let gets = client.batch_gets();
        assert_eq!(gets[0].request_items["users"].keys.len(), 100);
        assert_eq!(gets[1].request_items["users"].keys.len(), 50);
    }

    #[tokio::test]
    async fn test_should_query_with_consumed_capacity() {
        let (client, db) = setup();
        client.push_ok(StoreResponse::Query(QueryOutput {
            items: Some(vec![item(1)]),
            count: 1,
            ..QueryOutput::default()
        }));

        let request = QueryRequest::new("orders", "user_id", "u1")
            .with_condition(SortKeyCondition::begins_with("sort_id", "bulk_"))
            .ascending();
        let outcome = db.query_records(&request).await.unwrap();

        assert_eq!(outcome.items(), &[item(1)]);
        let query = &client.queries()[0];
        assert_eq!(query.scan_index_forward, Some(true));
        assert!(query.return_consumed_capacity.is_some());
    }

    #[tokio::test]
    async fn test_should_count_without_projection_or_paging() {
        let (client, db) = setup();
        client.push_ok(StoreResponse::Query(QueryOutput {
            count: 3,
            ..QueryOutput::default()
        }));

        let request = QueryRequest::new("orders", "user_id", "u1")
            .with_projection(["total"])
            .with_paging(Paging::limited_to(1));
        assert_eq!(db.count(request).await.unwrap(), 3);

        let query = &client.queries()[0];
        assert_eq!(query.select, Some(Select::Count));
        assert!(query.projection_expression.is_none());
        assert!(query.limit.is_none());
    }

    #[tokio::test]
    async fn test_should_count_zero_when_nothing_matches() {
        let (client, db) = setup();
        client.push_ok(StoreResponse::Query(QueryOutput::default()));

        let count = db
            .count(QueryRequest::new("orders", "user_id", "nobody"))
            .await
            .unwrap();

        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_should_order_transaction_actions() {
        let (client, db) = setup();
        client.push_ok(StoreResponse::TransactWriteItems(
            TransactWriteItemsOutput::default(),
        ));

        let check = ConditionCheck {
            table_name: "users".to_owned(),
            key: key(9).into(),
            condition_expression: "attribute_exists(id)".to_owned(),
            ..ConditionCheck::default()
        };
        let update = update_record_command(
            "users",
            &key(2),
            &UpdateClause::new().increment("visits", 1),
            ReturnValue::None,
        )
        .unwrap();
        db.transact_write(
            vec![check],
            vec![add_record_command("users", item(1))],
            vec![update],
            vec![delete_record_command("users", &key(3))],
        )
        .await
        .unwrap();

        match &client.requests()[0] {
            StoreRequest::TransactWriteItems(input) => {
                let items = &input.transact_items;
                assert_eq!(items.len(), 4);
                assert!(items[0].condition_check.is_some());
                assert!(items[1].put.is_some());
                assert!(items[2].update.is_some());
                assert!(items[3].delete.is_some());
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_send_oversized_transaction_in_one_call() {
        let (client, db) = setup();
        client.push_ok(StoreResponse::TransactWriteItems(
            TransactWriteItemsOutput::default(),
        ));

        let puts = (0..12).map(|i| add_record_command("users", item(i))).collect();
        db.transact_write(Vec::new(), puts, Vec::new(), Vec::new())
            .await
            .unwrap();

        assert_eq!(client.operations(), vec![StoreOperation::TransactWriteItems]);
    }

    #[tokio::test]
    async fn test_should_reject_empty_transaction() {
        let (client, db) = setup();

        let err = db
            .transact_write(Vec::new(), Vec::new(), Vec::new(), Vec::new())
            .await
            .unwrap_err();

        assert!(matches!(err, NoDbError::Usage(_)));
        assert!(client.requests().is_empty());
    }
}
