//! Range queries and page accumulation.

use tracing::Instrument;
use uuid::Uuid;

use nodb_model::attribute_value::AttributeValue;
use nodb_model::input::QueryInput;
use nodb_model::output::QueryOutput;
use nodb_model::types::{Item, Key, ReturnConsumedCapacity, Select};
use nodb_model::StoreResponse;

use crate::client::{StoreClient, call};
use crate::error::NoDbResult;
use crate::expression::{SortKeyCondition, compile_key_condition};

/// Caller-managed paging: resume from `start` and/or stop after `limit`
/// evaluated items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paging {
    /// Cursor returned by an earlier page.
    pub start: Option<Key>,
    /// Per-page limit passed to the store untouched.
    pub limit: Option<u32>,
}

impl Paging {
    #[must_use]
    pub fn starting_at(start: Key) -> Self {
        Self {
            start: Some(start),
            limit: None,
        }
    }

    #[must_use]
    pub fn limited_to(limit: u32) -> Self {
        Self {
            start: None,
            limit: Some(limit),
        }
    }

    /// Paging with neither a start nor a limit means no paging at all.
    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.start.is_some() || self.limit.is_some()
    }
}

/// A range query on one partition.
///
/// ```
/// use nodb_core::QueryRequest;
/// use nodb_core::expression::SortKeyCondition;
///
/// let request = QueryRequest::new("orders", "user_id", "u1")
///     .with_condition(SortKeyCondition::begins_with("sort_id", "bulk_"))
///     .with_projection(["sort_id", "total"])
///     .ascending();
/// assert!(request.ascending);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub table_name: String,
    /// Secondary index to query instead of the base table.
    pub index_name: Option<String>,
    pub partition_key: String,
    pub partition_value: AttributeValue,
    /// Fields to return. Empty returns whole items.
    pub projection: Vec<String>,
    pub condition: Option<SortKeyCondition>,
    /// Sort key order. Descending unless set.
    pub ascending: bool,
    pub paging: Option<Paging>,
    pub select: Option<Select>,
}

impl QueryRequest {
    #[must_use]
    pub fn new(
        table_name: impl Into<String>,
        partition_key: impl Into<String>,
        partition_value: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            index_name: None,
            partition_key: partition_key.into(),
            partition_value: partition_value.into(),
            projection: Vec::new(),
            condition: None,
            ascending: false,
            paging: None,
            select: None,
        }
    }

    #[must_use]
    pub fn with_index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    #[must_use]
    pub fn with_projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: SortKeyCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn ascending(mut self) -> Self {
        self.ascending = true;
        self
    }

    #[must_use]
    pub fn with_paging(mut self, paging: Paging) -> Self {
        self.paging = Some(paging);
        self
    }

    #[must_use]
    pub fn with_select(mut self, select: Select) -> Self {
        self.select = Some(select);
        self
    }

    /// The caller's paging, if it actually pages.
    fn manual_paging(&self) -> Option<&Paging> {
        self.paging.as_ref().filter(|p| p.is_manual())
    }

    fn to_input(&self, consumed: Option<ReturnConsumedCapacity>) -> NoDbResult<QueryInput> {
        let key_condition = compile_key_condition(
            &self.partition_key,
            &self.partition_value,
            self.condition.as_ref(),
        )?;
        let paging = self.manual_paging();

        Ok(QueryInput {
            table_name: self.table_name.clone(),
            index_name: self.index_name.clone(),
            key_condition_expression: key_condition.expression,
            projection_expression: (!self.projection.is_empty())
                .then(|| self.projection.join(", ")),
            expression_attribute_values: key_condition.values,
            scan_index_forward: Some(self.ascending),
            limit: paging.and_then(|p| p.limit),
            exclusive_start_key: paging.and_then(|p| p.start.clone()),
            select: self.select,
            return_consumed_capacity: consumed,
        })
    }
}

/// Pages merged so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    /// Items in page-arrival order. `None` when the store sent no item lists,
    /// as for count-only queries.
    pub items: Option<Vec<Item>>,
    /// Sum of the pages' counts.
    pub count: u64,
    /// Cursor of the latest page. `None` once the partition is exhausted.
    pub cursor: Option<Key>,
}

impl QueryPage {
    fn absorb(&mut self, page: QueryOutput) {
        if let Some(items) = page.items {
            self.items.get_or_insert_with(Vec::new).extend(items);
        }
        self.count += page.count;
        self.cursor = page.last_evaluated_key;
    }
}

/// Result of a range query. Matching nothing is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    NotFound,
    Found(QueryPage),
}

impl QueryOutcome {
    #[must_use]
    pub fn count(&self) -> u64 {
        match self {
            Self::NotFound => 0,
            Self::Found(page) => page.count,
        }
    }

    /// The merged items. Empty when nothing was found or only counted.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        match self {
            Self::Found(QueryPage {
                items: Some(items), ..
            }) => items,
            _ => &[],
        }
    }

    #[must_use]
    pub fn cursor(&self) -> Option<&Key> {
        match self {
            Self::NotFound => None,
            Self::Found(page) => page.cursor.as_ref(),
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Run `request` and merge its pages.
///
/// With manual paging exactly one page is fetched and its cursor returned
/// as is. Otherwise pages are fetched until the store stops returning a
/// cursor. A merged count of zero is reported as [`QueryOutcome::NotFound`].
pub async fn run_query(
    client: &dyn StoreClient,
    request: &QueryRequest,
    consumed: Option<ReturnConsumedCapacity>,
) -> NoDbResult<QueryOutcome> {
    let mut input = request.to_input(consumed)?;
    let auto_continue = request.manual_paging().is_none();
    let chain_id = Uuid::new_v4();
    let span = tracing::info_span!("query_chain", table = %request.table_name, %chain_id);

    async move {
        let mut merged = QueryPage::default();
        let mut pages = 0_usize;

        loop {
            let page = call(client, input.clone().into(), StoreResponse::into_query).await?;
            pages += 1;
            merged.absorb(page);

            match &merged.cursor {
                Some(cursor) if auto_continue => {
                    input.exclusive_start_key = Some(cursor.clone());
                }
                _ => break,
            }
        }

        tracing::debug!(pages, count = merged.count, "query finished");
        if merged.count == 0 {
            Ok(QueryOutcome::NotFound)
        } else {
            Ok(QueryOutcome::Found(merged))
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use nodb_model::error::StoreError;

    use super::*;
    use crate::NoDbError;
    use crate::test_support::{ScriptedClient, item};

    fn cursor(id: usize) -> Key {
        let mut key = Key::new();
        key.insert("id".to_owned(), AttributeValue::from(id));
        key
    }

    fn page(ids: std::ops::Range<usize>, next: Option<usize>) -> StoreResponse {
        let items: Vec<Item> = ids.map(item).collect();
        StoreResponse::Query(QueryOutput {
            count: items.len() as u64,
            scanned_count: items.len() as u64,
            items: Some(items),
            last_evaluated_key: next.map(cursor),
            consumed_capacity: None,
        })
    }

    fn request() -> QueryRequest {
        QueryRequest::new("orders", "user_id", "u1")
    }

    #[tokio::test]
    async fn test_should_follow_cursors_until_exhausted() {
        let client = ScriptedClient::new();
        client.push_ok(page(0..40, Some(39)));
        client.push_ok(page(40..80, Some(79)));
        client.push_ok(page(80..92, None));

        let outcome = run_query(&client, &request(), None).await.unwrap();

        assert_eq!(outcome.count(), 92);
        assert!(outcome.cursor().is_none());
        assert_eq!(outcome.items(), (0..92).map(item).collect::<Vec<_>>().as_slice());

        let queries = client.queries();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0].exclusive_start_key, None);
        assert_eq!(queries[1].exclusive_start_key, Some(cursor(39)));
        assert_eq!(queries[2].exclusive_start_key, Some(cursor(79)));
    }

    #[tokio::test]
    async fn test_should_fetch_one_page_with_explicit_cursor() {
        let client = ScriptedClient::new();
        client.push_ok(page(10..20, Some(19)));

        let outcome = run_query(
            &client,
            &request().with_paging(Paging::starting_at(cursor(9))),
            None,
        )
        .await
        .unwrap();

        assert_eq!(client.queries().len(), 1);
        assert_eq!(client.queries()[0].exclusive_start_key, Some(cursor(9)));
        assert_eq!(outcome.count(), 10);
        assert_eq!(outcome.cursor(), Some(&cursor(19)));
    }

    #[tokio::test]
    async fn test_should_pass_limit_through_and_stop() {
        let client = ScriptedClient::new();
        client.push_ok(page(0..5, Some(4)));

        run_query(&client, &request().with_paging(Paging::limited_to(5)), None)
            .await
            .unwrap();

        let queries = client.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].limit, Some(5));
    }

    #[tokio::test]
    async fn test_should_treat_empty_paging_as_none() {
        let client = ScriptedClient::new();
        client.push_ok(page(0..1, Some(0)));
        client.push_ok(page(1..2, None));

        let outcome = run_query(&client, &request().with_paging(Paging::default()), None)
            .await
            .unwrap();

        assert_eq!(client.queries().len(), 2);
        assert_eq!(outcome.count(), 2);
    }

    #[tokio::test]
    async fn test_should_report_not_found_for_zero_count() {
        let client = ScriptedClient::new();
        client.push_ok(page(0..0, None));

        let outcome = run_query(&client, &request(), None).await.unwrap();

        assert_eq!(outcome, QueryOutcome::NotFound);
        assert_eq!(outcome.count(), 0);
        assert!(outcome.items().is_empty());
    }

    #[tokio::test]
    async fn test_should_keep_paging_past_an_empty_page() {
        let client = ScriptedClient::new();
        client.push_ok(page(0..0, Some(0)));
        client.push_ok(page(1..3, None));

        let outcome = run_query(&client, &request(), None).await.unwrap();

        assert_eq!(outcome.count(), 2);
        assert_eq!(client.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_should_shape_query_input() {
        let client = ScriptedClient::new();
        client.push_ok(page(0..1, None));

        let request = request()
            .with_index("by_date")
            .with_projection(["sort_id", "total"])
            .with_condition(SortKeyCondition::between("sort_id", "bulk_101", "bulk_102"))
            .with_select(Select::SpecificAttributes);
        run_query(&client, &request, Some(ReturnConsumedCapacity::Total))
            .await
            .unwrap();

        let input = &client.queries()[0];
        assert_eq!(input.index_name.as_deref(), Some("by_date"));
        assert_eq!(
            input.key_condition_expression,
            "user_id = :1 and sort_id BETWEEN :2 AND :3"
        );
        assert_eq!(input.projection_expression.as_deref(), Some("sort_id, total"));
        assert_eq!(input.scan_index_forward, Some(false));
        assert_eq!(input.select, Some(Select::SpecificAttributes));
        assert_eq!(input.return_consumed_capacity, Some(ReturnConsumedCapacity::Total));
    }

    #[tokio::test]
    async fn test_should_merge_count_only_pages() {
        let client = ScriptedClient::new();
        for (count, next) in [(7, Some(1)), (5, None)] {
            client.push_ok(StoreResponse::Query(QueryOutput {
                count,
                last_evaluated_key: next.map(cursor),
                ..QueryOutput::default()
            }));
        }

        let outcome = run_query(&client, &request().with_select(Select::Count), None)
            .await
            .unwrap();

        assert_eq!(outcome.count(), 12);
        assert_eq!(outcome, QueryOutcome::Found(QueryPage { items: None, count: 12, cursor: None }));
    }

    #[tokio::test]
    async fn test_should_fail_without_partial_result() {
        let client = ScriptedClient::new();
        client.push_ok(page(0..40, Some(39)));
        client.push_err(StoreError::throttled("slow down"));

        let err = run_query(&client, &request(), None).await.unwrap_err();

        assert!(matches!(err, NoDbError::Store { .. }));
        assert_eq!(client.queries().len(), 2);
    }
}
