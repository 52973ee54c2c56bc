//! Update expressions: `SET` assignments, increments and decrements, and
//! `REMOVE` of whole fields.

use std::collections::HashSet;

use nodb_model::attribute_value::AttributeValue;
use nodb_model::types::ExpressionAttributeValues;

use super::{CompiledExpression, ParamCounter, bind};
use crate::error::{NoDbError, NoDbResult};

/// A structured description of an item update.
///
/// Placeholders are numbered in the order the operations were declared:
/// all assignments first, then increments, then decrements.
///
/// ```
/// use nodb_core::expression::UpdateClause;
///
/// let compiled = UpdateClause::new()
///     .set("price", 30)
///     .remove("types")
///     .compile()
///     .unwrap();
/// assert_eq!(compiled.expression, "SET price = :1 REMOVE types");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateClause {
    assignments: Vec<(String, AttributeValue)>,
    increments: Vec<(String, AttributeValue)>,
    decrements: Vec<(String, AttributeValue)>,
    removals: Vec<String>,
}

impl UpdateClause {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `field = value`.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.assignments.push((field.into(), value.into()));
        self
    }

    /// `field = field + delta`.
    #[must_use]
    pub fn increment(mut self, field: impl Into<String>, delta: impl Into<AttributeValue>) -> Self {
        self.increments.push((field.into(), delta.into()));
        self
    }

    /// `field = field - delta`.
    #[must_use]
    pub fn decrement(mut self, field: impl Into<String>, delta: impl Into<AttributeValue>) -> Self {
        self.decrements.push((field.into(), delta.into()));
        self
    }

    /// Drop `field` from the item. Removing the same field twice is a no-op.
    #[must_use]
    pub fn remove(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.removals.contains(&field) {
            self.removals.push(field);
        }
        self
    }

    /// Whether the clause would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
            && self.increments.is_empty()
            && self.decrements.is_empty()
            && self.removals.is_empty()
    }

    /// Compile into `SET ... REMOVE ...` with placeholders starting at `:1`.
    ///
    /// Fails with [`NoDbError::Usage`] when the clause is empty or names the
    /// same field in more than one operation.
    pub fn compile(&self) -> NoDbResult<CompiledExpression> {
        self.compile_from(ParamCounter::start())
            .map(|(compiled, _)| compiled)
    }

    /// Compile starting at `counter`, returning the advanced counter.
    pub fn compile_from(
        &self,
        counter: ParamCounter,
    ) -> NoDbResult<(CompiledExpression, ParamCounter)> {
        if self.is_empty() {
            return Err(NoDbError::usage(
                "update needs at least one assignment, increment, decrement or removal",
            ));
        }
        self.check_overlap()?;

        let mut values = ExpressionAttributeValues::new();
        let (mut set_items, counter) =
            render_set(counter, &self.assignments, &mut values, |field, p| {
                format!("{field} = {p}")
            });
        let (increments, counter) =
            render_set(counter, &self.increments, &mut values, |field, p| {
                format!("{field} = {field} + {p}")
            });
        set_items.extend(increments);
        let (decrements, counter) =
            render_set(counter, &self.decrements, &mut values, |field, p| {
                format!("{field} = {field} - {p}")
            });
        set_items.extend(decrements);

        let mut clauses = Vec::with_capacity(2);
        if !set_items.is_empty() {
            clauses.push(format!("SET {}", set_items.join(", ")));
        }
        if !self.removals.is_empty() {
            clauses.push(format!("REMOVE {}", self.removals.join(", ")));
        }

        Ok((
            CompiledExpression {
                expression: clauses.join(" "),
                values,
            },
            counter,
        ))
    }

    /// The store rejects updates whose paths overlap.
    fn check_overlap(&self) -> NoDbResult<()> {
        let mut seen = HashSet::new();
        let fields = self
            .assignments
            .iter()
            .chain(&self.increments)
            .chain(&self.decrements)
            .map(|(field, _)| field)
            .chain(&self.removals);
        for field in fields {
            if !seen.insert(field.as_str()) {
                return Err(NoDbError::usage(format!(
                    "field `{field}` appears in more than one update operation"
                )));
            }
        }
        Ok(())
    }
}

fn render_set(
    counter: ParamCounter,
    entries: &[(String, AttributeValue)],
    values: &mut ExpressionAttributeValues,
    render: impl Fn(&str, &str) -> String,
) -> (Vec<String>, ParamCounter) {
    entries
        .iter()
        .fold((Vec::with_capacity(entries.len()), counter), |(mut items, counter), (field, value)| {
            let (placeholder, counter) = bind(counter, value, values);
            items.push(render(field, &placeholder));
            (items, counter)
        })
}
