//! Compilation of structured updates and key conditions into store
//! expressions.
//!
//! Every value in an expression is replaced by a positional placeholder
//! (`:1`, `:2`, ...) and moved into the expression's parameter table. The
//! placeholder counter is a plain value passed from step to step, so one
//! compilation can never hand out the same placeholder twice and separate
//! compilations share nothing.

pub mod key_condition;
pub mod update;

use nodb_model::attribute_value::AttributeValue;
use nodb_model::types::ExpressionAttributeValues;

pub use key_condition::{SortKeyCondition, SortKeyOperator, compile_key_condition};
pub use update::UpdateClause;

/// Next free positional placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParamCounter(u32);

impl ParamCounter {
    /// A counter that has issued nothing yet.
    #[must_use]
    pub const fn start() -> Self {
        Self(0)
    }

    /// Issue the next placeholder and return the advanced counter.
    #[must_use]
    pub fn next(self) -> (String, Self) {
        let n = self.0 + 1;
        (format!(":{n}"), Self(n))
    }

    /// Number of placeholders issued so far.
    #[must_use]
    pub fn issued(self) -> u32 {
        self.0
    }
}

/// An expression string plus the values its placeholders stand for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledExpression {
    /// The expression text.
    pub expression: String,
    /// Placeholder to value.
    pub values: ExpressionAttributeValues,
}

impl CompiledExpression {
    /// Whether nothing was compiled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expression.is_empty()
    }
}

/// Bind `value` to the next placeholder. Returns the placeholder name and the
/// advanced counter.
fn bind(
    counter: ParamCounter,
    value: &AttributeValue,
    values: &mut ExpressionAttributeValues,
) -> (String, ParamCounter) {
    let (name, counter) = counter.next();
    values.insert(name.clone(), value.clone());
    (name, counter)
}
