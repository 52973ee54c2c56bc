//! Key condition expressions for range queries.

use std::fmt;
use std::str::FromStr;

use nodb_model::attribute_value::AttributeValue;
use nodb_model::types::ExpressionAttributeValues;

use super::{CompiledExpression, ParamCounter, bind};
use crate::error::{NoDbError, NoDbResult};

/// Comparison applied to the sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKeyOperator {
    #[default]
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    BeginsWith,
    Between,
}

impl SortKeyOperator {
    /// The operator as it appears in an expression.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::BeginsWith => "begins_with",
            Self::Between => "BETWEEN",
        }
    }
}

impl fmt::Display for SortKeyOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKeyOperator {
    type Err = NoDbError;

    /// Accepts both symbolic (`<=`) and named (`le`) spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "=" | "eq" => Ok(Self::Eq),
            "<" | "lt" => Ok(Self::Lt),
            "<=" | "le" => Ok(Self::Le),
            ">" | "gt" => Ok(Self::Gt),
            ">=" | "ge" => Ok(Self::Ge),
            "begins_with" => Ok(Self::BeginsWith),
            "between" => Ok(Self::Between),
            other => Err(NoDbError::usage(format!(
                "unsupported sort key operator `{other}`"
            ))),
        }
    }
}

/// A condition on the sort key of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKeyCondition {
    /// Sort key attribute name.
    pub key: String,
    /// The comparison.
    pub operator: SortKeyOperator,
    /// The compared value, or the lower bound for `BETWEEN`.
    pub value: AttributeValue,
    /// The upper bound for `BETWEEN`. Any other operator rejects it.
    pub upper: Option<AttributeValue>,
}

impl SortKeyCondition {
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        operator: SortKeyOperator,
        value: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            key: key.into(),
            operator,
            value: value.into(),
            upper: None,
        }
    }

    #[must_use]
    pub fn equals(key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(key, SortKeyOperator::Eq, value)
    }

    #[must_use]
    pub fn begins_with(key: impl Into<String>, prefix: impl Into<AttributeValue>) -> Self {
        Self::new(key, SortKeyOperator::BeginsWith, prefix)
    }

    /// Inclusive range `low..=high`.
    #[must_use]
    pub fn between(
        key: impl Into<String>,
        low: impl Into<AttributeValue>,
        high: impl Into<AttributeValue>,
    ) -> Self {
        Self::new(key, SortKeyOperator::Between, low).with_upper(high)
    }

    /// Set the upper bound. Only `BETWEEN` takes one; compiling any other
    /// operator with an upper bound is a usage error.
    #[must_use]
    pub fn with_upper(mut self, upper: impl Into<AttributeValue>) -> Self {
        self.upper = Some(upper.into());
        self
    }

    /// Compile this condition starting at `counter`.
    fn compile(
        &self,
        counter: ParamCounter,
        values: &mut ExpressionAttributeValues,
    ) -> NoDbResult<(String, ParamCounter)> {
        let key = &self.key;
        if self.upper.is_some() && self.operator != SortKeyOperator::Between {
            return Err(NoDbError::usage(format!(
                "`{}` on `{key}` takes no upper bound",
                self.operator
            )));
        }
        let (p, counter) = bind(counter, &self.value, values);
        match self.operator {
            SortKeyOperator::BeginsWith => Ok((format!("begins_with({key}, {p})"), counter)),
            SortKeyOperator::Between => {
                let upper = self.upper.as_ref().ok_or_else(|| {
                    NoDbError::usage(format!("BETWEEN on `{key}` needs an upper bound"))
                })?;
                let (q, counter) = bind(counter, upper, values);
                Ok((format!("{key} BETWEEN {p} AND {q}"), counter))
            }
            op => Ok((format!("{key} {op} {p}"), counter)),
        }
    }
}

/// Compile `partition_key = :1`, followed by ` and <condition>` when a sort
/// key condition is given.
pub fn compile_key_condition(
    partition_key: &str,
    partition_value: &AttributeValue,
    condition: Option<&SortKeyCondition>,
) -> NoDbResult<CompiledExpression> {
    let mut values = ExpressionAttributeValues::new();
    let (p, counter) = bind(ParamCounter::start(), partition_value, &mut values);
    let mut expression = format!("{partition_key} = {p}");

    if let Some(condition) = condition {
        let (clause, _) = condition.compile(counter, &mut values)?;
        expression.push_str(" and ");
        expression.push_str(&clause);
    }

    Ok(CompiledExpression { expression, values })
}
