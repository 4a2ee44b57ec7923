//! Filter expressions evaluated by the store against full items.
//!
//! The planner turns the residual conditions of a predicate into a filter
//! so that partition queries, index queries and scans only hand back
//! matching items.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FilterError;

/// A boolean expression over an item's attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FilterExpr {
    /// Reference to an item attribute. Supports dot-separated nested paths.
    Attr(String),
    /// A literal JSON value.
    Literal(Value),
    Eq(Box<FilterExpr>, Box<FilterExpr>),
    And(Vec<FilterExpr>),
}

/// Maximum nesting depth for filter expressions.
const MAX_EXPRESSION_DEPTH: usize = 16;

impl FilterExpr {
    /// Evaluate this expression against an item.
    pub fn eval(&self, item: &Value) -> Result<bool, FilterError> {
        self.eval_inner(item, 0)
    }

    fn eval_inner(&self, item: &Value, depth: usize) -> Result<bool, FilterError> {
        if depth > MAX_EXPRESSION_DEPTH {
            return Err(FilterError::InvalidExpression(format!(
                "expression depth exceeds maximum of {MAX_EXPRESSION_DEPTH}"
            )));
        }

        match self {
            FilterExpr::Attr(_) | FilterExpr::Literal(_) => Err(FilterError::InvalidExpression(
                "leaf node cannot be evaluated as a boolean".to_string(),
            )),
            FilterExpr::Eq(left, right) => {
                let l = resolve_expr(left, item)?;
                let r = resolve_expr(right, item)?;
                Ok(compare_values(l, r) == Some(Ordering::Equal))
            }
            FilterExpr::And(exprs) => {
                for expr in exprs {
                    if !expr.eval_inner(item, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    pub fn attr(name: impl Into<String>) -> Self {
        FilterExpr::Attr(name.into())
    }

    pub fn literal(val: impl Into<Value>) -> Self {
        FilterExpr::Literal(val.into())
    }

    /// `left == right`
    pub fn eq(left: FilterExpr, right: FilterExpr) -> Self {
        FilterExpr::Eq(Box::new(left), Box::new(right))
    }

    /// `attr == value`, the comparison the planner emits per residual condition.
    pub fn attr_eq(name: impl Into<String>, val: impl Into<Value>) -> Self {
        Self::eq(Self::attr(name), Self::literal(val))
    }

    pub fn and(exprs: Vec<FilterExpr>) -> Self {
        FilterExpr::And(exprs)
    }
}

fn resolve_expr<'a>(expr: &'a FilterExpr, item: &'a Value) -> Result<&'a Value, FilterError> {
    match expr {
        FilterExpr::Attr(path) => Ok(resolve_attr(item, path)),
        FilterExpr::Literal(val) => Ok(val),
        _ => Err(FilterError::InvalidExpression(
            "expected attribute or literal in comparison position".to_string(),
        )),
    }
}

/// Resolve a dot-separated attribute path on an item.
///
/// Returns `Value::Null` if any segment is missing.
pub fn resolve_attr<'a>(item: &'a Value, path: &str) -> &'a Value {
    let mut current = item;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(v) => current = v,
            None => return &Value::Null,
        }
    }
    current
}

/// Numbers compare as f64, strings and booleans by value. Mismatched types
/// are incomparable.
fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Attr(path) => write!(f, "{path}"),
            FilterExpr::Literal(val) => write!(f, "{val}"),
            FilterExpr::Eq(l, r) => write!(f, "{l} = {r}"),
            FilterExpr::And(exprs) => {
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
        }
    }
}
