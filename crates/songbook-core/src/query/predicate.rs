//! Declarative predicates: equality conditions plus an optional ordering.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::SortOrder;

/// `attribute = value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub value: Value,
}

/// Requested result ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub attribute: String,
    pub order: SortOrder,
}

/// A conjunction of equality conditions, optionally ordered.
///
/// ```
/// use songbook_core::query::Predicate;
/// use songbook_core::types::SortOrder;
///
/// let p = Predicate::eq("artist", "No one you know")
///     .order_by("songTitle", SortOrder::Descending);
/// assert_eq!(p.conditions().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    conditions: Vec<Condition>,
    order_by: Option<OrderBy>,
}

impl Predicate {
    /// Start a predicate with a single `attribute = value` condition.
    pub fn eq(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_eq(attribute, value)
    }

    /// Add another `attribute = value` condition.
    pub fn and_eq(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            attribute: attribute.into(),
            value: value.into(),
        });
        self
    }

    /// Request results ordered by `attribute`.
    pub fn order_by(mut self, attribute: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some(OrderBy {
            attribute: attribute.into(),
            order,
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    /// The value bound to `attribute`, if any.
    pub fn value_of(&self, attribute: &str) -> Option<&Value> {
        self.conditions
            .iter()
            .find(|c| c.attribute == attribute)
            .map(|c| &c.value)
    }

    pub fn binds(&self, attribute: &str) -> bool {
        self.value_of(attribute).is_some()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{} = {}", c.attribute, c.value)?;
        }
        if let Some(order) = &self.order_by {
            write!(f, " ORDER BY {} {}", order.attribute, order.order)?;
        }
        Ok(())
    }
}
