//! Read path: predicates, filter expressions and the query planner.

pub mod filter;
pub mod planner;
pub mod predicate;

pub use filter::FilterExpr;
pub use planner::{PlannedOperation, QueryPlanner};
pub use predicate::{Condition, OrderBy, Predicate};
