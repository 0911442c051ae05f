//! Parameterized queries, the tabular result model and the memoizing executor.

mod dataset;
mod executor;

pub use dataset::{Column, ColumnKind, Dataset, Params, Query, SqlValue, Value};
pub use executor::{ExecutorConfig, QueryExecutor, QUERY_TTL};
