//! Row-oriented data store access
//!
//! Handlers talk to the store through the [`DataStore`] trait. [`RestStore`] speaks PostgREST
//! over HTTPS with a service-role key; [`MemoryStore`] keeps tables in memory for tests and
//! local runs.
use async_trait::async_trait;
use bon::Builder;
use serde_json::{Map, Value};

mod memory;
mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

pub type Row = Value;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    /// The request never produced a response.
    #[error("Data store request failed: {0}")]
    Transport(String),
    /// The response body was not the JSON we expected.
    #[error("Failed to decode data store response: {0}")]
    Decode(String),
}

/// An equality filter on a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl RowFilter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }
}

/// Parameters of a select. Columns default to `*`.
#[derive(Debug, Clone, Default, PartialEq, Builder)]
pub struct SelectQuery {
    #[builder(into)]
    pub columns: Option<String>,
    pub order: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn projection(&self) -> &str {
        self.columns.as_deref().unwrap_or("*")
    }
}

#[async_trait]
pub trait DataStore: std::fmt::Debug + Send + Sync {
    /// Reads rows from `table`.
    async fn select(&self, table: &str, query: &SelectQuery) -> Result<Vec<Row>, StoreError>;

    /// Applies `patch` to every row of `table` matching `filter`, returning the updated rows.
    async fn update(
        &self,
        table: &str,
        filter: &RowFilter,
        patch: &Map<String, Value>,
    ) -> Result<Vec<Row>, StoreError>;
}
