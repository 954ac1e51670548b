//! Boundary to the hosted backend: tables queried as JSON rows plus object buckets.
//!
//! Services only talk to [`Backend`]. [`MemoryBackend`] keeps everything in
//! memory (tests, and the engine behind [`LocalBackend`], which persists a
//! snapshot to `localStorage`).

mod local;
mod memory;

pub use local::LocalBackend;
pub use memory::{MemoryBackend, Op, Tables};

use serde_json::Value;

use crate::error::Result;

pub const MAPS_BUCKET: &str = "maps";
pub const AVATARS_BUCKET: &str = "avatars";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// A select over one table: equality filters and an optional ordering.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub table: String,
    pub filters: Vec<(String, Value)>,
    pub order: Option<(String, Order)>,
}

impl Query {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_owned(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn eq(mut self, column: &str, value: Value) -> Self {
        self.filters.push((column.to_owned(), value));
        self
    }

    pub fn order(mut self, column: &str, order: Order) -> Self {
        self.order = Some((column.to_owned(), order));
        self
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters
            .iter()
            .all(|(col, val)| row.get(col).unwrap_or(&Value::Null) == val)
    }
}

pub trait Backend {
    fn select(&self, query: &Query) -> Result<Vec<Value>>;

    /// Inserts a row; the backend fills `id` (serial) and `created_at` when absent.
    fn insert(&self, table: &str, row: Value) -> Result<Value>;

    /// Shallow-merges `patch` into the row with this id.
    fn update(&self, table: &str, id: &Value, patch: Value) -> Result<Value>;

    fn delete(&self, table: &str, id: &Value) -> Result<()>;

    /// Stores an object (a data URL) and returns its path. Existing paths are a conflict.
    fn upload(&self, bucket: &str, path: &str, data_url: &str) -> Result<String>;

    /// Removes objects; missing paths are ignored.
    fn remove(&self, bucket: &str, paths: &[String]) -> Result<()>;

    fn object_url(&self, bucket: &str, path: &str) -> String;

    /// First row matching the query, if any.
    fn select_one(&self, query: &Query) -> Result<Option<Value>> {
        Ok(self.select(query)?.into_iter().next())
    }
}

/// Public URL of an object in the hosted storage service.
pub fn public_object_url(project_id: &str, bucket: &str, path: &str) -> String {
    format!("https://{project_id}.supabase.co/storage/v1/object/public/{bucket}/{path}")
}
