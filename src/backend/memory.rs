use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Backend, Order, Query};
use crate::error::{GardenError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Select,
    Insert,
    Update,
    Delete,
    Upload,
    Remove,
}

/// Serializable contents of a backend: rows per table and objects per bucket.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub rows: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    pub objects: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RefCell<Tables>,
    failures: RefCell<Vec<(Op, String)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: Tables) -> Self {
        Self {
            tables: RefCell::new(tables),
            failures: RefCell::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Tables {
        self.tables.borrow().clone()
    }

    /// Puts back a snapshot taken earlier.
    pub fn restore(&self, tables: Tables) {
        *self.tables.borrow_mut() = tables;
    }

    /// Makes the next `op` against `target` (table or bucket) fail once.
    pub fn fail_next(&self, op: Op, target: &str) {
        self.failures.borrow_mut().push((op, target.to_owned()));
    }

    pub fn fail_next_insert(&self, table: &str) {
        self.fail_next(Op::Insert, table);
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<String> {
        self.tables
            .borrow()
            .objects
            .get(bucket)
            .and_then(|b| b.get(path))
            .cloned()
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.tables.borrow().objects.get(bucket).map_or(0, BTreeMap::len)
    }

    fn check(&self, op: Op, target: &str) -> Result<()> {
        let mut failures = self.failures.borrow_mut();
        if let Some(i) = failures.iter().position(|(o, t)| *o == op && t == target) {
            failures.remove(i);
            return Err(GardenError::Storage(format!("injected {op:?} failure on {target}")));
        }
        Ok(())
    }

    fn not_found(table: &str, id: &Value) -> GardenError {
        GardenError::NotFound {
            table: table.to_owned(),
            id: match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }
}

/// Postgres-like ordering: timestamps chronologically, numbers numerically, nulls last.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => {
            match (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
                (Ok(dx), Ok(dy)) => dx.cmp(&dy),
                _ => x.cmp(y),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn next_serial(rows: &[Value]) -> i64 {
    rows.iter()
        .filter_map(|r| r.get("id").and_then(Value::as_i64))
        .max()
        .unwrap_or(0)
        + 1
}

impl Backend for MemoryBackend {
    fn select(&self, query: &Query) -> Result<Vec<Value>> {
        self.check(Op::Select, &query.table)?;
        let tables = self.tables.borrow();
        let mut rows: Vec<Value> = tables
            .rows
            .get(&query.table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();
        if let Some((col, order)) = &query.order {
            let null = Value::Null;
            rows.sort_by(|a, b| compare_values(a.get(col).unwrap_or(&null), b.get(col).unwrap_or(&null)));
            if *order == Order::Desc {
                // Reversing a stable ascending sort also puts the latest insert first on ties.
                rows.reverse();
            }
        }
        Ok(rows)
    }

    fn insert(&self, table: &str, row: Value) -> Result<Value> {
        self.check(Op::Insert, table)?;
        let Value::Object(mut obj) = row else {
            return Err(GardenError::Storage(format!("{table}: row must be an object")));
        };
        let mut tables = self.tables.borrow_mut();
        let rows = tables.rows.entry(table.to_owned()).or_default();
        if obj.get("id").is_none_or(Value::is_null) {
            obj.insert("id".into(), Value::from(next_serial(rows)));
        }
        let id = obj["id"].clone();
        if rows.iter().any(|r| r.get("id") == Some(&id)) {
            return Err(GardenError::Storage(format!("{table}: duplicate id {id}")));
        }
        if obj.get("created_at").is_none_or(Value::is_null) {
            obj.insert("created_at".into(), serde_json::to_value(Utc::now())?);
        }
        let row = Value::Object(obj);
        rows.push(row.clone());
        Ok(row)
    }

    fn update(&self, table: &str, id: &Value, patch: Value) -> Result<Value> {
        self.check(Op::Update, table)?;
        let Value::Object(patch) = patch else {
            return Err(GardenError::Storage(format!("{table}: patch must be an object")));
        };
        let mut tables = self.tables.borrow_mut();
        let row = tables
            .rows
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| r.get("id") == Some(id)))
            .ok_or_else(|| Self::not_found(table, id))?;
        let obj: &mut Map<String, Value> = row
            .as_object_mut()
            .ok_or_else(|| GardenError::Storage(format!("{table}: corrupt row")))?;
        for (k, v) in patch {
            if k != "id" {
                obj.insert(k, v);
            }
        }
        Ok(row.clone())
    }

    fn delete(&self, table: &str, id: &Value) -> Result<()> {
        self.check(Op::Delete, table)?;
        if let Some(rows) = self.tables.borrow_mut().rows.get_mut(table) {
            rows.retain(|r| r.get("id") != Some(id));
        }
        Ok(())
    }

    fn upload(&self, bucket: &str, path: &str, data_url: &str) -> Result<String> {
        self.check(Op::Upload, bucket)?;
        let mut tables = self.tables.borrow_mut();
        let objects = tables.objects.entry(bucket.to_owned()).or_default();
        if objects.contains_key(path) {
            return Err(GardenError::Conflict {
                bucket: bucket.to_owned(),
                path: path.to_owned(),
            });
        }
        objects.insert(path.to_owned(), data_url.to_owned());
        Ok(path.to_owned())
    }

    fn remove(&self, bucket: &str, paths: &[String]) -> Result<()> {
        self.check(Op::Remove, bucket)?;
        if let Some(objects) = self.tables.borrow_mut().objects.get_mut(bucket) {
            for p in paths {
                objects.remove(p);
            }
        }
        Ok(())
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{bucket}/{path}")
    }
}
