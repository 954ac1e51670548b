use serde_json::Value;

use super::{Backend, MemoryBackend, Query, Tables, public_object_url};
use crate::config::AppConfig;
use crate::error::{GardenError, Result};

type Writer = Box<dyn Fn(&str, &str) -> Result<()>>;

/// In-browser backend: a [`MemoryBackend`] whose snapshot lives in `localStorage`.
pub struct LocalBackend {
    inner: MemoryBackend,
    key: String,
    project_id: Option<String>,
    write: Writer,
}

fn storage() -> Result<web_sys::Storage> {
    web_sys::window()
        .and_then(|w| w.local_storage().ok().flatten())
        .ok_or_else(|| GardenError::Storage("localStorage unavailable".into()))
}

fn write_local_storage(key: &str, raw: &str) -> Result<()> {
    storage()?
        .set_item(key, raw)
        .map_err(|_| GardenError::Storage("localStorage write rejected (quota?)".into()))
}

impl LocalBackend {
    pub fn load(config: &AppConfig) -> Self {
        let key = config.storage_key("tables");
        let tables = storage()
            .ok()
            .and_then(|s| s.get_item(&key).ok().flatten())
            .and_then(|raw| match serde_json::from_str::<Tables>(&raw) {
                Ok(t) => Some(t),
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable local data");
                    None
                }
            })
            .unwrap_or_default();
        Self::with_writer(tables, key, config.project_id.clone(), write_local_storage)
    }

    /// Backend over `tables` that hands every serialized snapshot to `write`.
    pub fn with_writer(
        tables: Tables,
        key: String,
        project_id: Option<String>,
        write: impl Fn(&str, &str) -> Result<()> + 'static,
    ) -> Self {
        Self {
            inner: MemoryBackend::from_tables(tables),
            key,
            project_id,
            write: Box::new(write),
        }
    }

    fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.inner.snapshot())?;
        (self.write)(&self.key, &raw)
    }

    /// Runs a mutation and saves it. Memory is rolled back when the save fails.
    fn persisted<T>(&self, op: impl FnOnce(&MemoryBackend) -> Result<T>) -> Result<T> {
        let before = self.inner.snapshot();
        let out = op(&self.inner)?;
        if let Err(e) = self.persist() {
            tracing::warn!(key = %self.key, error = %e, "local save failed, rolling back");
            self.inner.restore(before);
            return Err(e);
        }
        Ok(out)
    }
}

impl Backend for LocalBackend {
    fn select(&self, query: &Query) -> Result<Vec<Value>> {
        self.inner.select(query)
    }

    fn insert(&self, table: &str, row: Value) -> Result<Value> {
        self.persisted(|db| db.insert(table, row))
    }

    fn update(&self, table: &str, id: &Value, patch: Value) -> Result<Value> {
        self.persisted(|db| db.update(table, id, patch))
    }

    fn delete(&self, table: &str, id: &Value) -> Result<()> {
        self.persisted(|db| db.delete(table, id))
    }

    fn upload(&self, bucket: &str, path: &str, data_url: &str) -> Result<String> {
        self.persisted(|db| db.upload(bucket, path, data_url))
    }

    fn remove(&self, bucket: &str, paths: &[String]) -> Result<()> {
        self.persisted(|db| db.remove(bucket, paths))
    }

    /// Objects stored locally resolve to their data URL; anything else to the hosted bucket.
    fn object_url(&self, bucket: &str, path: &str) -> String {
        match (self.inner.object(bucket, path), &self.project_id) {
            (Some(data_url), _) => data_url,
            (None, Some(project)) => public_object_url(project, bucket, path),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use serde_json::json;

    use super::*;

    struct Harness {
        db: LocalBackend,
        reject: Rc<Cell<bool>>,
        saved: Rc<RefCell<Option<String>>>,
    }

    fn harness(project_id: Option<&str>) -> Harness {
        let reject = Rc::new(Cell::new(false));
        let saved = Rc::new(RefCell::new(None));
        let (r, s) = (reject.clone(), saved.clone());
        let db = LocalBackend::with_writer(
            Tables::default(),
            "garden.tables".into(),
            project_id.map(str::to_owned),
            move |_, raw| {
                if r.get() {
                    return Err(GardenError::Storage("quota exceeded".into()));
                }
                *s.borrow_mut() = Some(raw.to_owned());
                Ok(())
            },
        );
        Harness { db, reject, saved }
    }

    fn stored(h: &Harness) -> Tables {
        serde_json::from_str(h.saved.borrow().as_deref().unwrap()).unwrap()
    }

    #[test]
    fn failed_save_rolls_back_every_mutation() {
        let h = harness(None);
        h.db.insert("plants", json!({"id": "p1", "name": "Kale"})).unwrap();
        h.db.upload("maps", "g1", "data:,map").unwrap();

        h.reject.set(true);
        assert!(h.db.insert("plants", json!({"id": "p2"})).is_err());
        assert!(h.db.update("plants", &json!("p1"), json!({"name": "Chard"})).is_err());
        assert!(h.db.delete("plants", &json!("p1")).is_err());
        assert!(h.db.remove("maps", &["g1".into()]).is_err());
        assert!(h.db.upload("maps", "g2", "data:,big").is_err());

        let rows = h.db.select(&Query::from("plants")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("Kale"));
        assert_eq!(h.db.object_url("maps", "g1"), "data:,map");
        assert_eq!(h.db.object_url("maps", "g2"), "");

        h.reject.set(false);
        h.db.insert("teams", json!({"name": "Family"})).unwrap();
        let saved = stored(&h);
        assert_eq!(saved.rows["plants"].len(), 1);
        assert_eq!(saved.rows["plants"][0]["name"], json!("Kale"));
        assert_eq!(saved.objects["maps"].len(), 1);
    }

    #[test]
    fn local_objects_win_over_hosted_urls() {
        let h = harness(Some("abc"));
        h.db.upload("avatars", "me", "data:,face").unwrap();
        assert_eq!(h.db.object_url("avatars", "me"), "data:,face");
        assert_eq!(
            h.db.object_url("avatars", "remote"),
            "https://abc.supabase.co/storage/v1/object/public/avatars/remote"
        );
    }
}
