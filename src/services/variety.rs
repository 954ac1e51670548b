use std::rc::Rc;

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::{from_row, from_rows, to_row};
use crate::backend::{Backend, Order, Query};
use crate::error::{Context, Result};
use crate::model::{PlantCategory, Variety};

pub const VARIETIES_TABLE: &str = "variety";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VarietyForm {
    pub name: String,
    pub scientific_name: Option<String>,
    pub harvest_period: Option<String>,
    pub main_color: Option<String>,
    pub reference_url: Option<String>,
    pub category: PlantCategory,
}

/// Partial update; unset fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct VarietyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harvest_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<PlantCategory>,
}

pub struct VarietyService {
    backend: Rc<dyn Backend>,
}

impl VarietyService {
    pub fn new(backend: Rc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The whole catalog, by name.
    pub fn fetch_varieties(&self) -> Result<Vec<Variety>> {
        let q = Query::from(VARIETIES_TABLE).order("name", Order::Asc);
        let rows = self
            .backend
            .select(&q)
            .context("fetch varieties")
            .inspect_err(|e| tracing::error!(error = %e, "error fetching varieties"))?;
        from_rows(rows)
    }

    pub fn fetch_variety_by_id(&self, id: Uuid) -> Result<Option<Variety>> {
        self.backend
            .select_one(&Query::from(VARIETIES_TABLE).eq("id", json!(id)))
            .context("fetch variety")
            .inspect_err(|e| tracing::error!(error = %e, "error fetching variety"))?
            .map(from_row)
            .transpose()
    }

    pub fn add_variety(&self, form: &VarietyForm) -> Result<Variety> {
        let mut row = to_row(form)?;
        row["id"] = json!(Uuid::new_v4());
        let created = self
            .backend
            .insert(VARIETIES_TABLE, row)
            .context("add variety")
            .inspect_err(|e| tracing::error!(error = %e, "error adding variety"))?;
        from_row(created)
    }

    pub fn update_variety(&self, id: Uuid, patch: &VarietyPatch) -> Result<Variety> {
        let updated = self
            .backend
            .update(VARIETIES_TABLE, &json!(id), to_row(patch)?)
            .context("update variety")
            .inspect_err(|e| tracing::error!(error = %e, "error updating variety"))?;
        from_row(updated)
    }

    pub fn delete_variety(&self, id: Uuid) -> Result<()> {
        self.backend
            .delete(VARIETIES_TABLE, &json!(id))
            .context("delete variety")
            .inspect_err(|e| tracing::error!(error = %e, "error deleting variety"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Op;
    use crate::services::testing::backend;

    fn form(name: &str, category: PlantCategory) -> VarietyForm {
        VarietyForm {
            name: name.into(),
            scientific_name: None,
            harvest_period: Some("Sept".into()),
            main_color: Some("#aa3300".into()),
            reference_url: None,
            category,
        }
    }

    #[test]
    fn catalog_is_sorted_by_name() {
        let svc = VarietyService::new(backend());
        svc.add_variety(&form("Tomato", PlantCategory::Vegetable)).unwrap();
        svc.add_variety(&form("Basil", PlantCategory::Herb)).unwrap();
        svc.add_variety(&form("Pear", PlantCategory::FruitTree)).unwrap();
        let names: Vec<String> = svc.fetch_varieties().unwrap().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["Basil", "Pear", "Tomato"]);
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let svc = VarietyService::new(backend());
        let v = svc.add_variety(&form("Tomato", PlantCategory::Vegetable)).unwrap();
        let patch = VarietyPatch {
            main_color: Some("#ff0000".into()),
            ..VarietyPatch::default()
        };
        let updated = svc.update_variety(v.id, &patch).unwrap();
        assert_eq!(updated.main_color.as_deref(), Some("#ff0000"));
        assert_eq!(updated.harvest_period.as_deref(), Some("Sept"));
        assert_eq!(updated.category, PlantCategory::Vegetable);
        assert_eq!(svc.fetch_variety_by_id(v.id).unwrap(), Some(updated));
    }

    #[test]
    fn backend_failure_propagates() {
        let db = backend();
        let svc = VarietyService::new(db.clone());
        db.fail_next(Op::Select, VARIETIES_TABLE);
        let err = svc.fetch_varieties().unwrap_err();
        assert!(err.to_string().starts_with("Failed to fetch varieties"));
        svc.delete_variety(Uuid::new_v4()).unwrap();
    }
}
