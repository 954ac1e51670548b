use std::rc::Rc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::{from_row, from_rows, to_row};
use crate::backend::{Backend, Order, Query};
use crate::error::{Context, Result};
use crate::model::{Plant, PlantStatus};

pub const PLANTS_TABLE: &str = "plants";

/// Editable plant fields, used for both creation and full updates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlantForm {
    pub name: String,
    pub description: String,
    pub status: PlantStatus,
    pub planted_date: Option<NaiveDate>,
    pub height: f64,
    pub width: f64,
    pub x_position: Option<f64>,
    pub y_position: Option<f64>,
    pub garden_id: Option<Uuid>,
    pub variety_id: Uuid,
}

impl From<&Plant> for PlantForm {
    fn from(p: &Plant) -> Self {
        Self {
            name: p.name.clone(),
            description: p.description.clone(),
            status: p.status,
            planted_date: p.planted_date,
            height: p.height,
            width: p.width,
            x_position: p.x_position,
            y_position: p.y_position,
            garden_id: p.garden_id,
            variety_id: p.variety_id,
        }
    }
}

#[derive(Serialize)]
struct NewPlantRow<'a> {
    id: Uuid,
    #[serde(flatten)]
    form: &'a PlantForm,
}

pub struct PlantService {
    backend: Rc<dyn Backend>,
}

impl PlantService {
    pub fn new(backend: Rc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn add_plant(&self, form: &PlantForm) -> Result<Plant> {
        let row = to_row(&NewPlantRow {
            id: Uuid::new_v4(),
            form,
        })?;
        from_row(self.backend.insert(PLANTS_TABLE, row).context("create plant")?)
    }

    /// Plants of one garden, newest first.
    pub fn fetch_plants(&self, garden_id: Uuid) -> Result<Vec<Plant>> {
        let q = Query::from(PLANTS_TABLE)
            .eq("garden_id", json!(garden_id))
            .order("created_at", Order::Desc);
        from_rows(self.backend.select(&q).context("fetch plants")?)
    }

    pub fn fetch_plant_by_id(&self, id: Uuid) -> Result<Option<Plant>> {
        self.backend
            .select_one(&Query::from(PLANTS_TABLE).eq("id", json!(id)))
            .context("fetch plant")?
            .map(from_row)
            .transpose()
    }

    pub fn update_plant(&self, id: Uuid, form: &PlantForm) -> Result<Plant> {
        let mut patch = to_row(form)?;
        patch["updated_at"] = json!(Utc::now());
        from_row(
            self.backend
                .update(PLANTS_TABLE, &json!(id), patch)
                .context("update plant")?,
        )
    }

    /// Stores a new position (image pixels) after a drag.
    pub fn move_plant(&self, id: Uuid, x: f64, y: f64) -> Result<Plant> {
        let patch = json!({
            "x_position": x,
            "y_position": y,
            "updated_at": Utc::now(),
        });
        let plant: Plant = from_row(
            self.backend
                .update(PLANTS_TABLE, &json!(id), patch)
                .context("update plant position")?,
        )?;
        tracing::info!(%id, x, y, "plant position updated");
        Ok(plant)
    }

    pub fn delete_plant(&self, id: Uuid) -> Result<()> {
        self.backend
            .delete(PLANTS_TABLE, &json!(id))
            .context("delete plant")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::backend;

    fn form(garden: Uuid, name: &str) -> PlantForm {
        PlantForm {
            name: name.into(),
            description: "by the fence".into(),
            status: PlantStatus::Planted,
            planted_date: NaiveDate::from_ymd_opt(2025, 4, 1),
            height: 1.5,
            width: 0.4,
            x_position: Some(120.0),
            y_position: Some(80.0),
            garden_id: Some(garden),
            variety_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn plants_are_scoped_to_their_garden() {
        let svc = PlantService::new(backend());
        let g1 = Uuid::new_v4();
        let g2 = Uuid::new_v4();
        svc.add_plant(&form(g1, "a")).unwrap();
        svc.add_plant(&form(g2, "b")).unwrap();
        svc.add_plant(&form(g1, "c")).unwrap();
        let names: Vec<String> = svc.fetch_plants(g1).unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["c", "a"]);
    }

    #[test]
    fn missing_plant_is_none() {
        let svc = PlantService::new(backend());
        assert_eq!(svc.fetch_plant_by_id(Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn move_and_update_round_trip() {
        let svc = PlantService::new(backend());
        let p = svc.add_plant(&form(Uuid::new_v4(), "fig")).unwrap();
        let moved = svc.move_plant(p.id, 300.5, 42.0).unwrap();
        assert_eq!((moved.x_position, moved.y_position), (Some(300.5), Some(42.0)));
        assert!(moved.updated_at.is_some());

        let mut f = PlantForm::from(&moved);
        f.status = PlantStatus::Sick;
        let updated = svc.update_plant(p.id, &f).unwrap();
        assert_eq!(updated.status, PlantStatus::Sick);
        assert_eq!(updated.x_position, Some(300.5));
        assert_eq!(updated.planted_date, NaiveDate::from_ymd_opt(2025, 4, 1));

        svc.delete_plant(p.id).unwrap();
        assert!(svc.fetch_plant_by_id(p.id).unwrap().is_none());
        assert!(svc.move_plant(p.id, 0.0, 0.0).unwrap_err().is_not_found());
    }
}
