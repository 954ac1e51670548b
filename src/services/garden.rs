use std::rc::Rc;

use chrono::Utc;
use kurbo::Point;
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{ImageUpload, PlantService, TeamService, from_row, to_row};
use crate::backend::{Backend, MAPS_BUCKET, Order, Query};
use crate::error::{Context, GardenError, Result};
use crate::model::Garden;
use crate::state::Scale;

pub const GARDENS_TABLE: &str = "garden_config";

#[derive(Clone, Debug, PartialEq)]
pub struct GardenForm {
    pub name: String,
    pub position: Point,
    pub background_color: String,
    pub image: ImageUpload,
    pub pixels_per_meters: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GardenUpdateForm {
    pub name: String,
    pub position: Point,
    pub background_color: String,
    /// Replaces the background image when set.
    pub image: Option<ImageUpload>,
    pub pixels_per_meters: f64,
}

#[derive(Serialize)]
struct NewGardenRow<'a> {
    id: Uuid,
    name: &'a str,
    x_position: f64,
    y_position: f64,
    background_color: &'a str,
    image_path: &'a str,
    image_width: f64,
    image_height: f64,
    pixels_per_meters: f64,
}

pub struct GardenService {
    backend: Rc<dyn Backend>,
}

impl GardenService {
    pub fn new(backend: Rc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn upload_image(&self, image: &ImageUpload, file_name: &str) -> Result<String> {
        self.backend
            .upload(MAPS_BUCKET, file_name, &image.data_url)
            .context("upload image")
    }

    /// Best effort: a leftover object is not worth failing the caller for.
    pub fn remove_image(&self, path: &str) {
        if let Err(e) = self.backend.remove(MAPS_BUCKET, &[path.to_owned()]) {
            tracing::warn!(path, error = %e, "failed to remove image");
        }
    }

    pub fn image_url(&self, path: &str) -> String {
        self.backend.object_url(MAPS_BUCKET, path)
    }

    fn hydrate(&self, row: Value) -> Result<Garden> {
        let mut garden: Garden = from_row(row)?;
        garden.background_image_url = self.image_url(&garden.image_path);
        Ok(garden)
    }

    /// Uploads the image, then creates the row. The image is removed again if the insert fails.
    pub fn add_garden(&self, form: &GardenForm) -> Result<Garden> {
        let scale = Scale::try_from(form.pixels_per_meters)?;
        let id = Uuid::new_v4();
        let path = self.upload_image(&form.image, &id.to_string())?;

        let row = to_row(&NewGardenRow {
            id,
            name: &form.name,
            x_position: form.position.x,
            y_position: form.position.y,
            background_color: &form.background_color,
            image_path: &path,
            image_width: form.image.width,
            image_height: form.image.height,
            pixels_per_meters: scale.get(),
        })?;
        match self.backend.insert(GARDENS_TABLE, row).context("create garden") {
            Ok(created) => {
                tracing::info!(%id, name = %form.name, "garden created");
                self.hydrate(created)
            }
            Err(e) => {
                self.remove_image(&path);
                Err(e)
            }
        }
    }

    /// All gardens, newest first.
    pub fn fetch_gardens(&self) -> Result<Vec<Garden>> {
        let rows = self
            .backend
            .select(&Query::from(GARDENS_TABLE).order("created_at", Order::Desc))
            .context("fetch gardens")?;
        rows.into_iter().map(|r| self.hydrate(r)).collect()
    }

    pub fn fetch_garden_by_id(&self, id: Uuid) -> Result<Option<Garden>> {
        self.backend
            .select_one(&Query::from(GARDENS_TABLE).eq("id", json!(id)))
            .context("fetch garden")?
            .map(|r| self.hydrate(r))
            .transpose()
    }

    /// Updates the row; a new image replaces (and then deletes) the previous one.
    pub fn update_garden(&self, id: Uuid, form: &GardenUpdateForm) -> Result<Garden> {
        let scale = Scale::try_from(form.pixels_per_meters)?;
        let current = self.fetch_garden_by_id(id)?.ok_or_else(|| GardenError::NotFound {
            table: GARDENS_TABLE.to_owned(),
            id: id.to_string(),
        })?;

        let mut patch = json!({
            "name": form.name,
            "x_position": form.position.x,
            "y_position": form.position.y,
            "background_color": form.background_color,
            "pixels_per_meters": scale.get(),
            "updated_at": Utc::now(),
        });
        let mut uploaded = None;
        if let Some(image) = &form.image {
            let file_name = format!("{id}_{}", Utc::now().timestamp_millis());
            let path = self.upload_image(image, &file_name)?;
            patch["image_path"] = json!(path);
            patch["image_width"] = json!(image.width);
            patch["image_height"] = json!(image.height);
            uploaded = Some(path);
        }

        let row = match self
            .backend
            .update(GARDENS_TABLE, &json!(id), patch)
            .context("update garden")
        {
            Ok(row) => row,
            Err(e) => {
                if let Some(path) = &uploaded {
                    self.remove_image(path);
                }
                return Err(e);
            }
        };
        if let Some(new_path) = &uploaded {
            if *new_path != current.image_path {
                self.remove_image(&current.image_path);
            }
        }
        self.hydrate(row)
    }

    /// Deletes the garden's plants and teams, the row, then the image when a path is given.
    pub fn delete_garden(&self, id: Uuid, image_path: Option<&str>) -> Result<()> {
        let plants = PlantService::new(self.backend.clone());
        for plant in plants.fetch_plants(id)? {
            plants.delete_plant(plant.id)?;
        }
        TeamService::new(self.backend.clone()).remove_garden_teams(id)?;
        self.backend
            .delete(GARDENS_TABLE, &json!(id))
            .context("delete garden")?;
        if let Some(path) = image_path {
            self.remove_image(path);
        }
        tracing::info!(%id, "garden deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, Op};
    use crate::model::{OWNER_ROLE, PlantStatus};
    use crate::services::PlantForm;
    use crate::services::testing::{backend, image, session};

    fn form(name: &str) -> GardenForm {
        GardenForm {
            name: name.into(),
            position: Point::new(0.0, 0.0),
            background_color: "#ffffff".into(),
            image: image(name),
            pixels_per_meters: 25.0,
        }
    }

    fn service(db: &Rc<MemoryBackend>) -> GardenService {
        GardenService::new(db.clone())
    }

    #[test]
    fn add_garden_uploads_image_and_resolves_url() {
        let db = backend();
        let g = service(&db).add_garden(&form("Orchard")).unwrap();
        assert_eq!(g.image_path, g.id.to_string());
        assert_eq!(g.background_image_url, format!("memory://maps/{}", g.id));
        assert_eq!(g.image_width, 2000.0);
        assert_eq!(db.object_count(MAPS_BUCKET), 1);
    }

    #[test]
    fn failed_insert_removes_uploaded_image() {
        let db = backend();
        db.fail_next_insert(GARDENS_TABLE);
        let err = service(&db).add_garden(&form("Orchard")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to create garden"));
        assert_eq!(db.object_count(MAPS_BUCKET), 0);
        assert!(service(&db).fetch_gardens().unwrap().is_empty());
    }

    #[test]
    fn invalid_scale_is_rejected_before_upload() {
        let db = backend();
        let mut f = form("Flat");
        f.pixels_per_meters = 0.0;
        assert!(matches!(
            service(&db).add_garden(&f),
            Err(GardenError::InvalidScale(_))
        ));
        assert_eq!(db.object_count(MAPS_BUCKET), 0);
    }

    #[test]
    fn fetch_orders_newest_first() {
        let db = backend();
        let svc = service(&db);
        svc.add_garden(&form("First")).unwrap();
        svc.add_garden(&form("Second")).unwrap();
        let names: Vec<String> = svc.fetch_gardens().unwrap().into_iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[test]
    fn update_with_new_image_replaces_old_one() {
        let db = backend();
        let svc = service(&db);
        let g = svc.add_garden(&form("Yard")).unwrap();
        let updated = svc
            .update_garden(
                g.id,
                &GardenUpdateForm {
                    name: "Back yard".into(),
                    position: Point::new(1.0, 2.0),
                    background_color: "#000000".into(),
                    image: Some(ImageUpload {
                        data_url: "data:,new".into(),
                        width: 640.0,
                        height: 480.0,
                    }),
                    pixels_per_meters: 30.0,
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Back yard");
        assert_ne!(updated.image_path, g.image_path);
        assert_eq!(updated.image_width, 640.0);
        assert!(updated.updated_at.is_some());
        assert_eq!(db.object_count(MAPS_BUCKET), 1);
        assert_eq!(db.object(MAPS_BUCKET, &updated.image_path).as_deref(), Some("data:,new"));
    }

    #[test]
    fn delete_removes_row_and_image() {
        let db = backend();
        let svc = service(&db);
        let g = svc.add_garden(&form("Gone")).unwrap();
        svc.delete_garden(g.id, Some(&g.image_path)).unwrap();
        assert!(svc.fetch_gardens().unwrap().is_empty());
        assert_eq!(db.object_count(MAPS_BUCKET), 0);
        assert!(svc.fetch_garden_by_id(g.id).unwrap().is_none());
    }

    fn replacement() -> GardenUpdateForm {
        GardenUpdateForm {
            name: "Renamed".into(),
            position: Point::ZERO,
            background_color: "#ffffff".into(),
            image: Some(ImageUpload {
                data_url: "data:,replacement".into(),
                width: 10.0,
                height: 10.0,
            }),
            pixels_per_meters: 25.0,
        }
    }

    #[test]
    fn failed_update_keeps_old_image_and_drops_new_one() {
        let db = backend();
        let svc = service(&db);
        let g = svc.add_garden(&form("Yard")).unwrap();
        db.fail_next(Op::Update, GARDENS_TABLE);
        let err = svc.update_garden(g.id, &replacement()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to update garden"));
        assert_eq!(db.object_count(MAPS_BUCKET), 1);
        assert!(db.object(MAPS_BUCKET, &g.image_path).is_some());
        assert_eq!(svc.fetch_garden_by_id(g.id).unwrap(), Some(g));
    }

    #[test]
    fn image_removal_failure_does_not_fail_delete() {
        let db = backend();
        let svc = service(&db);
        let g = svc.add_garden(&form("Stubborn")).unwrap();
        db.fail_next(Op::Remove, MAPS_BUCKET);
        svc.delete_garden(g.id, Some(&g.image_path)).unwrap();
        assert!(svc.fetch_garden_by_id(g.id).unwrap().is_none());
        assert_eq!(db.object_count(MAPS_BUCKET), 1);
    }

    #[test]
    fn delete_takes_plants_and_teams_with_it() {
        let db = backend();
        let svc = service(&db);
        let plants = PlantService::new(db.clone());
        let teams = TeamService::new(db.clone());
        let g = svc.add_garden(&form("Plot")).unwrap();
        let keep = svc.add_garden(&form("Other")).unwrap();
        let plant = |garden: Uuid| PlantForm {
            name: "Rhubarb".into(),
            description: String::new(),
            status: PlantStatus::Planted,
            planted_date: None,
            height: 0.5,
            width: 0.5,
            x_position: Some(10.0),
            y_position: Some(10.0),
            garden_id: Some(garden),
            variety_id: Uuid::new_v4(),
        };
        plants.add_plant(&plant(g.id)).unwrap();
        plants.add_plant(&plant(keep.id)).unwrap();
        let team = teams.create_team(g.id, None).unwrap();
        teams
            .add_team_member(team.id, session().require_user().unwrap(), Some(OWNER_ROLE))
            .unwrap();

        svc.delete_garden(g.id, Some(&g.image_path)).unwrap();
        assert!(plants.fetch_plants(g.id).unwrap().is_empty());
        assert_eq!(plants.fetch_plants(keep.id).unwrap().len(), 1);
        assert!(teams.fetch_teams_by_garden(g.id).unwrap().is_empty());
        assert!(teams.fetch_team_members(team.id).unwrap().is_empty());
    }
}
