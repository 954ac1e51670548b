//! Thin data-access wrappers, one per entity, over a [`Backend`](crate::backend::Backend).

pub mod garden;
pub mod plant;
pub mod profile;
pub mod settings;
pub mod team;
pub mod variety;

pub use garden::{GardenForm, GardenService, GardenUpdateForm};
pub use plant::{PlantForm, PlantService};
pub use profile::{ProfileService, ProfileUpdateForm};
pub use settings::{SettingsService, SettingsUpdateForm};
pub use team::TeamService;
pub use variety::{VarietyForm, VarietyPatch, VarietyService};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// An image picked by the user, already read as a data URL and measured.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageUpload {
    pub data_url: String,
    pub width: f64,
    pub height: f64,
}

pub(crate) fn from_row<T: DeserializeOwned>(row: Value) -> Result<T> {
    Ok(serde_json::from_value(row)?)
}

pub(crate) fn from_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}

pub(crate) fn to_row<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::rc::Rc;

    use uuid::Uuid;

    use super::ImageUpload;
    use crate::backend::MemoryBackend;
    use crate::model::User;
    use crate::state::Session;

    pub fn backend() -> Rc<MemoryBackend> {
        Rc::new(MemoryBackend::new())
    }

    pub fn session() -> Session {
        Session::signed_in(User {
            id: Uuid::new_v4(),
            email: Some("gardener@example.org".into()),
        })
    }

    pub fn image(tag: &str) -> ImageUpload {
        ImageUpload {
            data_url: format!("data:image/png;base64,{tag}"),
            width: 2000.0,
            height: 1000.0,
        }
    }
}
