//! Core data models for the garden planner.
//! Records mirror the backend rows; `GardenState` is the view state of the open garden.

use std::collections::BTreeSet;
use std::rc::Rc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use yew::Reducible;

use crate::state::units::Scale;
use crate::state::viewport::BackgroundDimensions;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlantCategory {
    #[serde(rename = "arbre")]
    Tree,
    #[serde(rename = "arbre_fruitier")]
    FruitTree,
    #[serde(rename = "arbuste")]
    Shrub,
    #[serde(rename = "fleur")]
    Flower,
    #[serde(rename = "legume")]
    Vegetable,
    #[serde(rename = "herbe")]
    Herb,
    #[serde(rename = "autre")]
    Other,
}

impl PlantCategory {
    pub const ALL: [PlantCategory; 7] = [
        PlantCategory::Tree,
        PlantCategory::FruitTree,
        PlantCategory::Shrub,
        PlantCategory::Flower,
        PlantCategory::Vegetable,
        PlantCategory::Herb,
        PlantCategory::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PlantCategory::Tree => "Tree",
            PlantCategory::FruitTree => "Fruit tree",
            PlantCategory::Shrub => "Shrub",
            PlantCategory::Flower => "Flower",
            PlantCategory::Vegetable => "Vegetable",
            PlantCategory::Herb => "Herb",
            PlantCategory::Other => "Other",
        }
    }

    /// Letter drawn inside markers when the user enables it.
    pub fn letter(self) -> char {
        match self {
            PlantCategory::Tree => 'A',
            PlantCategory::FruitTree => 'F',
            PlantCategory::Shrub => 'B',
            PlantCategory::Flower => 'L',
            PlantCategory::Vegetable => 'G',
            PlantCategory::Herb => 'H',
            PlantCategory::Other => 'X',
        }
    }

    /// Backend value, e.g. `"arbre_fruitier"`.
    pub fn as_str(self) -> &'static str {
        match self {
            PlantCategory::Tree => "arbre",
            PlantCategory::FruitTree => "arbre_fruitier",
            PlantCategory::Shrub => "arbuste",
            PlantCategory::Flower => "fleur",
            PlantCategory::Vegetable => "legume",
            PlantCategory::Herb => "herbe",
            PlantCategory::Other => "autre",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantStatus {
    Healthy,
    Sick,
    Dead,
    Planted,
    /// Any status string this client does not know.
    #[serde(other)]
    Unknown,
}

impl PlantStatus {
    pub fn label(self) -> &'static str {
        match self {
            PlantStatus::Healthy => "Healthy",
            PlantStatus::Sick => "Sick",
            PlantStatus::Dead => "Dead",
            PlantStatus::Planted => "Planted",
            PlantStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Garden {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub x_position: f64,
    #[serde(default)]
    pub y_position: f64,
    pub background_color: String,
    /// Object path in the `maps` bucket.
    pub image_path: String,
    /// Public URL resolved from `image_path` when the row is read.
    #[serde(default)]
    pub background_image_url: String,
    #[serde(default)]
    pub image_width: f64,
    #[serde(default)]
    pub image_height: f64,
    #[serde(default)]
    pub default_zoom: Option<f64>,
    #[serde(default)]
    pub min_zoom: Option<f64>,
    #[serde(default)]
    pub max_zoom: Option<f64>,
    pub pixels_per_meters: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Garden {
    /// The garden's scale, or `fallback` when the stored value is unusable.
    pub fn scale(&self, fallback: Scale) -> Scale {
        Scale::or(self.pixels_per_meters, fallback)
    }

    pub fn background(&self) -> Option<BackgroundDimensions> {
        BackgroundDimensions::new(self.image_width, self.image_height)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variety {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub harvest_period: Option<String>,
    #[serde(default)]
    pub main_color: Option<String>,
    #[serde(default)]
    pub reference_url: Option<String>,
    pub category: PlantCategory,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: PlantStatus,
    #[serde(default)]
    pub planted_date: Option<NaiveDate>,
    /// Meters.
    #[serde(default)]
    pub height: f64,
    /// Meters.
    #[serde(default)]
    pub width: f64,
    /// Image pixels.
    #[serde(default)]
    pub x_position: Option<f64>,
    /// Image pixels.
    #[serde(default)]
    pub y_position: Option<f64>,
    #[serde(default)]
    pub garden_id: Option<Uuid>,
    pub variety_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

impl Profile {
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            "Anonymous".to_owned()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorTheme {
    System,
    Light,
    Dark,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub show_markers_letters: Option<bool>,
    #[serde(default)]
    pub default_color_theme: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub preferred_units: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Settings {
    /// Only `system`, `light` and `dark` are honoured; anything else is ignored.
    pub fn color_theme(&self) -> Option<ColorTheme> {
        match self.default_color_theme.as_deref()? {
            "system" => Some(ColorTheme::System),
            "light" => Some(ColorTheme::Light),
            "dark" => Some(ColorTheme::Dark),
            _ => None,
        }
    }

    pub fn show_letters(&self) -> bool {
        self.show_markers_letters.unwrap_or(false)
    }
}

pub const OWNER_ROLE: &str = "owner";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub team_id: i64,
    pub user_id: Uuid,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl TeamMember {
    pub fn is_owner(&self) -> bool {
        self.role.as_deref() == Some(OWNER_ROLE)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub garden_id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

/// View state of the open garden.
#[derive(Clone, Debug, PartialEq)]
pub struct GardenState {
    pub garden: Option<Garden>,
    pub plants: Vec<Plant>,
    pub varieties: Vec<Variety>,
    pub visible: BTreeSet<PlantCategory>,
    pub background: Option<BackgroundDimensions>,
    /// Bumped on every change so canvas effects can redraw.
    pub version: u64,
}

impl Default for GardenState {
    fn default() -> Self {
        Self {
            garden: None,
            plants: Vec::new(),
            varieties: Vec::new(),
            visible: PlantCategory::ALL.into_iter().collect(),
            background: None,
            version: 0,
        }
    }
}

impl GardenState {
    pub fn variety(&self, id: Uuid) -> Option<&Variety> {
        self.varieties.iter().find(|v| v.id == id)
    }

    pub fn plant(&self, id: Uuid) -> Option<&Plant> {
        self.plants.iter().find(|p| p.id == id)
    }
}

pub enum GardenAction {
    SetGarden(Option<Garden>),
    SetBackground(Option<BackgroundDimensions>),
    SetPlants(Vec<Plant>),
    UpsertPlant(Plant),
    MovePlant { id: Uuid, x: f64, y: f64 },
    RemovePlant(Uuid),
    SetVarieties(Vec<Variety>),
    AddVariety(Variety),
    UpdateVariety(Variety),
    /// Drops the variety and every plant that references it.
    RemoveVariety(Uuid),
    ToggleCategory(PlantCategory),
    ShowAllCategories,
}

impl Reducible for GardenState {
    type Action = GardenAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        use GardenAction::*;
        let mut new = (*self).clone();
        match action {
            SetGarden(garden) => {
                new.background = garden.as_ref().and_then(Garden::background);
                new.garden = garden;
                new.plants.clear();
            }
            SetBackground(bg) => {
                new.background = bg;
            }
            SetPlants(plants) => {
                new.plants = plants;
            }
            UpsertPlant(plant) => match new.plants.iter_mut().find(|p| p.id == plant.id) {
                Some(slot) => *slot = plant,
                None => new.plants.insert(0, plant),
            },
            MovePlant { id, x, y } => {
                if let Some(p) = new.plants.iter_mut().find(|p| p.id == id) {
                    p.x_position = Some(x);
                    p.y_position = Some(y);
                }
            }
            RemovePlant(id) => {
                new.plants.retain(|p| p.id != id);
            }
            SetVarieties(varieties) => {
                new.varieties = varieties;
            }
            AddVariety(variety) => {
                tracing::debug!(name = %variety.name, "added variety to list");
                new.varieties.insert(0, variety);
            }
            UpdateVariety(variety) => {
                if let Some(slot) = new.varieties.iter_mut().find(|v| v.id == variety.id) {
                    tracing::debug!(name = %variety.name, "updated variety in list");
                    *slot = variety;
                }
            }
            RemoveVariety(id) => {
                new.varieties.retain(|v| v.id != id);
                let before = new.plants.len();
                new.plants.retain(|p| p.variety_id != id);
                tracing::debug!(%id, removed = before - new.plants.len(), "removed variety and its plants");
            }
            ToggleCategory(cat) => {
                if !new.visible.remove(&cat) {
                    new.visible.insert(cat);
                }
            }
            ShowAllCategories => {
                new.visible = PlantCategory::ALL.into_iter().collect();
            }
        }
        new.version = new.version.wrapping_add(1);
        Rc::new(new)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn variety(name: &str, category: PlantCategory, color: Option<&str>) -> Variety {
        Variety {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            scientific_name: None,
            harvest_period: None,
            main_color: color.map(str::to_owned),
            reference_url: None,
            category,
            created_at: Utc::now(),
        }
    }

    pub fn plant(variety: &Variety, status: PlantStatus, width: f64, x: f64, y: f64) -> Plant {
        Plant {
            id: Uuid::new_v4(),
            name: format!("{} plant", variety.name),
            description: String::new(),
            status,
            planted_date: None,
            height: 1.0,
            width,
            x_position: Some(x),
            y_position: Some(y),
            garden_id: None,
            variety_id: variety.id,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::fixtures::{plant, variety};
    use super::*;

    #[test]
    fn category_and_status_use_backend_strings() {
        let v: PlantCategory = serde_json::from_value(json!("arbre_fruitier")).unwrap();
        assert_eq!(v, PlantCategory::FruitTree);
        assert_eq!(serde_json::to_value(PlantCategory::Vegetable).unwrap(), json!("legume"));
        assert_eq!(PlantCategory::parse("herbe"), Some(PlantCategory::Herb));
        assert_eq!(PlantCategory::parse("cactus"), None);
        let s: PlantStatus = serde_json::from_value(json!("withering")).unwrap();
        assert_eq!(s, PlantStatus::Unknown);
        let s: PlantStatus = serde_json::from_value(json!("sick")).unwrap();
        assert_eq!(s, PlantStatus::Sick);
    }

    #[test]
    fn settings_theme_accepts_known_values_only() {
        let mut s: Settings = serde_json::from_value(json!({
            "id": Uuid::nil(),
            "created_at": "2025-01-01T00:00:00Z",
            "default_color_theme": "dark",
        }))
        .unwrap();
        assert_eq!(s.color_theme(), Some(ColorTheme::Dark));
        assert!(!s.show_letters());
        s.default_color_theme = Some("sepia".into());
        assert_eq!(s.color_theme(), None);
    }

    #[test]
    fn removing_variety_drops_its_plants() {
        let apple = variety("Apple", PlantCategory::FruitTree, Some("#c00"));
        let mint = variety("Mint", PlantCategory::Herb, None);
        let state = Rc::new(GardenState {
            varieties: vec![apple.clone(), mint.clone()],
            plants: vec![
                plant(&apple, PlantStatus::Healthy, 2.0, 0.0, 0.0),
                plant(&mint, PlantStatus::Healthy, 0.2, 5.0, 5.0),
                plant(&apple, PlantStatus::Sick, 2.0, 9.0, 9.0),
            ],
            ..GardenState::default()
        });
        let next = state.reduce(GardenAction::RemoveVariety(apple.id));
        assert_eq!(next.varieties.len(), 1);
        assert_eq!(next.plants.len(), 1);
        assert_eq!(next.plants[0].variety_id, mint.id);
        assert_eq!(next.version, 1);
    }

    #[test]
    fn variety_update_is_seen_by_plants_through_lookup() {
        let mut apple = variety("Apple", PlantCategory::FruitTree, Some("#c00"));
        let p = plant(&apple, PlantStatus::Healthy, 2.0, 0.0, 0.0);
        let state = Rc::new(GardenState {
            varieties: vec![apple.clone()],
            plants: vec![p.clone()],
            ..GardenState::default()
        });
        apple.main_color = Some("#0c0".into());
        let next = state.reduce(GardenAction::UpdateVariety(apple));
        let joined = next.variety(next.plants[0].variety_id).unwrap();
        assert_eq!(joined.main_color.as_deref(), Some("#0c0"));
    }

    #[test]
    fn toggle_and_move() {
        let v = variety("Rose", PlantCategory::Flower, None);
        let p = plant(&v, PlantStatus::Planted, 0.5, 1.0, 1.0);
        let id = p.id;
        let state = Rc::new(GardenState {
            plants: vec![p],
            ..GardenState::default()
        });
        let state = state.reduce(GardenAction::ToggleCategory(PlantCategory::Flower));
        assert!(!state.visible.contains(&PlantCategory::Flower));
        let state = state.reduce(GardenAction::MovePlant { id, x: 40.0, y: 60.0 });
        assert_eq!(state.plant(id).unwrap().x_position, Some(40.0));
        let state = state.reduce(GardenAction::ShowAllCategories);
        assert_eq!(state.visible.len(), PlantCategory::ALL.len());
    }

    #[test]
    fn profile_display_name() {
        let mut p = Profile::default();
        assert_eq!(p.display_name(), "Anonymous");
        p.first_name = Some("Ada".into());
        p.last_name = Some("Lovelace".into());
        assert_eq!(p.display_name(), "Ada Lovelace");
    }
}
