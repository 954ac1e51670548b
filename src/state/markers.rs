// Plant -> screen marker projection and hit-testing.
use std::collections::{BTreeSet, HashMap};

use kurbo::Point;
use uuid::Uuid;

use crate::model::{Plant, PlantCategory, PlantStatus, Variety};
use crate::state::units::{Scale, meters_to_pixels};

/// Plants narrower than this are drawn at this width so they stay clickable.
pub const MIN_MARKER_WIDTH_M: f64 = 0.7;
pub const STROKE_WIDTH: f64 = 3.0;
pub const DEFAULT_FILL: &str = "#ffffff";
/// Position used for plants that have not been placed yet.
pub const UNPLACED_POSITION: f64 = 100.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub plant_id: Uuid,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub fill: String,
    pub stroke: &'static str,
    pub stroke_width: f64,
    pub opacity: f64,
    pub category: PlantCategory,
    pub letter: Option<char>,
}

impl Marker {
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn contains(&self, world: Point) -> bool {
        self.center().distance(world) <= self.radius
    }
}

pub fn status_stroke(status: PlantStatus) -> &'static str {
    match status {
        PlantStatus::Healthy | PlantStatus::Planted => "transparent",
        PlantStatus::Sick => "#f59e0b",
        PlantStatus::Dead => "#ef4444",
        PlantStatus::Unknown => "#6b7280",
    }
}

pub fn status_opacity(status: PlantStatus) -> f64 {
    if status == PlantStatus::Dead { 0.6 } else { 1.0 }
}

/// Half the (floored) plant width in pixels, rounded half away from zero.
pub fn marker_radius(width_m: f64, scale: Scale) -> f64 {
    (meters_to_pixels(width_m.max(MIN_MARKER_WIDTH_M), scale) / 2.0).round()
}

/// Projects every plant whose variety category is visible.
///
/// Varieties are joined by id; a plant whose variety is missing is treated as
/// [`PlantCategory::Other`] with the default fill.
pub fn project_markers(
    plants: &[Plant],
    varieties: &[Variety],
    visible: &BTreeSet<PlantCategory>,
    scale: Scale,
    show_letters: bool,
) -> Vec<Marker> {
    let by_id: HashMap<Uuid, &Variety> = varieties.iter().map(|v| (v.id, v)).collect();
    plants
        .iter()
        .filter_map(|plant| {
            let variety = by_id.get(&plant.variety_id).copied();
            let category = variety.map_or(PlantCategory::Other, |v| v.category);
            if !visible.contains(&category) {
                return None;
            }
            let fill = variety
                .and_then(|v| v.main_color.clone())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_FILL.to_owned());
            Some(Marker {
                plant_id: plant.id,
                x: plant.x_position.unwrap_or(UNPLACED_POSITION),
                y: plant.y_position.unwrap_or(UNPLACED_POSITION),
                radius: marker_radius(plant.width, scale),
                fill,
                stroke: status_stroke(plant.status),
                stroke_width: STROKE_WIDTH,
                opacity: status_opacity(plant.status),
                category,
                letter: show_letters.then(|| category.letter()),
            })
        })
        .collect()
}

/// Topmost marker under a world-space point. Later markers draw over earlier ones.
pub fn marker_at(markers: &[Marker], world: Point) -> Option<&Marker> {
    markers.iter().rev().find(|m| m.contains(world))
}
