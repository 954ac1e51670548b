pub mod app;
pub mod category_filter;
pub mod garden_canvas;
pub mod garden_form;
pub mod plant_info_panel;
pub mod plant_toolbar;
pub mod settings_modal;
pub mod zoom_controls;

pub use app::{App, SessionContext};
