//! Garden planner: place plants on a scaled garden image, pan and zoom the plan,
//! and keep gardens, plants and varieties in a pluggable backend.

pub mod backend;
pub mod components;
pub mod config;
pub mod error;
pub mod model;
pub mod services;
pub mod state;
pub mod util;
