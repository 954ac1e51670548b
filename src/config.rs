// Runtime configuration: compile-time env first, then an optional JSON override in localStorage.
use serde::{Deserialize, Serialize};
use tracing::Level;

pub const DEFAULT_STORAGE_PREFIX: &str = "gp_";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Hosted project id used to build public object URLs. Local data URLs when unset.
    pub project_id: Option<String>,
    /// Prefix for every localStorage key the app owns.
    pub storage_prefix: String,
    /// Height of the top bar subtracted from the window height for the stage.
    pub header_height: f64,
    /// Scale used when a garden has no valid pixels-per-meter value.
    pub default_pixels_per_meter: f64,
    pub log_level: String,
    /// Delay before refitting after a resize or image load, letting layout settle.
    pub refit_delay_ms: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_id: option_env!("GARDEN_PROJECT_ID")
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_owned(),
            header_height: 80.0,
            default_pixels_per_meter: 20.0,
            log_level: option_env!("GARDEN_LOG").unwrap_or("info").to_owned(),
            refit_delay_ms: 100,
        }
    }
}

impl AppConfig {
    /// Applies a JSON override on top of the defaults. Missing fields keep their default.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Loads the config, honouring `{prefix}config` in localStorage when present and valid.
    pub fn load() -> Self {
        let defaults = Self::default();
        let key = format!("{}config", defaults.storage_prefix);
        if let Some(win) = web_sys::window() {
            if let Ok(Some(store)) = win.local_storage() {
                if let Ok(Some(raw)) = store.get_item(&key) {
                    match Self::from_json(&raw) {
                        Ok(cfg) => return cfg,
                        Err(e) => tracing::warn!(error = %e, "ignoring invalid stored config"),
                    }
                }
            }
        }
        defaults
    }

    pub fn level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }

    pub fn storage_key(&self, name: &str) -> String {
        format!("{}{}", self.storage_prefix, name)
    }
}
