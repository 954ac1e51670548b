use std::rc::Rc;

use chrono::Utc;
use serde_json::json;

use super::from_row;
use crate::backend::{Backend, Query};
use crate::error::{Context, Result};
use crate::model::Settings;
use crate::state::Session;

pub const SETTINGS_TABLE: &str = "settings";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettingsUpdateForm {
    pub show_markers_letters: Option<bool>,
    pub default_color_theme: Option<String>,
    pub language: Option<String>,
    pub preferred_units: Option<String>,
    pub timezone: Option<String>,
}

impl From<&Settings> for SettingsUpdateForm {
    fn from(s: &Settings) -> Self {
        Self {
            show_markers_letters: s.show_markers_letters,
            default_color_theme: s.default_color_theme.clone(),
            language: s.language.clone(),
            preferred_units: s.preferred_units.clone(),
            timezone: s.timezone.clone(),
        }
    }
}

pub struct SettingsService {
    backend: Rc<dyn Backend>,
}

impl SettingsService {
    pub fn new(backend: Rc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn fetch_my_settings(&self, session: &Session) -> Result<Option<Settings>> {
        let user = session.require_user()?;
        self.backend
            .select_one(&Query::from(SETTINGS_TABLE).eq("id", json!(user)))
            .context("fetch settings")?
            .map(from_row)
            .transpose()
    }

    /// Creates the settings row for a user on first sign-in. Existing rows are returned as is.
    pub fn ensure_settings(&self, session: &Session) -> Result<Settings> {
        if let Some(existing) = self.fetch_my_settings(session)? {
            return Ok(existing);
        }
        let user = session.require_user()?;
        let row = self
            .backend
            .insert(SETTINGS_TABLE, json!({ "id": user }))
            .context("create settings")?;
        from_row(row)
    }

    /// Writes every field; unset ones are stored as null.
    pub fn update_settings(&self, session: &Session, form: &SettingsUpdateForm) -> Result<Settings> {
        let user = session.require_user()?;
        let patch = json!({
            "show_markers_letters": form.show_markers_letters,
            "default_color_theme": form.default_color_theme,
            "language": form.language,
            "preferred_units": form.preferred_units,
            "timezone": form.timezone,
            "updated_at": Utc::now(),
        });
        let row = self
            .backend
            .update(SETTINGS_TABLE, &json!(user), patch)
            .context("update settings")?;
        from_row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColorTheme;
    use crate::services::testing::{backend, session};

    #[test]
    fn update_nulls_unset_fields() {
        let svc = SettingsService::new(backend());
        let s = session();
        assert_eq!(svc.fetch_my_settings(&s).unwrap(), None);
        svc.ensure_settings(&s).unwrap();

        let form = SettingsUpdateForm {
            show_markers_letters: Some(true),
            default_color_theme: Some("light".into()),
            language: Some("fr".into()),
            ..SettingsUpdateForm::default()
        };
        let saved = svc.update_settings(&s, &form).unwrap();
        assert!(saved.show_letters());
        assert_eq!(saved.color_theme(), Some(ColorTheme::Light));
        assert!(saved.updated_at.is_some());

        let form = SettingsUpdateForm {
            show_markers_letters: Some(false),
            ..SettingsUpdateForm::default()
        };
        let saved = svc.update_settings(&s, &form).unwrap();
        assert_eq!(saved.language, None);
        assert_eq!(saved.default_color_theme, None);
        assert_eq!(svc.fetch_my_settings(&s).unwrap(), Some(saved));
    }

    #[test]
    fn ensure_is_idempotent() {
        let svc = SettingsService::new(backend());
        let s = session();
        let a = svc.ensure_settings(&s).unwrap();
        let b = svc.ensure_settings(&s).unwrap();
        assert_eq!(a, b);
    }
}
