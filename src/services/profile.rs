use std::rc::Rc;

use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use super::from_row;
use crate::backend::{AVATARS_BUCKET, Backend, Order, Query};
use crate::error::{Context, Result};
use crate::model::Profile;
use crate::state::Session;

pub const PROFILES_TABLE: &str = "profiles";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileUpdateForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// New avatar as a data URL.
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub is_public: Option<bool>,
}

pub struct ProfileService {
    backend: Rc<dyn Backend>,
}

impl ProfileService {
    pub fn new(backend: Rc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn upload_avatar(&self, data_url: &str, file_name: &str) -> Result<String> {
        self.backend
            .upload(AVATARS_BUCKET, file_name, data_url)
            .context("upload avatar")
    }

    pub fn remove_avatar(&self, path: &str) {
        if let Err(e) = self.backend.remove(AVATARS_BUCKET, &[path.to_owned()]) {
            tracing::warn!(path, error = %e, "failed to remove avatar");
        }
    }

    pub fn avatar_url(&self, path: &str) -> String {
        self.backend.object_url(AVATARS_BUCKET, path)
    }

    /// Stored avatar paths become public URLs on the way out.
    fn hydrate(&self, row: Value) -> Result<Profile> {
        let mut profile: Profile = from_row(row)?;
        profile.avatar_url = profile
            .avatar_url
            .filter(|p| !p.is_empty())
            .map(|p| self.avatar_url(&p));
        Ok(profile)
    }

    pub fn fetch_profile_by_id(&self, id: Uuid) -> Result<Option<Profile>> {
        self.backend
            .select_one(&Query::from(PROFILES_TABLE).eq("id", json!(id)))
            .context("fetch profile")?
            .map(|r| self.hydrate(r))
            .transpose()
    }

    pub fn fetch_my_profile(&self, session: &Session) -> Result<Option<Profile>> {
        let user = session.require_user()?;
        self.fetch_profile_by_id(user)
    }

    /// Public profiles by first name.
    pub fn fetch_public_profiles(&self) -> Result<Vec<Profile>> {
        let q = Query::from(PROFILES_TABLE)
            .eq("is_public", json!(true))
            .order("first_name", Order::Asc);
        self.backend
            .select(&q)
            .context("fetch public profiles")?
            .into_iter()
            .map(|r| self.hydrate(r))
            .collect()
    }

    /// Creates the profile row for a user on first sign-in. Existing rows are returned as is.
    pub fn ensure_profile(&self, session: &Session) -> Result<Profile> {
        let user = session.require_user()?;
        if let Some(existing) = self.fetch_profile_by_id(user)? {
            return Ok(existing);
        }
        let row = self
            .backend
            .insert(PROFILES_TABLE, json!({ "id": user, "is_public": false }))
            .context("create profile")?;
        self.hydrate(row)
    }

    /// Updates the signed-in user's profile, swapping the avatar when a new one is given.
    ///
    /// A freshly uploaded avatar is removed if the update fails; on success the
    /// previous avatar (`current_avatar_path`) is removed.
    pub fn update_profile(
        &self,
        session: &Session,
        form: &ProfileUpdateForm,
        current_avatar_path: Option<&str>,
    ) -> Result<Profile> {
        let user = session.require_user()?;

        let mut uploaded = None;
        if let Some(data_url) = &form.avatar {
            let file_name = format!("{user}_avatar_{}", Utc::now().timestamp_millis());
            uploaded = Some(self.upload_avatar(data_url, &file_name)?);
        }

        let mut patch = json!({
            "first_name": form.first_name,
            "last_name": form.last_name,
            "bio": form.bio,
            "website": form.website,
            "is_public": form.is_public.unwrap_or(false),
        });
        if let Some(path) = &uploaded {
            patch["avatar_url"] = json!(path);
        }

        let row = match self
            .backend
            .update(PROFILES_TABLE, &json!(user), patch)
            .context("update profile")
        {
            Ok(row) => row,
            Err(e) => {
                if let Some(path) = &uploaded {
                    self.remove_avatar(path);
                }
                return Err(e);
            }
        };

        if let (Some(new_path), Some(old_path)) = (&uploaded, current_avatar_path) {
            if new_path != old_path {
                self.remove_avatar(old_path);
            }
        }
        self.hydrate(row)
    }
}
