use std::collections::BTreeSet;
use std::rc::Rc;

use serde_json::{Value, json};
use uuid::Uuid;

use super::{from_row, from_rows};
use crate::backend::{Backend, Query};
use crate::error::{Context, Result};
use crate::model::{Team, TeamMember};
use crate::services::ProfileService;
use crate::state::Session;

pub const TEAMS_TABLE: &str = "teams";
pub const MEMBERS_TABLE: &str = "teams_members";

pub struct TeamService {
    backend: Rc<dyn Backend>,
}

impl TeamService {
    pub fn new(backend: Rc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn create_team(&self, garden_id: Uuid, name: Option<&str>) -> Result<Team> {
        let row = self
            .backend
            .insert(TEAMS_TABLE, json!({ "garden_id": garden_id, "name": name }))
            .context("create team")?;
        from_row(row)
    }

    pub fn remove_team(&self, team_id: i64) -> Result<()> {
        self.backend
            .delete(TEAMS_TABLE, &json!(team_id))
            .context("remove team")
    }

    pub fn add_team_member(&self, team_id: i64, user_id: Uuid, role: Option<&str>) -> Result<TeamMember> {
        let row = self
            .backend
            .insert(
                MEMBERS_TABLE,
                json!({ "team_id": team_id, "user_id": user_id, "role": role }),
            )
            .context("add team member")?;
        from_row(row)
    }

    pub fn remove_team_member(&self, member_id: i64) -> Result<()> {
        self.backend
            .delete(MEMBERS_TABLE, &json!(member_id))
            .context("remove team member")
    }

    pub fn fetch_team_members(&self, team_id: i64) -> Result<Vec<TeamMember>> {
        let rows = self
            .backend
            .select(&Query::from(MEMBERS_TABLE).eq("team_id", json!(team_id)))
            .context("fetch team members")?;
        from_rows(rows)
    }

    /// Teams of a garden with their members and the members' profiles.
    pub fn fetch_teams_by_garden(&self, garden_id: Uuid) -> Result<Vec<Team>> {
        let rows = self
            .backend
            .select(&Query::from(TEAMS_TABLE).eq("garden_id", json!(garden_id)))
            .context("fetch teams")?;
        let mut teams: Vec<Team> = from_rows(rows)?;
        let profiles = ProfileService::new(self.backend.clone());
        for team in &mut teams {
            let mut members = self.fetch_team_members(team.id)?;
            for m in &mut members {
                m.profile = profiles.fetch_profile_by_id(m.user_id).context("fetch teams")?;
            }
            team.members = members;
        }
        Ok(teams)
    }

    /// Teams the user belongs to.
    pub fn fetch_teams_by_user(&self, user_id: Uuid) -> Result<Vec<Team>> {
        let memberships = self
            .backend
            .select(&Query::from(MEMBERS_TABLE).eq("user_id", json!(user_id)))
            .context("fetch user teams")?;
        let team_ids: BTreeSet<i64> = memberships
            .iter()
            .filter_map(|m| m.get("team_id").and_then(Value::as_i64))
            .collect();
        let mut teams = Vec::with_capacity(team_ids.len());
        for id in team_ids {
            if let Some(row) = self
                .backend
                .select_one(&Query::from(TEAMS_TABLE).eq("id", json!(id)))
                .context("fetch user teams")?
            {
                teams.push(from_row(row)?);
            }
        }
        Ok(teams)
    }

    /// Removes every team of a garden along with its memberships.
    pub fn remove_garden_teams(&self, garden_id: Uuid) -> Result<()> {
        let teams: Vec<Team> = from_rows(
            self.backend
                .select(&Query::from(TEAMS_TABLE).eq("garden_id", json!(garden_id)))
                .context("fetch teams")?,
        )?;
        for team in teams {
            for m in self.fetch_team_members(team.id)? {
                self.remove_team_member(m.id)?;
            }
            self.remove_team(team.id)?;
        }
        Ok(())
    }

    /// Whether the signed-in user holds the owner role in any team of the garden.
    pub fn is_owner(&self, session: &Session, garden_id: Uuid) -> Result<bool> {
        let Some(user) = &session.user else {
            return Ok(false);
        };
        let teams = self
            .backend
            .select(&Query::from(TEAMS_TABLE).eq("garden_id", json!(garden_id)))
            .context("determine ownership")?;
        for team in teams {
            let Some(team_id) = team.get("id").and_then(Value::as_i64) else {
                continue;
            };
            let members = self.fetch_team_members(team_id)?;
            if members.iter().any(|m| m.user_id == user.id && m.is_owner()) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AVATARS_BUCKET;
    use crate::model::OWNER_ROLE;
    use crate::services::ProfileUpdateForm;
    use crate::services::profile::PROFILES_TABLE;
    use crate::services::testing::{backend, session};

    #[test]
    fn owner_role_grants_ownership() {
        let db = backend();
        let svc = TeamService::new(db.clone());
        let garden = Uuid::new_v4();
        let owner = session();
        let member = session();
        let team = svc.create_team(garden, Some("Family")).unwrap();
        svc.add_team_member(team.id, owner.require_user().unwrap(), Some(OWNER_ROLE)).unwrap();
        svc.add_team_member(team.id, member.require_user().unwrap(), Some("member")).unwrap();

        assert!(svc.is_owner(&owner, garden).unwrap());
        assert!(!svc.is_owner(&member, garden).unwrap());
        assert!(!svc.is_owner(&owner, Uuid::new_v4()).unwrap());
        assert!(!svc.is_owner(&Session::anonymous(), garden).unwrap());
    }

    #[test]
    fn garden_teams_join_members_and_profiles() {
        let db = backend();
        let svc = TeamService::new(db.clone());
        let profiles = ProfileService::new(db.clone());
        let garden = Uuid::new_v4();
        let s = session();
        profiles.ensure_profile(&s).unwrap();
        let team = svc.create_team(garden, None).unwrap();
        let m = svc.add_team_member(team.id, s.require_user().unwrap(), Some(OWNER_ROLE)).unwrap();

        let teams = svc.fetch_teams_by_garden(garden).unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].members.len(), 1);
        assert!(teams[0].members[0].profile.is_some());

        let mine = svc.fetch_teams_by_user(s.require_user().unwrap()).unwrap();
        assert_eq!(mine.iter().map(|t| t.id).collect::<Vec<_>>(), vec![team.id]);

        svc.remove_team_member(m.id).unwrap();
        assert!(svc.fetch_team_members(team.id).unwrap().is_empty());
        svc.remove_team(team.id).unwrap();
        assert!(svc.fetch_teams_by_garden(garden).unwrap().is_empty());
    }

    #[test]
    fn member_without_avatar_has_no_avatar_url() {
        let db = backend();
        let svc = TeamService::new(db.clone());
        let profiles = ProfileService::new(db.clone());
        let garden = Uuid::new_v4();
        let s = session();
        let user = s.require_user().unwrap();
        profiles.ensure_profile(&s).unwrap();
        db.update(PROFILES_TABLE, &json!(user), json!({ "avatar_url": "" })).unwrap();
        let team = svc.create_team(garden, None).unwrap();
        svc.add_team_member(team.id, user, None).unwrap();

        let teams = svc.fetch_teams_by_garden(garden).unwrap();
        let profile = teams[0].members[0].profile.as_ref().unwrap();
        assert_eq!(profile.avatar_url, None);

        let form = ProfileUpdateForm {
            avatar: Some("data:,me".into()),
            ..ProfileUpdateForm::default()
        };
        profiles.update_profile(&s, &form, None).unwrap();
        let teams = svc.fetch_teams_by_garden(garden).unwrap();
        let url = teams[0].members[0].profile.as_ref().unwrap().avatar_url.clone().unwrap();
        assert!(url.starts_with(&format!("memory://{AVATARS_BUCKET}/")));
    }

    #[test]
    fn garden_teams_are_removed_with_members() {
        let db = backend();
        let svc = TeamService::new(db.clone());
        let garden = Uuid::new_v4();
        let other = Uuid::new_v4();
        let s = session();
        let user = s.require_user().unwrap();
        let doomed = svc.create_team(garden, Some("A")).unwrap();
        svc.add_team_member(doomed.id, user, Some(OWNER_ROLE)).unwrap();
        let kept = svc.create_team(other, Some("B")).unwrap();
        svc.add_team_member(kept.id, user, Some(OWNER_ROLE)).unwrap();

        svc.remove_garden_teams(garden).unwrap();
        assert!(svc.fetch_teams_by_garden(garden).unwrap().is_empty());
        assert!(svc.fetch_team_members(doomed.id).unwrap().is_empty());
        assert_eq!(svc.fetch_team_members(kept.id).unwrap().len(), 1);
        assert!(svc.is_owner(&s, other).unwrap());
    }
}
