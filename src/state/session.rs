// Current identity, passed explicitly to services and through context to components.
use std::rc::Rc;

use uuid::Uuid;
use yew::Reducible;

use crate::error::{GardenError, Result};
use crate::model::User;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// The signed-in user id, or `NotAuthenticated`.
    pub fn require_user(&self) -> Result<Uuid> {
        self.user
            .as_ref()
            .map(|u| u.id)
            .ok_or(GardenError::NotAuthenticated)
    }
}

pub enum SessionAction {
    SignedIn(User),
    SignedOut,
}

impl Reducible for Session {
    type Action = SessionAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        match action {
            SessionAction::SignedIn(user) => {
                tracing::info!(user = %user.id, "session started");
                Rc::new(Session::signed_in(user))
            }
            SessionAction::SignedOut => Rc::new(Session::anonymous()),
        }
    }
}
