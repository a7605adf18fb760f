use sea_orm::prelude::Uuid;
use serde::Serialize;

use crate::{
    entities::{sea_orm_active_enums::Role, user},
    error::ActionError,
};

use super::user::AuthSession;

/// Everything a protected operation may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Divisions, churches, pastors, coordinators and events.
    ManageDirectory,
    ManageUsers,
    ReviewBatches,
    ExportReports,
    SubmitRegistration,
    CompleteProfile,
    UseExtraction,
    UploadFiles,
}

impl Role {
    pub fn allows(self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Admin => !matches!(capability, CompleteProfile),
            Role::President => matches!(
                capability,
                SubmitRegistration | CompleteProfile | UseExtraction | UploadFiles
            ),
            Role::User => matches!(capability, CompleteProfile),
        }
    }
}

/// The signed-in user as seen by the action layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
    pub church_id: Option<Uuid>,
}

impl From<&user::Model> for Actor {
    fn from(user: &user::Model) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            church_id: user.church_id,
        }
    }
}

impl Actor {
    /// The single gate every protected operation goes through.
    pub fn require(&self, capability: Capability) -> Result<(), ActionError> {
        if self.role.allows(capability) {
            Ok(())
        } else {
            tracing::debug!(user = %self.user_id, ?capability, "capability denied");
            Err(ActionError::Unauthorized)
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins act for any church; presidents only for their own.
    pub fn require_church(&self, church_id: Uuid) -> Result<(), ActionError> {
        if self.is_admin() || self.church_id == Some(church_id) {
            Ok(())
        } else {
            Err(ActionError::Unauthorized)
        }
    }
}

/// Resolves the session user and checks `capability` before any data access.
pub fn require(auth_session: &AuthSession, capability: Capability) -> Result<Actor, ActionError> {
    let user = auth_session
        .user
        .as_ref()
        .ok_or(ActionError::Unauthenticated)?;
    let actor = Actor::from(user);
    actor.require(capability)?;
    Ok(actor)
}
