use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait, prelude::Uuid,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::{churches::find_church, clean_name};
use crate::{
    auth::role::{Actor, Capability},
    entities::{church, prelude::*, sea_orm_active_enums::Role, user},
    error::ActionError,
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    #[validate(length(min = 1, max = 100, message = "Your name is required"))]
    pub name: String,
    pub church_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInput {
    pub role: Role,
    /// Required when promoting to president unless the user already has a church.
    pub church_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: user::Model,
    pub church_name: Option<String>,
}

/// A fresh session fingerprint. Changing it signs the user out everywhere.
pub fn new_auth_hash() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A signed-in user picks their church and becomes its president. Presidents
/// may call it again to update their name.
pub async fn complete_profile(
    db: &DatabaseConnection,
    actor: &Actor,
    input: ProfileInput,
) -> Result<user::Model, ActionError> {
    actor.require(Capability::CompleteProfile)?;
    let input = ProfileInput {
        name: clean_name(&input.name),
        church_id: input.church_id,
    };
    input.validate()?;
    if actor.church_id.is_some_and(|current| current != input.church_id) {
        return Err(ActionError::conflict(
            "churchId",
            "Your church is already set; ask an administrator to move you",
        ));
    }

    let txn = db.begin().await?;
    let church = find_church(&txn, input.church_id).await?;
    ensure_no_president(&txn, church.id, actor.user_id).await?;

    let user = find_user(&txn, actor.user_id).await?;
    let mut active = user.into_active_model();
    active.name = Set(input.name);
    active.church_id = Set(Some(church.id));
    active.role = Set(Role::President);
    active.auth_hash = Set(new_auth_hash());
    let user = active.update(&txn).await?;
    txn.commit().await?;

    info!(user = %user.id, church = %church.id, "profile completed");
    Ok(user)
}

/// Admin-only role change. Presidents keep exactly one church; every other
/// role is detached from churches.
pub async fn set_role(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: Uuid,
    input: RoleInput,
) -> Result<user::Model, ActionError> {
    actor.require(Capability::ManageUsers)?;
    if user_id == actor.user_id {
        return Err(ActionError::field("role", "You cannot change your own role"));
    }

    let txn = db.begin().await?;
    let user = find_user(&txn, user_id).await?;
    let previous = user.role;

    let church_id = match input.role {
        Role::President => {
            let church_id = input.church_id.or(user.church_id).ok_or_else(|| {
                ActionError::field("churchId", "A president must belong to a church")
            })?;
            find_church(&txn, church_id).await?;
            ensure_no_president(&txn, church_id, user.id).await?;
            Some(church_id)
        }
        Role::Admin | Role::User => None,
    };

    let mut active = user.into_active_model();
    active.role = Set(input.role);
    active.church_id = Set(church_id);
    active.auth_hash = Set(new_auth_hash());
    let user = active.update(&txn).await?;
    txn.commit().await?;

    info!(user = %user.id, ?previous, role = ?user.role, "role changed");
    Ok(user)
}

pub async fn list_users(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: &UserFilter,
) -> Result<Vec<UserSummary>, ActionError> {
    actor.require(Capability::ManageUsers)?;

    let mut query = User::find().order_by_asc(user::Column::Email);
    if let Some(role) = filter.role {
        query = query.filter(user::Column::Role.eq(role));
    }
    let users = query.all(db).await?;

    let churches: HashMap<Uuid, String> = Church::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c: church::Model| (c.id, c.name))
        .collect();

    Ok(users
        .into_iter()
        .map(|user| UserSummary {
            church_name: user.church_id.and_then(|id| churches.get(&id).cloned()),
            user,
        })
        .collect())
}

async fn find_user<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<user::Model, ActionError> {
    User::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or(ActionError::NotFound("User"))
}

async fn ensure_no_president<C: ConnectionTrait>(
    conn: &C,
    church_id: Uuid,
    except: Uuid,
) -> Result<(), ActionError> {
    let existing = User::find()
        .filter(user::Column::ChurchId.eq(church_id))
        .filter(user::Column::Role.eq(Role::President))
        .filter(user::Column::Id.ne(except))
        .one(conn)
        .await?;
    if existing.is_some() {
        return Err(ActionError::conflict(
            "churchId",
            "This church already has a president",
        ));
    }
    Ok(())
}
