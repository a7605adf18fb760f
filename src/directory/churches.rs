use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, prelude::Uuid,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::{clean_name, divisions::find_division, plural};
use crate::{
    auth::role::{Actor, Capability},
    entities::{church, division, pastor, prelude::*, registration, user},
    error::ActionError,
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChurchInput {
    #[validate(length(min = 1, max = 150, message = "Church name is required"))]
    pub name: String,
    pub division_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PastorInput {
    #[validate(length(min = 1, max = 100, message = "Pastor name is required"))]
    pub name: String,
    #[validate(length(min = 7, max = 20, message = "Enter a valid phone number"))]
    pub phone: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: Option<String>,
}

impl PastorInput {
    fn normalized(self) -> Self {
        Self {
            name: clean_name(&self.name),
            phone: self.phone.trim().to_string(),
            email: self
                .email
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurchFilter {
    pub division_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurchSummary {
    #[serde(flatten)]
    pub church: church::Model,
    pub division_name: String,
    pub pastor: Option<pastor::Model>,
}

pub async fn list_churches(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: &ChurchFilter,
) -> Result<Vec<ChurchSummary>, ActionError> {
    actor.require(Capability::ManageDirectory)?;

    let mut query = Church::find().order_by_asc(church::Column::Name);
    if let Some(division_id) = filter.division_id {
        query = query.filter(church::Column::DivisionId.eq(division_id));
    }
    let churches = query.find_also_related(Pastor).all(db).await?;

    let divisions: std::collections::HashMap<Uuid, String> = Division::find()
        .all(db)
        .await?
        .into_iter()
        .map(|d: division::Model| (d.id, d.name))
        .collect();

    Ok(churches
        .into_iter()
        .map(|(church, pastor)| ChurchSummary {
            division_name: divisions.get(&church.division_id).cloned().unwrap_or_default(),
            church,
            pastor,
        })
        .collect())
}

pub async fn create_church(
    db: &DatabaseConnection,
    actor: &Actor,
    input: ChurchInput,
) -> Result<church::Model, ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let input = ChurchInput {
        name: clean_name(&input.name),
        division_id: input.division_id,
    };
    input.validate()?;

    find_division(db, input.division_id).await?;
    ensure_name_free(db, &input.name, None).await?;

    let church = church::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name.clone()),
        division_id: Set(input.division_id),
    }
    .insert(db)
    .await
    .map_err(|e| ActionError::from_write(e, || name_taken(&input.name)))?;

    info!(church = %church.id, name = %church.name, "church created");
    Ok(church)
}

pub async fn update_church(
    db: &DatabaseConnection,
    actor: &Actor,
    church_id: Uuid,
    input: ChurchInput,
) -> Result<church::Model, ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let input = ChurchInput {
        name: clean_name(&input.name),
        division_id: input.division_id,
    };
    input.validate()?;

    let church = find_church(db, church_id).await?;
    find_division(db, input.division_id).await?;
    ensure_name_free(db, &input.name, Some(church_id)).await?;

    let mut active = church.into_active_model();
    active.name = Set(input.name.clone());
    active.division_id = Set(input.division_id);
    active
        .update(db)
        .await
        .map_err(|e| ActionError::from_write(e, || name_taken(&input.name)))
}

/// Refused while the church has registrations, presidents or a pastor.
pub async fn delete_church(
    db: &DatabaseConnection,
    actor: &Actor,
    church_id: Uuid,
) -> Result<(), ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let church = find_church(db, church_id).await?;

    let registrations = Registration::find()
        .filter(registration::Column::ChurchId.eq(church.id))
        .count(db)
        .await?;
    let presidents = User::find()
        .filter(user::Column::ChurchId.eq(church.id))
        .count(db)
        .await?;
    let pastors = Pastor::find()
        .filter(pastor::Column::ChurchId.eq(church.id))
        .count(db)
        .await?;

    let mut blockers = Vec::new();
    if registrations > 0 {
        blockers.push(plural(registrations, "registration", "registrations"));
    }
    if presidents > 0 {
        blockers.push(plural(presidents, "president", "presidents"));
    }
    if pastors > 0 {
        blockers.push("an assigned pastor".to_string());
    }
    if !blockers.is_empty() {
        return Err(ActionError::HasDependents(format!(
            "Cannot delete church \"{}\": it still has {}",
            church.name,
            blockers.join(", ")
        )));
    }

    Church::delete_by_id(church.id).exec(db).await?;
    info!(church = %church_id, "church deleted");
    Ok(())
}

pub async fn assign_pastor(
    db: &DatabaseConnection,
    actor: &Actor,
    church_id: Uuid,
    input: PastorInput,
) -> Result<pastor::Model, ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let input = input.normalized();
    input.validate()?;

    let church = find_church(db, church_id).await?;
    let existing = Pastor::find()
        .filter(pastor::Column::ChurchId.eq(church.id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(pastor_taken());
    }

    pastor::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name),
        phone: Set(input.phone),
        email: Set(input.email),
        church_id: Set(church.id),
    }
    .insert(db)
    .await
    .map_err(|e| ActionError::from_write(e, pastor_taken))
}

pub async fn update_pastor(
    db: &DatabaseConnection,
    actor: &Actor,
    pastor_id: Uuid,
    input: PastorInput,
) -> Result<pastor::Model, ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let input = input.normalized();
    input.validate()?;

    let pastor = Pastor::find_by_id(pastor_id)
        .one(db)
        .await?
        .ok_or(ActionError::NotFound("Pastor"))?;
    let mut active = pastor.into_active_model();
    active.name = Set(input.name);
    active.phone = Set(input.phone);
    active.email = Set(input.email);
    Ok(active.update(db).await?)
}

pub async fn remove_pastor(
    db: &DatabaseConnection,
    actor: &Actor,
    pastor_id: Uuid,
) -> Result<(), ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let result = Pastor::delete_by_id(pastor_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(ActionError::NotFound("Pastor"));
    }
    Ok(())
}

pub(crate) async fn find_church<C: sea_orm::ConnectionTrait>(
    conn: &C,
    church_id: Uuid,
) -> Result<church::Model, ActionError> {
    Church::find_by_id(church_id)
        .one(conn)
        .await?
        .ok_or(ActionError::NotFound("Church"))
}

async fn ensure_name_free(
    db: &DatabaseConnection,
    name: &str,
    except: Option<Uuid>,
) -> Result<(), ActionError> {
    let mut query = Church::find().filter(church::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(church::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(name_taken(name));
    }
    Ok(())
}

fn name_taken(name: &str) -> ActionError {
    ActionError::conflict("name", format!("A church named \"{name}\" already exists"))
}

pub(super) fn pastor_taken() -> ActionError {
    ActionError::conflict("churchId", "This church already has a pastor")
}
