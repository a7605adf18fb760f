use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::Uuid,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::{clean_name, plural};
use crate::{
    auth::role::{Actor, Capability},
    entities::{church, coordinator, division, prelude::*},
    error::ActionError,
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DivisionInput {
    #[validate(length(min = 1, max = 100, message = "Division name is required"))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorInput {
    #[validate(length(min = 1, max = 100, message = "Coordinator name is required"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionSummary {
    #[serde(flatten)]
    pub division: division::Model,
    pub church_count: u64,
    pub coordinator: Option<coordinator::Model>,
}

pub async fn list_divisions(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<DivisionSummary>, ActionError> {
    actor.require(Capability::ManageDirectory)?;

    let divisions = Division::find()
        .order_by_asc(division::Column::Name)
        .find_also_related(Coordinator)
        .all(db)
        .await?;

    let mut summaries = Vec::with_capacity(divisions.len());
    for (division, coordinator) in divisions {
        let church_count = Church::find()
            .filter(church::Column::DivisionId.eq(division.id))
            .count(db)
            .await?;
        summaries.push(DivisionSummary {
            division,
            church_count,
            coordinator,
        });
    }
    Ok(summaries)
}

pub async fn create_division(
    db: &DatabaseConnection,
    actor: &Actor,
    input: DivisionInput,
) -> Result<division::Model, ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let name = clean_name(&input.name);
    DivisionInput { name: name.clone() }.validate()?;
    ensure_name_free(db, &name, None).await?;

    let division = division::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.clone()),
    }
    .insert(db)
    .await
    .map_err(|e| ActionError::from_write(e, || name_taken(&name)))?;

    info!(division = %division.id, name = %division.name, "division created");
    Ok(division)
}

pub async fn rename_division(
    db: &DatabaseConnection,
    actor: &Actor,
    division_id: Uuid,
    input: DivisionInput,
) -> Result<division::Model, ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let name = clean_name(&input.name);
    DivisionInput { name: name.clone() }.validate()?;

    let division = find_division(db, division_id).await?;
    ensure_name_free(db, &name, Some(division_id)).await?;

    let mut active = division.into_active_model();
    active.name = Set(name.clone());
    active
        .update(db)
        .await
        .map_err(|e| ActionError::from_write(e, || name_taken(&name)))
}

/// Refused while churches still belong to the division. Its coordinator goes
/// with it.
pub async fn delete_division(
    db: &DatabaseConnection,
    actor: &Actor,
    division_id: Uuid,
) -> Result<(), ActionError> {
    actor.require(Capability::ManageDirectory)?;

    let txn = db.begin().await?;
    let division = find_division(&txn, division_id).await?;

    let churches = Church::find()
        .filter(church::Column::DivisionId.eq(division.id))
        .count(&txn)
        .await?;
    if churches > 0 {
        return Err(ActionError::HasDependents(format!(
            "Cannot delete division \"{}\": it still has {}",
            division.name,
            plural(churches, "church", "churches")
        )));
    }

    Coordinator::delete_many()
        .filter(coordinator::Column::DivisionId.eq(division.id))
        .exec(&txn)
        .await?;
    Division::delete_by_id(division.id).exec(&txn).await?;
    txn.commit().await?;

    info!(division = %division_id, "division deleted");
    Ok(())
}

pub async fn assign_coordinator(
    db: &DatabaseConnection,
    actor: &Actor,
    division_id: Uuid,
    input: CoordinatorInput,
) -> Result<coordinator::Model, ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let name = clean_name(&input.name);
    CoordinatorInput { name: name.clone() }.validate()?;

    let division = find_division(db, division_id).await?;
    let existing = Coordinator::find()
        .filter(coordinator::Column::DivisionId.eq(division.id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(coordinator_taken());
    }

    coordinator::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        division_id: Set(division.id),
    }
    .insert(db)
    .await
    .map_err(|e| ActionError::from_write(e, coordinator_taken))
}

pub async fn update_coordinator(
    db: &DatabaseConnection,
    actor: &Actor,
    coordinator_id: Uuid,
    input: CoordinatorInput,
) -> Result<coordinator::Model, ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let name = clean_name(&input.name);
    CoordinatorInput { name: name.clone() }.validate()?;

    let coordinator = Coordinator::find_by_id(coordinator_id)
        .one(db)
        .await?
        .ok_or(ActionError::NotFound("Coordinator"))?;
    let mut active = coordinator.into_active_model();
    active.name = Set(name);
    Ok(active.update(db).await?)
}

pub async fn remove_coordinator(
    db: &DatabaseConnection,
    actor: &Actor,
    coordinator_id: Uuid,
) -> Result<(), ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let result = Coordinator::delete_by_id(coordinator_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(ActionError::NotFound("Coordinator"));
    }
    Ok(())
}

pub(crate) async fn find_division<C: sea_orm::ConnectionTrait>(
    conn: &C,
    division_id: Uuid,
) -> Result<division::Model, ActionError> {
    Division::find_by_id(division_id)
        .one(conn)
        .await?
        .ok_or(ActionError::NotFound("Division"))
}

async fn ensure_name_free(
    db: &DatabaseConnection,
    name: &str,
    except: Option<Uuid>,
) -> Result<(), ActionError> {
    let mut query = Division::find().filter(division::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(division::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(name_taken(name));
    }
    Ok(())
}

fn name_taken(name: &str) -> ActionError {
    ActionError::conflict("name", format!("A division named \"{name}\" already exists"))
}

pub(super) fn coordinator_taken() -> ActionError {
    ActionError::conflict("divisionId", "This division already has a coordinator")
}
