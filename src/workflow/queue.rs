use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ItemsAndPagesNumber,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
    prelude::{DateTime, Uuid},
};
use serde::{Deserialize, Serialize};

use super::{
    fee::{FeeSchedule, HeadCount, fee_type},
    registration::attendees_by_batch,
};
use crate::{
    auth::role::{Actor, Capability},
    entities::{
        attendee, batch, church, division, event, prelude::*, registration,
        sea_orm_active_enums::ReviewStatus,
    },
    error::ActionError,
};

pub const PAGE_SIZES: [u64; 4] = [10, 20, 50, 100];
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Narrows the review queue and the CSV export.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueFilter {
    pub event_id: Option<Uuid>,
    pub division_id: Option<Uuid>,
    pub status: Option<ReviewStatus>,
    pub date_from: Option<DateTime>,
    pub date_to: Option<DateTime>,
}

impl QueueFilter {
    pub fn validate(&self) -> Result<(), ActionError> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(ActionError::InvalidFilter(
                    "dateFrom must not be after dateTo".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Query-string shape of the review queue.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub event_id: Option<Uuid>,
    pub division_id: Option<Uuid>,
    pub status: Option<ReviewStatus>,
    pub date_from: Option<DateTime>,
    pub date_to: Option<DateTime>,
}

impl QueueQuery {
    pub fn filter(&self) -> QueueFilter {
        QueueFilter {
            event_id: self.event_id,
            division_id: self.division_id,
            status: self.status,
            date_from: self.date_from,
            date_to: self.date_to,
        }
    }

    /// Returns `(page, page_size)` after bounds checks.
    pub fn paging(&self) -> Result<(u64, u64), ActionError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(ActionError::InvalidFilter("page starts at 1".to_string()));
        }
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !PAGE_SIZES.contains(&page_size) {
            return Err(ActionError::InvalidFilter(format!(
                "pageSize must be one of {PAGE_SIZES:?}"
            )));
        }
        Ok((page, page_size))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub batch_id: Uuid,
    pub batch_number: i32,
    pub status: ReviewStatus,
    pub is_pre_registration: bool,
    pub fee_type: &'static str,
    pub receipt_url: Option<String>,
    pub created_at: DateTime,
    pub reviewed_at: Option<DateTime>,
    pub rejection_remarks: Option<String>,
    pub registration_id: Uuid,
    pub registration_status: ReviewStatus,
    pub event_id: Uuid,
    pub event_name: String,
    pub church_id: Uuid,
    pub church_name: String,
    pub division_id: Uuid,
    pub division_name: String,
    pub head_count: HeadCount,
    pub people: u32,
    pub fee: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePage {
    pub items: Vec<QueueItem>,
    pub total: u64,
    pub total_pages: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Everything known about one batch, loaded in bulk for a page or an export.
#[derive(Debug, Clone)]
pub(crate) struct BatchContext {
    pub batch: batch::Model,
    pub registration: registration::Model,
    pub event: event::Model,
    pub church: church::Model,
    pub division: division::Model,
    pub attendees: Vec<attendee::Model>,
}

impl BatchContext {
    pub fn schedule(&self) -> FeeSchedule {
        FeeSchedule::for_event(&self.event, self.batch.is_pre_registration)
    }

    fn into_item(self) -> Result<QueueItem, ActionError> {
        let head_count = HeadCount::from_attendees(&self.attendees);
        let fee = self.schedule().total(head_count)?;
        Ok(QueueItem {
            batch_id: self.batch.id,
            batch_number: self.batch.batch_number,
            status: self.batch.status,
            is_pre_registration: self.batch.is_pre_registration,
            fee_type: fee_type(self.batch.is_pre_registration),
            receipt_url: self.batch.receipt_url,
            created_at: self.batch.created_at,
            reviewed_at: self.batch.reviewed_at,
            rejection_remarks: self.batch.rejection_remarks,
            registration_id: self.registration.id,
            registration_status: self.registration.status,
            event_id: self.event.id,
            event_name: self.event.name,
            church_id: self.church.id,
            church_name: self.church.name,
            division_id: self.division.id,
            division_name: self.division.name,
            people: head_count.total(),
            head_count,
            fee,
        })
    }
}

/// Batches across all churches, oldest first. Ties on `created_at` are broken
/// by id so that walking the pages visits every batch exactly once.
pub async fn review_queue(
    db: &DatabaseConnection,
    actor: &Actor,
    query: &QueueQuery,
) -> Result<QueuePage, ActionError> {
    actor.require(Capability::ReviewBatches)?;
    let (page, page_size) = query.paging()?;
    let filter = query.filter();
    filter.validate()?;

    let paginator = ordered(filtered_batches(&filter)).paginate(db, page_size);
    let ItemsAndPagesNumber {
        number_of_items,
        number_of_pages,
    } = paginator.num_items_and_pages().await?;
    let batches = paginator.fetch_page(page - 1).await?;

    let items = load_contexts(db, batches)
        .await?
        .into_iter()
        .map(BatchContext::into_item)
        .collect::<Result<_, _>>()?;

    Ok(QueuePage {
        items,
        total: number_of_items,
        total_pages: number_of_pages,
        page,
        page_size,
    })
}

pub(crate) fn filtered_batches(filter: &QueueFilter) -> Select<batch::Entity> {
    let mut query = Batch::find()
        .join(JoinType::InnerJoin, batch::Relation::Registration.def())
        .join(JoinType::InnerJoin, registration::Relation::Church.def());

    if let Some(event_id) = filter.event_id {
        query = query.filter(registration::Column::EventId.eq(event_id));
    }
    if let Some(division_id) = filter.division_id {
        query = query.filter(church::Column::DivisionId.eq(division_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(batch::Column::Status.eq(status));
    }
    if let Some(from) = filter.date_from {
        query = query.filter(batch::Column::CreatedAt.gte(from));
    }
    if let Some(to) = filter.date_to {
        query = query.filter(batch::Column::CreatedAt.lte(to));
    }
    query
}

pub(crate) fn ordered(query: Select<batch::Entity>) -> Select<batch::Entity> {
    query
        .order_by_asc(batch::Column::CreatedAt)
        .order_by_asc(batch::Column::Id)
}

/// Loads the related rows for `batches` with one query per table, keeping the
/// input order.
pub(crate) async fn load_contexts<C: ConnectionTrait>(
    conn: &C,
    batches: Vec<batch::Model>,
) -> Result<Vec<BatchContext>, ActionError> {
    if batches.is_empty() {
        return Ok(Vec::new());
    }

    let registrations: HashMap<Uuid, registration::Model> = Registration::find()
        .filter(registration::Column::Id.is_in(unique(batches.iter().map(|b| b.registration_id))))
        .all(conn)
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

    let events: HashMap<Uuid, event::Model> = Event::find()
        .filter(event::Column::Id.is_in(unique(registrations.values().map(|r| r.event_id))))
        .all(conn)
        .await?
        .into_iter()
        .map(|e| (e.id, e))
        .collect();

    let churches: HashMap<Uuid, church::Model> = Church::find()
        .filter(church::Column::Id.is_in(unique(registrations.values().map(|r| r.church_id))))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let divisions: HashMap<Uuid, division::Model> = Division::find()
        .filter(division::Column::Id.is_in(unique(churches.values().map(|c| c.division_id))))
        .all(conn)
        .await?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();

    let mut attendees = attendees_by_batch(conn, batches.iter().map(|b| b.id).collect()).await?;

    let mut contexts = Vec::with_capacity(batches.len());
    for batch in batches {
        let registration = registrations
            .get(&batch.registration_id)
            .cloned()
            .ok_or(ActionError::RegistrationNotFound)?;
        let event = events
            .get(&registration.event_id)
            .cloned()
            .ok_or(ActionError::NotFound("Event"))?;
        let church = churches
            .get(&registration.church_id)
            .cloned()
            .ok_or(ActionError::NotFound("Church"))?;
        let division = divisions
            .get(&church.division_id)
            .cloned()
            .ok_or(ActionError::NotFound("Division"))?;
        let people = attendees.remove(&batch.id).unwrap_or_default();

        contexts.push(BatchContext {
            batch,
            registration,
            event,
            church,
            division,
            attendees: people,
        });
    }
    Ok(contexts)
}

fn unique(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.collect();
    ids.sort();
    ids.dedup();
    ids
}
