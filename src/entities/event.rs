use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::EventStatus;

/// An event churches register delegates for.
///
/// All amounts are whole currency units.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub location: String,
    pub banner_url: Option<String>,
    pub banner_path: Option<String>,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub pre_registration_start: DateTime,
    /// Batches created before this instant are billed at pre-registration rates.
    pub pre_registration_end: DateTime,
    pub pre_registration_fee: i64,
    pub pre_registration_sibling_discount: i64,
    pub onsite_registration_fee: i64,
    pub onsite_sibling_discount: i64,
    pub cook_registration_fee: i64,
    pub status: EventStatus,
    pub created_at: DateTime,
}

impl Model {
    /// Registrations close when the event starts.
    pub fn registration_deadline(&self) -> DateTime {
        self.start_date
    }

    /// Whether batches may be created or edited at `now`.
    pub fn accepts_registrations(&self, now: DateTime) -> bool {
        matches!(self.status, EventStatus::Upcoming | EventStatus::Ongoing)
            && now < self.registration_deadline()
    }

    pub fn is_pre_registration(&self, now: DateTime) -> bool {
        now < self.pre_registration_end
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::registration::Entity")]
    Registration,
}

impl Related<super::registration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Registration.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
