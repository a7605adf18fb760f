//! Fixtures shared by the database-backed tests.

use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, Database, DatabaseConnection,
    prelude::{DateTime, Uuid},
};

use crate::{
    auth::role::Actor,
    entities::{
        church, division, event,
        sea_orm_active_enums::{EventStatus, Gender, PersonType, Role},
        user,
    },
    workflow::payload::{AttendeeInput, BatchPayload},
};

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    Migrator::up(&db, None).await.expect("migrations apply");
    db
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid timestamp")
}

pub async fn seed_division(db: &DatabaseConnection, name: &str) -> division::Model {
    division::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
    }
    .insert(db)
    .await
    .expect("insert division")
}

pub async fn seed_church(
    db: &DatabaseConnection,
    name: &str,
    division_id: Uuid,
) -> church::Model {
    church::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        division_id: Set(division_id),
    }
    .insert(db)
    .await
    .expect("insert church")
}

pub async fn seed_user(
    db: &DatabaseConnection,
    email: &str,
    role: Role,
    church_id: Option<Uuid>,
) -> user::Model {
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(email.split('@').next().unwrap_or(email).to_string()),
        email: Set(email.to_string()),
        role: Set(role),
        church_id: Set(church_id),
        auth_hash: Set(Uuid::new_v4().simple().to_string()),
        created_at: Set(at(2025, 1, 1, 0)),
    }
    .insert(db)
    .await
    .expect("insert user")
}

/// Youth Camp 2025: starts 2025-07-01, pre-registration until 2025-05-31.
pub async fn seed_event(db: &DatabaseConnection, name: &str) -> event::Model {
    event::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(None),
        location: Set("Camp Zion".to_string()),
        banner_url: Set(None),
        banner_path: Set(None),
        start_date: Set(at(2025, 7, 1, 8)),
        end_date: Set(at(2025, 7, 4, 17)),
        pre_registration_start: Set(at(2025, 3, 1, 0)),
        pre_registration_end: Set(at(2025, 5, 31, 23)),
        pre_registration_fee: Set(150),
        pre_registration_sibling_discount: Set(30),
        onsite_registration_fee: Set(200),
        onsite_sibling_discount: Set(20),
        cook_registration_fee: Set(50),
        status: Set(EventStatus::Upcoming),
        created_at: Set(at(2025, 2, 1, 0)),
    }
    .insert(db)
    .await
    .expect("insert event")
}

pub fn person(name: &str, age: i32, person_type: PersonType) -> AttendeeInput {
    AttendeeInput {
        full_name: name.to_string(),
        nickname: None,
        age,
        gender: if age % 2 == 0 { Gender::Female } else { Gender::Male },
        person_type,
    }
}

pub fn payload(attendees: Vec<AttendeeInput>) -> BatchPayload {
    BatchPayload {
        attendees,
        receipt_url: None,
        receipt_path: None,
    }
}

/// Four delegates, one sibling and one cook.
pub fn grace_chapel_batch() -> BatchPayload {
    payload(vec![
        person("Ana Reyes", 16, PersonType::Delegate),
        person("Ben Cruz", 17, PersonType::Delegate),
        person("Carla Dizon", 15, PersonType::Delegate),
        person("Dan Lopez", 18, PersonType::Delegate),
        person("Eli Lopez", 12, PersonType::Sibling),
        person("Fe Santos", 45, PersonType::Cook),
    ])
}

/// One division, one church with its president, an admin and an open event.
pub struct World {
    pub db: DatabaseConnection,
    pub division: division::Model,
    pub church: church::Model,
    pub event: event::Model,
    pub admin: Actor,
    pub president: Actor,
}

impl World {
    pub async fn new() -> Self {
        let db = setup_db().await;
        let division = seed_division(&db, "North District").await;
        let church = seed_church(&db, "Grace Chapel", division.id).await;
        let event = seed_event(&db, "Youth Camp 2025").await;
        let admin = seed_user(&db, "admin@example.org", Role::Admin, None).await;
        let president =
            seed_user(&db, "pres@grace.example.org", Role::President, Some(church.id)).await;

        Self {
            db,
            division,
            church,
            event,
            admin: Actor::from(&admin),
            president: Actor::from(&president),
        }
    }

    /// Another church with its own president, in the same division.
    pub async fn second_church(&self, name: &str, email: &str) -> (church::Model, Actor) {
        let church = seed_church(&self.db, name, self.division.id).await;
        let president = seed_user(&self.db, email, Role::President, Some(church.id)).await;
        (church, Actor::from(&president))
    }
}
