use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create Registration Table
        let table = table_auto(Registration::Table)
            .col(pk_uuid(Registration::Id))
            .col(uuid(Registration::EventId))
            .col(uuid(Registration::ChurchId))
            .col(uuid(Registration::PresidentId))
            .col(string_len(Registration::Status, 16).default("PENDING"))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_registration_event")
                    .from(Registration::Table, Registration::EventId)
                    .to(Event::Table, Event::Id)
                    .on_delete(ForeignKeyAction::Restrict),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_registration_church")
                    .from(Registration::Table, Registration::ChurchId)
                    .to(Church::Table, Church::Id)
                    .on_delete(ForeignKeyAction::Restrict),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_registration_president")
                    .from(Registration::Table, Registration::PresidentId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Restrict),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create Batch Table
        let table = table_auto(Batch::Table)
            .col(pk_uuid(Batch::Id))
            .col(uuid(Batch::RegistrationId))
            .col(integer(Batch::BatchNumber))
            .col(string_len(Batch::Status, 16).default("PENDING"))
            .col(boolean(Batch::IsPreRegistration))
            .col(string_null(Batch::ReceiptUrl))
            .col(string_null(Batch::ReceiptPath))
            .col(timestamp_null(Batch::ReviewedAt))
            .col(uuid_null(Batch::ReviewedBy))
            .col(text_null(Batch::RejectionRemarks))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_batch_registration")
                    .from(Batch::Table, Batch::RegistrationId)
                    .to(Registration::Table, Registration::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_batch_reviewer")
                    .from(Batch::Table, Batch::ReviewedBy)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .check(Expr::col(Batch::BatchNumber).gte(1))
            .to_owned();
        manager.create_table(table).await?;

        // Create Attendee Table
        let table = table_auto(Attendee::Table)
            .col(pk_uuid(Attendee::Id))
            .col(uuid(Attendee::BatchId))
            .col(string(Attendee::FullName))
            .col(string_null(Attendee::Nickname))
            .col(integer(Attendee::Age))
            .col(string_len(Attendee::Gender, 16))
            .col(string_len(Attendee::PersonType, 16))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_attendee_batch")
                    .from(Attendee::Table, Attendee::BatchId)
                    .to(Batch::Table, Batch::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .check(
                Expr::col(Attendee::Age)
                    .gte(1)
                    .and(Expr::col(Attendee::Age).lte(120)),
            )
            .to_owned();
        manager.create_table(table).await?;

        // A church registers once per event
        manager
            .create_index(
                Index::create()
                    .name("uq_registration_church_event")
                    .table(Registration::Table)
                    .col(Registration::ChurchId)
                    .col(Registration::EventId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_batch_registration_number")
                    .table(Batch::Table)
                    .col(Batch::RegistrationId)
                    .col(Batch::BatchNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Review queue ordering
        manager
            .create_index(
                Index::create()
                    .name("idx_batch_created_at")
                    .table(Batch::Table)
                    .col(Batch::CreatedAt)
                    .col(Batch::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_attendee_batch")
                    .table(Attendee::Table)
                    .col(Attendee::BatchId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Attendee::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Batch::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Registration::Table).to_owned())
            .await?;

        Ok(())
    }
}
