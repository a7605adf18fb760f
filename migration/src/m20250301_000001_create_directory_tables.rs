use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create Division Table
        let table = table_auto(Division::Table)
            .col(pk_uuid(Division::Id))
            .col(string_uniq(Division::Name))
            .to_owned();
        manager.create_table(table).await?;

        // Create Church Table
        let table = table_auto(Church::Table)
            .col(pk_uuid(Church::Id))
            .col(string_uniq(Church::Name))
            .col(uuid(Church::DivisionId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_church_division")
                    .from(Church::Table, Church::DivisionId)
                    .to(Division::Table, Division::Id)
                    .on_delete(ForeignKeyAction::Restrict),
            )
            .to_owned();
        manager.create_table(table).await?;

        // One coordinator per division, removed along with it
        let table = table_auto(Coordinator::Table)
            .col(pk_uuid(Coordinator::Id))
            .col(string(Coordinator::Name))
            .col(uuid_uniq(Coordinator::DivisionId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_coordinator_division")
                    .from(Coordinator::Table, Coordinator::DivisionId)
                    .to(Division::Table, Division::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // One pastor per church
        let table = table_auto(Pastor::Table)
            .col(pk_uuid(Pastor::Id))
            .col(string(Pastor::Name))
            .col(string(Pastor::Phone))
            .col(string_null(Pastor::Email))
            .col(uuid_uniq(Pastor::ChurchId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_pastor_church")
                    .from(Pastor::Table, Pastor::ChurchId)
                    .to(Church::Table, Church::Id)
                    .on_delete(ForeignKeyAction::Restrict),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create User Table
        let table = table_auto(User::Table)
            .col(pk_uuid(User::Id))
            .col(string(User::Name))
            .col(string_uniq(User::Email))
            .col(string_len(User::Role, 16).default("USER"))
            .col(uuid_null(User::ChurchId))
            .col(string(User::AuthHash))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_user_church")
                    .from(User::Table, User::ChurchId)
                    .to(Church::Table, Church::Id)
                    .on_delete(ForeignKeyAction::Restrict),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_church_division")
                    .table(Church::Table)
                    .col(Church::DivisionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_church")
                    .table(User::Table)
                    .col(User::ChurchId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop all tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Pastor::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Coordinator::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Church::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Division::Table).to_owned())
            .await?;

        Ok(())
    }
}
