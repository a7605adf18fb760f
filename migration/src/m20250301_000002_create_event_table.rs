use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = table_auto(Event::Table)
            .col(pk_uuid(Event::Id))
            .col(string(Event::Name))
            .col(text_null(Event::Description))
            .col(string(Event::Location))
            .col(string_null(Event::BannerUrl))
            .col(string_null(Event::BannerPath))
            .col(timestamp(Event::StartDate))
            .col(timestamp(Event::EndDate))
            .col(timestamp(Event::PreRegistrationStart))
            .col(timestamp(Event::PreRegistrationEnd))
            .col(big_integer(Event::PreRegistrationFee).default(0))
            .col(big_integer(Event::PreRegistrationSiblingDiscount).default(0))
            .col(big_integer(Event::OnsiteRegistrationFee).default(0))
            .col(big_integer(Event::OnsiteSiblingDiscount).default(0))
            .col(big_integer(Event::CookRegistrationFee).default(0))
            .col(string_len(Event::Status, 16).default("UPCOMING"))
            .check(Expr::col(Event::EndDate).gte(Expr::col(Event::StartDate)))
            .check(Expr::col(Event::PreRegistrationEnd).gte(Expr::col(Event::PreRegistrationStart)))
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_start_date")
                    .table(Event::Table)
                    .col(Event::StartDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Event::Table).to_owned())
            .await?;

        Ok(())
    }
}
