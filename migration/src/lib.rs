pub use sea_orm_migration::prelude::*;

mod iden;
mod m20250301_000001_create_directory_tables;
mod m20250301_000002_create_event_table;
mod m20250301_000003_create_registration_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_directory_tables::Migration),
            Box::new(m20250301_000002_create_event_table::Migration),
            Box::new(m20250301_000003_create_registration_tables::Migration),
        ]
    }
}
