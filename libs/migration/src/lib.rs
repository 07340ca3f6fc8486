pub use sea_orm_migration::prelude::*;

mod m20241128_000000_bootstrap;
mod m20260201_000000_create_servers;
mod m20260201_000001_create_themes;
mod m20260201_000002_create_datasets;
mod m20260201_000003_create_jobs;
mod m20260201_000004_create_change_checks;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241128_000000_bootstrap::Migration),
            Box::new(m20260201_000000_create_servers::Migration),
            Box::new(m20260201_000001_create_themes::Migration),
            Box::new(m20260201_000002_create_datasets::Migration),
            Box::new(m20260201_000003_create_jobs::Migration),
            Box::new(m20260201_000004_create_change_checks::Migration),
        ]
    }
}
