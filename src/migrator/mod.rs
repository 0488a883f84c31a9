use sea_orm_migration::prelude::*;

mod m20251120_000001_create_users;
mod m20251120_000002_create_places;
mod m20251121_000001_create_itineraries;
mod m20251122_000001_create_generation_requests;
mod m20251124_000001_create_favorites;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251120_000001_create_users::Migration),
            Box::new(m20251120_000002_create_places::Migration),
            Box::new(m20251121_000001_create_itineraries::Migration),
            Box::new(m20251122_000001_create_generation_requests::Migration),
            Box::new(m20251124_000001_create_favorites::Migration),
        ]
    }
}
