pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_users;
mod m20260301_000002_create_profiles;
mod m20260301_000003_create_rides;
mod m20260301_000004_create_bookings;
mod m20260301_000005_create_payments;
mod m20260301_000006_create_ratings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_users::Migration),
            Box::new(m20260301_000002_create_profiles::Migration),
            Box::new(m20260301_000003_create_rides::Migration),
            Box::new(m20260301_000004_create_bookings::Migration),
            Box::new(m20260301_000005_create_payments::Migration),
            Box::new(m20260301_000006_create_ratings::Migration),
        ]
    }
}

/// Postgres gets native enum types; other backends store the variants as text.
pub(crate) fn uses_native_enums(manager: &SchemaManager) -> bool {
    manager.get_database_backend() == sea_orm_migration::sea_orm::DbBackend::Postgres
}
