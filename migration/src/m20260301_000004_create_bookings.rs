use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20260301_000001_create_users::Users;
use super::m20260301_000003_create_rides::Rides;
use crate::uses_native_enums;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if uses_native_enums(manager) {
            manager
                .create_type(
                    Type::create()
                        .as_enum(BookingStatus::Enum)
                        .values([
                            BookingStatus::Pending,
                            BookingStatus::Confirmed,
                            BookingStatus::Cancelled,
                            BookingStatus::Completed,
                        ])
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(uuid(Bookings::Id).primary_key())
                    .col(uuid(Bookings::RideId).not_null())
                    .col(uuid(Bookings::PassengerId).not_null())
                    .col(integer(Bookings::SeatsBooked).not_null())
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .custom(BookingStatus::Enum)
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(Bookings::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Bookings::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(Bookings::SeatsBooked).gt(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_ride")
                            .from(Bookings::Table, Bookings::RideId)
                            .to(Rides::Table, Rides::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_passenger")
                            .from(Bookings::Table, Bookings::PassengerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(uuid(Transactions::Id).primary_key())
                    .col(uuid(Transactions::BookingId).not_null().unique_key())
                    .col(uuid(Transactions::PassengerId).not_null())
                    .col(uuid(Transactions::DriverId).not_null())
                    .col(integer(Transactions::SeatsCount).not_null())
                    .col(big_integer(Transactions::TotalAmount).not_null())
                    .col(big_integer(Transactions::DriverAmount).not_null())
                    .col(big_integer(Transactions::PlatformCommission).not_null())
                    .col(string_len(Transactions::Status, 20).not_null())
                    .col(
                        timestamp_with_time_zone(Transactions::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Transactions::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_booking")
                            .from(Transactions::Table, Transactions::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await?;

        if uses_native_enums(manager) {
            manager
                .drop_type(Type::drop().name(BookingStatus::Enum).to_owned())
                .await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Bookings {
    Table,
    Id,
    RideId,
    PassengerId,
    SeatsBooked,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    BookingId,
    PassengerId,
    DriverId,
    SeatsCount,
    TotalAmount,
    DriverAmount,
    PlatformCommission,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum BookingStatus {
    #[sea_orm(iden = "booking_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "confirmed")]
    Confirmed,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
    #[sea_orm(iden = "completed")]
    Completed,
}
