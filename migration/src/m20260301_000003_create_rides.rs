use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20260301_000001_create_users::Users;
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
                        .as_enum(RideStatus::Enum)
                        .values([
                            RideStatus::Available,
                            RideStatus::Full,
                            RideStatus::Completed,
                            RideStatus::Cancelled,
                        ])
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Rides::Table)
                    .if_not_exists()
                    .col(uuid(Rides::Id).primary_key())
                    .col(uuid(Rides::DriverId).not_null())
                    .col(string_len(Rides::PickupLocation, 200).not_null())
                    .col(double_null(Rides::PickupLat))
                    .col(double_null(Rides::PickupLng))
                    .col(string_len(Rides::Destination, 200).not_null())
                    .col(double_null(Rides::DestinationLat))
                    .col(double_null(Rides::DestinationLng))
                    .col(timestamp_with_time_zone(Rides::DepartureTime).not_null())
                    .col(integer(Rides::TotalSeats).not_null())
                    .col(integer(Rides::AvailableSeats).not_null())
                    .col(big_integer(Rides::FarePerSeat).not_null())
                    .col(ColumnDef::new(Rides::Status).custom(RideStatus::Enum).not_null())
                    .col(text_null(Rides::Notes))
                    .col(
                        timestamp_with_time_zone(Rides::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Rides::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(Rides::AvailableSeats).gte(0))
                    .check(Expr::col(Rides::AvailableSeats).lte(Expr::col(Rides::TotalSeats)))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rides_driver")
                            .from(Rides::Table, Rides::DriverId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Rides::Table).to_owned())
            .await?;

        if uses_native_enums(manager) {
            manager
                .drop_type(Type::drop().name(RideStatus::Enum).to_owned())
                .await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Rides {
    Table,
    Id,
    DriverId,
    PickupLocation,
    PickupLat,
    PickupLng,
    Destination,
    DestinationLat,
    DestinationLng,
    DepartureTime,
    TotalSeats,
    AvailableSeats,
    FarePerSeat,
    Status,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum RideStatus {
    #[sea_orm(iden = "ride_status")]
    Enum,
    #[sea_orm(iden = "available")]
    Available,
    #[sea_orm(iden = "full")]
    Full,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}
