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
                        .as_enum(UserRole::Enum)
                        .values([UserRole::Driver, UserRole::Passenger])
                        .to_owned(),
                )
                .await?;

            manager
                .create_type(
                    Type::create()
                        .as_enum(AppRole::Enum)
                        .values([AppRole::Admin, AppRole::User])
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(uuid(Profiles::Id).primary_key())
                    .col(uuid(Profiles::UserId).not_null().unique_key())
                    .col(string_len(Profiles::FullName, 100).not_null())
                    .col(string_len_null(Profiles::PhoneNumber, 20))
                    .col(string_len_null(Profiles::Email, 255))
                    .col(ColumnDef::new(Profiles::Role).custom(UserRole::Enum).not_null())
                    .col(string_len_null(Profiles::AvatarUrl, 512))
                    .col(
                        timestamp_with_time_zone(Profiles::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Profiles::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profiles_user")
                            .from(Profiles::Table, Profiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DriverDetails::Table)
                    .if_not_exists()
                    .col(uuid(DriverDetails::Id).primary_key())
                    .col(uuid(DriverDetails::UserId).not_null().unique_key())
                    .col(string_len(DriverDetails::CarMake, 50).not_null())
                    .col(string_len(DriverDetails::CarModel, 50).not_null())
                    .col(string_len_null(DriverDetails::CarColor, 30))
                    .col(string_len(DriverDetails::LicensePlate, 20).not_null())
                    .col(integer(DriverDetails::SeatsAvailable).not_null())
                    .col(
                        timestamp_with_time_zone(DriverDetails::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(DriverDetails::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_driver_details_user")
                            .from(DriverDetails::Table, DriverDetails::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserRoles::Table)
                    .if_not_exists()
                    .col(uuid(UserRoles::Id).primary_key())
                    .col(uuid(UserRoles::UserId).not_null())
                    .col(ColumnDef::new(UserRoles::Role).custom(AppRole::Enum).not_null())
                    .col(
                        timestamp_with_time_zone(UserRoles::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_roles_user")
                            .from(UserRoles::Table, UserRoles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_roles_user_role")
                    .table(UserRoles::Table)
                    .col(UserRoles::UserId)
                    .col(UserRoles::Role)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserRoles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DriverDetails::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;

        if uses_native_enums(manager) {
            manager
                .drop_type(Type::drop().name(AppRole::Enum).to_owned())
                .await?;
            manager
                .drop_type(Type::drop().name(UserRole::Enum).to_owned())
                .await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Profiles {
    Table,
    Id,
    UserId,
    FullName,
    PhoneNumber,
    Email,
    Role,
    AvatarUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum DriverDetails {
    Table,
    Id,
    UserId,
    CarMake,
    CarModel,
    CarColor,
    LicensePlate,
    SeatsAvailable,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum UserRoles {
    Table,
    Id,
    UserId,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum UserRole {
    #[sea_orm(iden = "user_role")]
    Enum,
    #[sea_orm(iden = "driver")]
    Driver,
    #[sea_orm(iden = "passenger")]
    Passenger,
}

#[derive(DeriveIden)]
pub enum AppRole {
    #[sea_orm(iden = "app_role")]
    Enum,
    #[sea_orm(iden = "admin")]
    Admin,
    #[sea_orm(iden = "user")]
    User,
}
