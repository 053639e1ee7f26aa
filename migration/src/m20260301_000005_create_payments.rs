use sea_orm_migration::{prelude::*, schema::*};

use super::m20260301_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MobileMoneyPayments::Table)
                    .if_not_exists()
                    .col(uuid(MobileMoneyPayments::Id).primary_key())
                    .col(uuid(MobileMoneyPayments::UserId).not_null())
                    .col(string_len(MobileMoneyPayments::PaymentType, 20).not_null())
                    .col(uuid_null(MobileMoneyPayments::ReferenceId))
                    .col(string_len(MobileMoneyPayments::Provider, 10).not_null())
                    .col(string_len(MobileMoneyPayments::PhoneNumber, 20).not_null())
                    .col(big_integer(MobileMoneyPayments::Amount).not_null())
                    .col(string_len(MobileMoneyPayments::Status, 20).not_null())
                    .col(string_len_null(MobileMoneyPayments::TransactionRef, 64))
                    .col(
                        timestamp_with_time_zone(MobileMoneyPayments::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(MobileMoneyPayments::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_mobile_money_payments_user")
                            .from(MobileMoneyPayments::Table, MobileMoneyPayments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DriverSubscriptions::Table)
                    .if_not_exists()
                    .col(uuid(DriverSubscriptions::Id).primary_key())
                    .col(uuid(DriverSubscriptions::DriverId).not_null())
                    .col(big_integer(DriverSubscriptions::Amount).not_null())
                    .col(string_len(DriverSubscriptions::Status, 20).not_null())
                    .col(string_len(DriverSubscriptions::PaymentMethod, 30).not_null())
                    .col(
                        uuid(DriverSubscriptions::PaymentReference)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        timestamp_with_time_zone(DriverSubscriptions::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone(DriverSubscriptions::ExpiresAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_driver_subscriptions_driver")
                            .from(DriverSubscriptions::Table, DriverSubscriptions::DriverId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DriverSubscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MobileMoneyPayments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MobileMoneyPayments {
    Table,
    Id,
    UserId,
    PaymentType,
    ReferenceId,
    Provider,
    PhoneNumber,
    Amount,
    Status,
    TransactionRef,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DriverSubscriptions {
    Table,
    Id,
    DriverId,
    Amount,
    Status,
    PaymentMethod,
    PaymentReference,
    CreatedAt,
    ExpiresAt,
}
