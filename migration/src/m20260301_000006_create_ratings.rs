use sea_orm_migration::{prelude::*, schema::*};

use super::m20260301_000001_create_users::Users;
use super::m20260301_000003_create_rides::Rides;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(uuid(Ratings::Id).primary_key())
                    .col(uuid(Ratings::RideId).not_null())
                    .col(uuid(Ratings::RaterId).not_null())
                    .col(uuid(Ratings::RatedUserId).not_null())
                    .col(small_integer(Ratings::Rating).not_null())
                    .col(text_null(Ratings::Comment))
                    .col(
                        timestamp_with_time_zone(Ratings::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(Ratings::Rating).between(1, 5))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ratings_ride")
                            .from(Ratings::Table, Ratings::RideId)
                            .to(Rides::Table, Rides::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ratings_rater")
                            .from(Ratings::Table, Ratings::RaterId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ratings_rated_user")
                            .from(Ratings::Table, Ratings::RatedUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ratings_unique_pair")
                    .table(Ratings::Table)
                    .col(Ratings::RideId)
                    .col(Ratings::RaterId)
                    .col(Ratings::RatedUserId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ratings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Ratings {
    Table,
    Id,
    RideId,
    RaterId,
    RatedUserId,
    Rating,
    Comment,
    CreatedAt,
}
