//! Create coin economy tables: ledger, access plans, unlocks and payments.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CoinTransaction::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CoinTransaction::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CoinTransaction::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CoinTransaction::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CoinTransaction::Kind).string_len(16).not_null())
                    .col(
                        ColumnDef::new(CoinTransaction::Reason)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CoinTransaction::Metadata).json_binary().null())
                    .col(
                        ColumnDef::new(CoinTransaction::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_coin_transaction_user")
                            .from(CoinTransaction::Table, CoinTransaction::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_coin_transaction_user_created")
                    .table(CoinTransaction::Table)
                    .col(CoinTransaction::UserId)
                    .col(CoinTransaction::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccessPlan::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessPlan::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccessPlan::Feature).string_len(64).not_null())
                    .col(ColumnDef::new(AccessPlan::Hours).integer().not_null())
                    .col(ColumnDef::new(AccessPlan::Cost).big_integer().not_null())
                    .col(
                        ColumnDef::new(AccessPlan::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccessUnlock::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessUnlock::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccessUnlock::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(AccessUnlock::Feature).string_len(64).not_null())
                    .col(ColumnDef::new(AccessUnlock::PlanId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(AccessUnlock::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccessUnlock::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_access_unlock_user")
                            .from(AccessUnlock::Table, AccessUnlock::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_access_unlock_user_feature_expires")
                    .table(AccessUnlock::Table)
                    .col(AccessUnlock::UserId)
                    .col(AccessUnlock::Feature)
                    .col(AccessUnlock::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payment::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payment::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Payment::Provider).string_len(32).not_null())
                    .col(ColumnDef::new(Payment::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(Payment::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Payment::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Payment::Metadata).json_binary().null())
                    .col(
                        ColumnDef::new(Payment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_user")
                            .from(Payment::Table, Payment::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Velocity checks filter by user, status and time
        manager
            .create_index(
                Index::create()
                    .name("idx_payment_user_status_created")
                    .table(Payment::Table)
                    .col(Payment::UserId)
                    .col(Payment::Status)
                    .col(Payment::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccessUnlock::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccessPlan::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CoinTransaction::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CoinTransaction {
    Table,
    Id,
    UserId,
    Amount,
    Kind,
    Reason,
    Metadata,
    CreatedAt,
}

#[derive(Iden)]
enum AccessPlan {
    Table,
    Id,
    Feature,
    Hours,
    Cost,
    IsActive,
}

#[derive(Iden)]
enum AccessUnlock {
    Table,
    Id,
    UserId,
    Feature,
    PlanId,
    ExpiresAt,
    CreatedAt,
}

#[derive(Iden)]
enum Payment {
    Table,
    Id,
    UserId,
    Provider,
    Kind,
    Amount,
    Status,
    Metadata,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
