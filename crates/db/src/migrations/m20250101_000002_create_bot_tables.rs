//! Create bot automation tables: global settings, groups, configs,
//! cooldowns and profile likes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BotGlobalSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BotGlobalSettings::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BotGlobalSettings::AutoLikeEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(BotGlobalSettings::AutoLikeRate)
                            .integer()
                            .not_null()
                            .default(5),
                    )
                    .col(
                        ColumnDef::new(BotGlobalSettings::CooldownHours)
                            .integer()
                            .not_null()
                            .default(72),
                    )
                    .col(
                        ColumnDef::new(BotGlobalSettings::ActiveHours)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(BotGlobalSettings::AutoStory)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(BotGlobalSettings::ProfileRotationMinutes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BotGlobalSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BotGroup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BotGroup::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BotGroup::Name).string_len(128).not_null())
                    .col(ColumnDef::new(BotGroup::AutoLikeRate).integer().null())
                    .col(ColumnDef::new(BotGroup::CooldownHours).integer().null())
                    .col(ColumnDef::new(BotGroup::ActiveHours).json_binary().null())
                    .col(
                        ColumnDef::new(BotGroup::MinResponseDelaySecs)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(BotGroup::MaxResponseDelaySecs)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(BotGroup::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BotConfig::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BotConfig::UserId)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BotConfig::PersonalityPrompt).text().null())
                    .col(ColumnDef::new(BotConfig::Tone).string_len(64).null())
                    .col(ColumnDef::new(BotConfig::AutoLikeRate).integer().null())
                    .col(ColumnDef::new(BotConfig::CooldownHours).integer().null())
                    .col(ColumnDef::new(BotConfig::ActiveHours).json_binary().null())
                    .col(
                        ColumnDef::new(BotConfig::UseGlobal)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(BotConfig::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(BotConfig::GroupId).string_len(32).null())
                    .col(
                        ColumnDef::new(BotConfig::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bot_config_user")
                            .from(BotConfig::Table, BotConfig::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bot_config_group")
                            .from(BotConfig::Table, BotConfig::GroupId)
                            .to(BotGroup::Table, BotGroup::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Composite key: upserts overwrite instead of accumulating history
        manager
            .create_table(
                Table::create()
                    .table(BotCooldown::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BotCooldown::BotId).string_len(32).not_null())
                    .col(ColumnDef::new(BotCooldown::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(BotCooldown::LastInteractionAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(BotCooldown::BotId)
                            .col(BotCooldown::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bot_cooldown_bot")
                            .from(BotCooldown::Table, BotCooldown::BotId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bot_cooldown_user")
                            .from(BotCooldown::Table, BotCooldown::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProfileLike::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProfileLike::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProfileLike::LikerId).string_len(32).not_null())
                    .col(ColumnDef::new(ProfileLike::LikedId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(ProfileLike::IsAutomated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ProfileLike::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profile_like_liker")
                            .from(ProfileLike::Table, ProfileLike::LikerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profile_like_liked")
                            .from(ProfileLike::Table, ProfileLike::LikedId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One like per (liker, liked)
        manager
            .create_index(
                Index::create()
                    .name("idx_profile_like_liker_liked")
                    .table(ProfileLike::Table)
                    .col(ProfileLike::LikerId)
                    .col(ProfileLike::LikedId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProfileLike::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BotCooldown::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BotConfig::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BotGroup::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BotGlobalSettings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum BotGlobalSettings {
    Table,
    Id,
    AutoLikeEnabled,
    AutoLikeRate,
    CooldownHours,
    ActiveHours,
    AutoStory,
    ProfileRotationMinutes,
    UpdatedAt,
}

#[derive(Iden)]
enum BotGroup {
    Table,
    Id,
    Name,
    AutoLikeRate,
    CooldownHours,
    ActiveHours,
    MinResponseDelaySecs,
    MaxResponseDelaySecs,
    CreatedAt,
}

#[derive(Iden)]
enum BotConfig {
    Table,
    UserId,
    PersonalityPrompt,
    Tone,
    AutoLikeRate,
    CooldownHours,
    ActiveHours,
    UseGlobal,
    IsActive,
    GroupId,
    UpdatedAt,
}

#[derive(Iden)]
enum BotCooldown {
    Table,
    BotId,
    UserId,
    LastInteractionAt,
}

#[derive(Iden)]
enum ProfileLike {
    Table,
    Id,
    LikerId,
    LikedId,
    IsAutomated,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
