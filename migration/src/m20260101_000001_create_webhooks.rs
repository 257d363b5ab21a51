use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Webhooks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Webhooks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Webhooks::ScopeId).big_integer().not_null())
                    .col(ColumnDef::new(Webhooks::Url).text().not_null())
                    .col(
                        ColumnDef::new(Webhooks::ContentType)
                            .string()
                            .not_null()
                            .default("json"),
                    )
                    .col(ColumnDef::new(Webhooks::Secret).text())
                    .col(ColumnDef::new(Webhooks::Events).json().not_null())
                    .col(
                        ColumnDef::new(Webhooks::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Webhooks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Webhooks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookup path for event matching
        manager
            .create_index(
                Index::create()
                    .name("idx_webhooks_scope_active")
                    .table(Webhooks::Table)
                    .col(Webhooks::ScopeId)
                    .col(Webhooks::Active)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Webhooks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Webhooks {
    Table,
    Id,
    ScopeId,
    Url,
    ContentType,
    Secret,
    Events,
    Active,
    CreatedAt,
    UpdatedAt,
}
