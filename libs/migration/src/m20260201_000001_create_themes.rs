use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Theme {
    Table,
    Code,
    DisplayName,
    Description,
    Aliases,
    ParentCode,
    DisplayHints,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Theme::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Theme::Code).text().not_null().primary_key())
                    .col(ColumnDef::new(Theme::DisplayName).text().not_null())
                    .col(ColumnDef::new(Theme::Description).text())
                    .col(
                        ColumnDef::new(Theme::Aliases)
                            .array(ColumnType::Text)
                            .not_null()
                            .default(SimpleExpr::Custom("'{}'".into())),
                    )
                    .col(ColumnDef::new(Theme::ParentCode).text())
                    .col(ColumnDef::new(Theme::DisplayHints).json_binary())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_theme_parent")
                            .from(Theme::Table, Theme::ParentCode)
                            .to(Theme::Table, Theme::Code)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                INSERT INTO theme (code, display_name, aliases) VALUES
                    ('natural_environment', 'Natural Environment', '{}'),
                    ('built_environment', 'Built Environment', '{}'),
                    ('transport', 'Transport', '{}'),
                    ('marine', 'Marine', '{}'),
                    ('hydrology', 'Hydrology', '{}')
                ON CONFLICT (code) DO NOTHING
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Theme::Table).to_owned())
            .await
    }
}
