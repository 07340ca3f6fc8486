use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Server {
    Table,
    Id,
    Name,
    BaseUrl,
    ProviderKind,
    AuthBlob,
    Capabilities,
    Health,
    CrawlCadenceHours,
    RateLimitBlob,
    ConnectionBlob,
    CountryHint,
    DatasetCount,
    ActiveDatasetCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ProviderKind {
    #[sea_orm(iden = "provider_kind")]
    Enum,
    #[sea_orm(iden = "arcgis")]
    ArcGis,
    #[sea_orm(iden = "wfs")]
    Wfs,
    #[sea_orm(iden = "wcs")]
    Wcs,
    #[sea_orm(iden = "ckan")]
    Ckan,
    #[sea_orm(iden = "opendatasoft")]
    OpenDataSoft,
    #[sea_orm(iden = "s3_listing")]
    S3Listing,
    #[sea_orm(iden = "atom")]
    Atom,
    #[sea_orm(iden = "direct")]
    Direct,
    #[sea_orm(iden = "gee")]
    Gee,
}

#[derive(Iden)]
enum ServerHealth {
    #[sea_orm(iden = "server_health")]
    Enum,
    #[sea_orm(iden = "healthy")]
    Healthy,
    #[sea_orm(iden = "degraded")]
    Degraded,
    #[sea_orm(iden = "offline")]
    Offline,
    #[sea_orm(iden = "unknown")]
    Unknown,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(ProviderKind::Enum)
                    .values([
                        ProviderKind::ArcGis,
                        ProviderKind::Wfs,
                        ProviderKind::Wcs,
                        ProviderKind::Ckan,
                        ProviderKind::OpenDataSoft,
                        ProviderKind::S3Listing,
                        ProviderKind::Atom,
                        ProviderKind::Direct,
                        ProviderKind::Gee,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(ServerHealth::Enum)
                    .values([
                        ServerHealth::Healthy,
                        ServerHealth::Degraded,
                        ServerHealth::Offline,
                        ServerHealth::Unknown,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Server::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Server::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Server::Name).text().not_null())
                    .col(ColumnDef::new(Server::BaseUrl).text().not_null())
                    .col(
                        ColumnDef::new(Server::ProviderKind)
                            .custom(ProviderKind::Enum)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Server::AuthBlob).json_binary())
                    .col(ColumnDef::new(Server::Capabilities).json_binary())
                    .col(
                        ColumnDef::new(Server::Health)
                            .custom(ServerHealth::Enum)
                            .not_null()
                            .default(SimpleExpr::Custom("'unknown'".into())),
                    )
                    .col(
                        ColumnDef::new(Server::CrawlCadenceHours)
                            .integer()
                            .not_null()
                            .default(24),
                    )
                    .col(ColumnDef::new(Server::RateLimitBlob).json_binary())
                    .col(ColumnDef::new(Server::ConnectionBlob).json_binary())
                    .col(ColumnDef::new(Server::CountryHint).text())
                    .col(
                        ColumnDef::new(Server::DatasetCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Server::ActiveDatasetCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Server::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Server::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER servers_touch_updated_at
                BEFORE UPDATE ON server
                FOR EACH ROW EXECUTE FUNCTION util.touch_updated_at()
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Server::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(ServerHealth::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(ProviderKind::Enum).to_owned())
            .await?;
        Ok(())
    }
}
