use sea_orm_migration::prelude::*;

use super::m20260201_000000_create_servers::Server;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Dataset {
    Table,
    Id,
    ServerId,
    ExternalId,
    Name,
    Description,
    Keywords,
    Themes,
    BboxMinX,
    BboxMinY,
    BboxMaxX,
    BboxMaxY,
    FeatureCount,
    AccessUrl,
    ServiceItemId,
    GeometryKind,
    SourceCrs,
    UpstreamPageLimit,
    UpstreamLastEdit,
    CachedEtag,
    CachedLastModified,
    LastKnownUpstreamUpdate,
    LastProbeAt,
    ChangePending,
    IsCached,
    CachedAt,
    CacheTableName,
    ObjectDataKey,
    ObjectTileKey,
    StorageMode,
    DownloadStrategy,
    TileBuilt,
    TileSize,
    License,
    Attribution,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum StorageMode {
    #[sea_orm(iden = "storage_mode")]
    Enum,
    #[sea_orm(iden = "spatial_db")]
    SpatialDb,
    #[sea_orm(iden = "columnar")]
    Columnar,
    #[sea_orm(iden = "hybrid")]
    Hybrid,
}

#[derive(Iden)]
enum DownloadStrategy {
    #[sea_orm(iden = "download_strategy")]
    Enum,
    #[sea_orm(iden = "simple")]
    Simple,
    #[sea_orm(iden = "paged")]
    Paged,
    #[sea_orm(iden = "chunked")]
    Chunked,
    #[sea_orm(iden = "distributed")]
    Distributed,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(StorageMode::Enum)
                    .values([StorageMode::SpatialDb, StorageMode::Columnar, StorageMode::Hybrid])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(DownloadStrategy::Enum)
                    .values([
                        DownloadStrategy::Simple,
                        DownloadStrategy::Paged,
                        DownloadStrategy::Chunked,
                        DownloadStrategy::Distributed,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Dataset::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Dataset::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Dataset::ServerId).uuid().not_null())
                    .col(ColumnDef::new(Dataset::ExternalId).text().not_null())
                    .col(ColumnDef::new(Dataset::Name).text().not_null())
                    .col(ColumnDef::new(Dataset::Description).text())
                    .col(
                        ColumnDef::new(Dataset::Keywords)
                            .array(ColumnType::Text)
                            .not_null()
                            .default(SimpleExpr::Custom("'{}'".into())),
                    )
                    .col(
                        ColumnDef::new(Dataset::Themes)
                            .array(ColumnType::Text)
                            .not_null()
                            .default(SimpleExpr::Custom("'{}'".into())),
                    )
                    .col(ColumnDef::new(Dataset::BboxMinX).double())
                    .col(ColumnDef::new(Dataset::BboxMinY).double())
                    .col(ColumnDef::new(Dataset::BboxMaxX).double())
                    .col(ColumnDef::new(Dataset::BboxMaxY).double())
                    .col(ColumnDef::new(Dataset::FeatureCount).big_integer())
                    .col(ColumnDef::new(Dataset::AccessUrl).text().not_null())
                    .col(ColumnDef::new(Dataset::ServiceItemId).text())
                    .col(ColumnDef::new(Dataset::GeometryKind).text())
                    .col(ColumnDef::new(Dataset::SourceCrs).text())
                    .col(ColumnDef::new(Dataset::UpstreamPageLimit).integer())
                    .col(
                        ColumnDef::new(Dataset::UpstreamLastEdit)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(Dataset::CachedEtag).text())
                    .col(ColumnDef::new(Dataset::CachedLastModified).text())
                    .col(
                        ColumnDef::new(Dataset::LastKnownUpstreamUpdate)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(Dataset::LastProbeAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Dataset::ChangePending)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Dataset::IsCached)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Dataset::CachedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Dataset::CacheTableName).text())
                    .col(ColumnDef::new(Dataset::ObjectDataKey).text())
                    .col(ColumnDef::new(Dataset::ObjectTileKey).text())
                    .col(ColumnDef::new(Dataset::StorageMode).custom(StorageMode::Enum))
                    .col(
                        ColumnDef::new(Dataset::DownloadStrategy)
                            .custom(DownloadStrategy::Enum)
                            .not_null()
                            .default(SimpleExpr::Custom("'paged'".into())),
                    )
                    .col(
                        ColumnDef::new(Dataset::TileBuilt)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Dataset::TileSize).big_integer())
                    .col(ColumnDef::new(Dataset::License).text())
                    .col(ColumnDef::new(Dataset::Attribution).text())
                    .col(
                        ColumnDef::new(Dataset::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Dataset::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Dataset::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_dataset_server")
                            .from(Dataset::Table, Dataset::ServerId)
                            .to(Server::Table, Server::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_dataset_server_access_url")
                    .table(Dataset::Table)
                    .col(Dataset::ServerId)
                    .col(Dataset::AccessUrl)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_dataset_active")
                    .table(Dataset::Table)
                    .col(Dataset::Active)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER datasets_touch_updated_at
                BEFORE UPDATE ON dataset
                FOR EACH ROW EXECUTE FUNCTION util.touch_updated_at()
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Dataset::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(DownloadStrategy::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(StorageMode::Enum).to_owned())
            .await?;
        Ok(())
    }
}
