use sea_orm_migration::prelude::*;

use super::m20260201_000000_create_servers::Server;
use super::m20260201_000002_create_datasets::Dataset;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum JobStatus {
    #[sea_orm(iden = "job_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "running")]
    Running,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "failed")]
    Failed,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}

#[derive(Iden)]
enum ChunkStrategy {
    #[sea_orm(iden = "chunk_strategy")]
    Enum,
    #[sea_orm(iden = "oid_range")]
    OidRange,
    #[sea_orm(iden = "offset")]
    Offset,
    #[sea_orm(iden = "spatial_grid")]
    SpatialGrid,
}

#[derive(Iden)]
pub enum CrawlJob {
    Table,
    Id,
    ServerId,
    Status,
    CreatedAt,
    StartedAt,
    CompletedAt,
    Error,
    RetryCount,
    WorkerTaskId,
    TotalServices,
    ServicesProcessed,
    DatasetsDiscovered,
    DatasetsNew,
    DatasetsUpdated,
    CurrentStage,
}

#[derive(Iden)]
pub enum DownloadJob {
    Table,
    Id,
    DatasetId,
    Status,
    CreatedAt,
    StartedAt,
    CompletedAt,
    Error,
    RetryCount,
    WorkerTaskId,
    StrategyLabel,
    TotalChunks,
    ChunksCompleted,
    FeaturesDownloaded,
    FeaturesTotal,
    CurrentStage,
    OutputPath,
}

#[derive(Iden)]
pub enum DownloadChunk {
    Table,
    Id,
    DownloadJobId,
    Ordinal,
    Strategy,
    Parameters,
    Status,
    OutputPath,
    FeatureCount,
    ByteSize,
    StartedAt,
    CompletedAt,
    Error,
}

#[derive(Iden)]
pub enum ExportJob {
    Table,
    Id,
    DatasetIds,
    Status,
    CreatedAt,
    StartedAt,
    CompletedAt,
    Error,
    RetryCount,
    WorkerTaskId,
    OutputFormat,
    ClipPolygonWkt,
    ExpiresAt,
    OutputKey,
    FormatParameters,
    RequestedBy,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(JobStatus::Enum)
                    .values([
                        JobStatus::Pending,
                        JobStatus::Running,
                        JobStatus::Completed,
                        JobStatus::Failed,
                        JobStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(ChunkStrategy::Enum)
                    .values([
                        ChunkStrategy::OidRange,
                        ChunkStrategy::Offset,
                        ChunkStrategy::SpatialGrid,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CrawlJob::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CrawlJob::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(CrawlJob::ServerId).uuid().not_null())
                    .col(
                        ColumnDef::new(CrawlJob::Status)
                            .custom(JobStatus::Enum)
                            .not_null()
                            .default(SimpleExpr::Custom("'pending'".into())),
                    )
                    .col(
                        ColumnDef::new(CrawlJob::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(CrawlJob::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(CrawlJob::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(CrawlJob::Error).text())
                    .col(
                        ColumnDef::new(CrawlJob::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CrawlJob::WorkerTaskId).text())
                    .col(ColumnDef::new(CrawlJob::TotalServices).integer())
                    .col(
                        ColumnDef::new(CrawlJob::ServicesProcessed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CrawlJob::DatasetsDiscovered)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CrawlJob::DatasetsNew)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CrawlJob::DatasetsUpdated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CrawlJob::CurrentStage).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crawl_job_server")
                            .from(CrawlJob::Table, CrawlJob::ServerId)
                            .to(Server::Table, Server::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DownloadJob::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DownloadJob::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(DownloadJob::DatasetId).uuid().not_null())
                    .col(
                        ColumnDef::new(DownloadJob::Status)
                            .custom(JobStatus::Enum)
                            .not_null()
                            .default(SimpleExpr::Custom("'pending'".into())),
                    )
                    .col(
                        ColumnDef::new(DownloadJob::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(DownloadJob::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(DownloadJob::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(DownloadJob::Error).text())
                    .col(
                        ColumnDef::new(DownloadJob::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(DownloadJob::WorkerTaskId).text())
                    .col(ColumnDef::new(DownloadJob::StrategyLabel).text().not_null())
                    .col(
                        ColumnDef::new(DownloadJob::TotalChunks)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DownloadJob::ChunksCompleted)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DownloadJob::FeaturesDownloaded)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(DownloadJob::FeaturesTotal).big_integer())
                    .col(ColumnDef::new(DownloadJob::CurrentStage).text())
                    .col(ColumnDef::new(DownloadJob::OutputPath).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_download_job_dataset")
                            .from(DownloadJob::Table, DownloadJob::DatasetId)
                            .to(Dataset::Table, Dataset::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DownloadChunk::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DownloadChunk::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(
                        ColumnDef::new(DownloadChunk::DownloadJobId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DownloadChunk::Ordinal).integer().not_null())
                    .col(
                        ColumnDef::new(DownloadChunk::Strategy)
                            .custom(ChunkStrategy::Enum)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DownloadChunk::Parameters).json_binary())
                    .col(
                        ColumnDef::new(DownloadChunk::Status)
                            .custom(JobStatus::Enum)
                            .not_null()
                            .default(SimpleExpr::Custom("'pending'".into())),
                    )
                    .col(ColumnDef::new(DownloadChunk::OutputPath).text())
                    .col(
                        ColumnDef::new(DownloadChunk::FeatureCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DownloadChunk::ByteSize)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(DownloadChunk::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(DownloadChunk::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(DownloadChunk::Error).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chunk_download_job")
                            .from(DownloadChunk::Table, DownloadChunk::DownloadJobId)
                            .to(DownloadJob::Table, DownloadJob::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chunk_job_ordinal")
                    .table(DownloadChunk::Table)
                    .col(DownloadChunk::DownloadJobId)
                    .col(DownloadChunk::Ordinal)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExportJob::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExportJob::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(
                        ColumnDef::new(ExportJob::DatasetIds)
                            .array(ColumnType::Uuid)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExportJob::Status)
                            .custom(JobStatus::Enum)
                            .not_null()
                            .default(SimpleExpr::Custom("'pending'".into())),
                    )
                    .col(
                        ColumnDef::new(ExportJob::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(ExportJob::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ExportJob::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ExportJob::Error).text())
                    .col(
                        ColumnDef::new(ExportJob::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ExportJob::WorkerTaskId).text())
                    .col(ColumnDef::new(ExportJob::OutputFormat).text().not_null())
                    .col(ColumnDef::new(ExportJob::ClipPolygonWkt).text())
                    .col(ColumnDef::new(ExportJob::ExpiresAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ExportJob::OutputKey).text())
                    .col(ColumnDef::new(ExportJob::FormatParameters).json_binary())
                    .col(ColumnDef::new(ExportJob::RequestedBy).text())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExportJob::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DownloadChunk::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DownloadJob::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CrawlJob::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(ChunkStrategy::Enum).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(JobStatus::Enum).to_owned())
            .await?;
        Ok(())
    }
}
