use sea_orm_migration::prelude::*;

use super::m20260201_000002_create_datasets::Dataset;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum ChangeCheckMethod {
    #[sea_orm(iden = "change_check_method")]
    Enum,
    #[sea_orm(iden = "etag")]
    ETag,
    #[sea_orm(iden = "last_modified")]
    LastModified,
    #[sea_orm(iden = "provider_edit_date")]
    ProviderEditDate,
    #[sea_orm(iden = "wfs_update_seq")]
    WfsUpdateSeq,
    #[sea_orm(iden = "ckan_modified")]
    CkanModified,
    #[sea_orm(iden = "feature_count")]
    FeatureCount,
    #[sea_orm(iden = "sample_checksum")]
    SampleChecksum,
    #[sea_orm(iden = "metadata_hash")]
    MetadataHash,
}

#[derive(Iden)]
pub enum ChangeCheck {
    Table,
    Id,
    DatasetId,
    ProbeTime,
    Method,
    Changed,
    Conclusive,
    ElapsedMs,
    TriggeredDownload,
    Details,
    Error,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(ChangeCheckMethod::Enum)
                    .values([
                        ChangeCheckMethod::ETag,
                        ChangeCheckMethod::LastModified,
                        ChangeCheckMethod::ProviderEditDate,
                        ChangeCheckMethod::WfsUpdateSeq,
                        ChangeCheckMethod::CkanModified,
                        ChangeCheckMethod::FeatureCount,
                        ChangeCheckMethod::SampleChecksum,
                        ChangeCheckMethod::MetadataHash,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChangeCheck::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChangeCheck::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(ChangeCheck::DatasetId).uuid().not_null())
                    .col(
                        ColumnDef::new(ChangeCheck::ProbeTime)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ChangeCheck::Method)
                            .custom(ChangeCheckMethod::Enum)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChangeCheck::Changed).boolean().not_null())
                    .col(ColumnDef::new(ChangeCheck::Conclusive).boolean().not_null())
                    .col(ColumnDef::new(ChangeCheck::ElapsedMs).integer().not_null())
                    .col(
                        ColumnDef::new(ChangeCheck::TriggeredDownload)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ChangeCheck::Details).json_binary())
                    .col(ColumnDef::new(ChangeCheck::Error).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_change_check_dataset")
                            .from(ChangeCheck::Table, ChangeCheck::DatasetId)
                            .to(Dataset::Table, Dataset::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_change_check_dataset_probe_time")
                    .table(ChangeCheck::Table)
                    .col(ChangeCheck::DatasetId)
                    .col(ChangeCheck::ProbeTime)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChangeCheck::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(ChangeCheckMethod::Enum).to_owned())
            .await?;
        Ok(())
    }
}
