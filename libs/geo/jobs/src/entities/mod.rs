pub mod crawl_job;
pub mod download_chunk;
pub mod download_job;
pub mod export_job;
pub mod status;

pub use crawl_job::Entity as CrawlJobEntity;
pub use download_chunk::Entity as DownloadChunkEntity;
pub use download_job::Entity as DownloadJobEntity;
pub use export_job::Entity as ExportJobEntity;
pub use status::{ChunkStrategy, JobStatus};
