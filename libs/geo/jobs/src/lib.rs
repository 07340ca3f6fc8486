pub mod entities;
pub mod error;
pub mod repository;
pub mod streams;

pub use error::{JobError, JobResult};
pub use repository::{
    CrawlJobRepository, DownloadChunkRepository, DownloadJobRepository, ExportJobRepository,
};
pub use streams::{
    CrawlJobMessage, CrawlStream, DownloadChunkMessage, DownloadChunkStream, DownloadJobMessage,
    DownloadStream, ExportJobMessage, ExportStream,
};
