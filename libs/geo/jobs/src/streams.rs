use serde::{Deserialize, Serialize};
use stream_worker::{StreamDef, StreamJob};
use uuid::Uuid;

/// Payload enqueued to kick off a crawl job. The job row itself (status,
/// progress counters) lives in the catalog database; this message only
/// carries enough to look it up.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrawlJobMessage {
    pub job_id: Uuid,
    pub server_id: Uuid,
    #[serde(default)]
    pub retry_count: u32,
}

impl StreamJob for CrawlJobMessage {
    fn job_id(&self) -> String {
        self.job_id.to_string()
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn with_retry(&self) -> Self {
        let mut next = self.clone();
        next.retry_count += 1;
        next
    }
}

pub struct CrawlStream;

impl StreamDef for CrawlStream {
    const STREAM_NAME: &'static str = "geo:crawls";
    const CONSUMER_GROUP: &'static str = "geo-crawl-workers";
    const DLQ_STREAM: &'static str = "geo:crawls:dlq";
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadJobMessage {
    pub job_id: Uuid,
    pub dataset_id: Uuid,
    #[serde(default)]
    pub retry_count: u32,
}

impl StreamJob for DownloadJobMessage {
    fn job_id(&self) -> String {
        self.job_id.to_string()
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn with_retry(&self) -> Self {
        let mut next = self.clone();
        next.retry_count += 1;
        next
    }
}

pub struct DownloadStream;

impl StreamDef for DownloadStream {
    const STREAM_NAME: &'static str = "geo:downloads";
    const CONSUMER_GROUP: &'static str = "geo-download-workers";
    const DLQ_STREAM: &'static str = "geo:downloads:dlq";
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadChunkMessage {
    pub download_job_id: Uuid,
    pub chunk_id: Uuid,
    #[serde(default)]
    pub retry_count: u32,
}

impl StreamJob for DownloadChunkMessage {
    fn job_id(&self) -> String {
        format!("{}:{}", self.download_job_id, self.chunk_id)
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn with_retry(&self) -> Self {
        let mut next = self.clone();
        next.retry_count += 1;
        next
    }

    fn max_retries(&self) -> u32 {
        3
    }
}

pub struct DownloadChunkStream;

impl StreamDef for DownloadChunkStream {
    const STREAM_NAME: &'static str = "geo:download-chunks";
    const CONSUMER_GROUP: &'static str = "geo-chunk-workers";
    const DLQ_STREAM: &'static str = "geo:download-chunks:dlq";
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportJobMessage {
    pub job_id: Uuid,
    #[serde(default)]
    pub retry_count: u32,
}

impl StreamJob for ExportJobMessage {
    fn job_id(&self) -> String {
        self.job_id.to_string()
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn with_retry(&self) -> Self {
        let mut next = self.clone();
        next.retry_count += 1;
        next
    }
}

pub struct ExportStream;

impl StreamDef for ExportStream {
    const STREAM_NAME: &'static str = "geo:exports";
    const CONSUMER_GROUP: &'static str = "geo-export-workers";
    const DLQ_STREAM: &'static str = "geo:exports:dlq";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_message_retry_increments() {
        let msg = CrawlJobMessage {
            job_id: Uuid::nil(),
            server_id: Uuid::nil(),
            retry_count: 0,
        };
        let retried = msg.with_retry();
        assert_eq!(retried.retry_count(), 1);
    }

    #[test]
    fn chunk_message_caps_retries_at_three() {
        let msg = DownloadChunkMessage {
            download_job_id: Uuid::nil(),
            chunk_id: Uuid::nil(),
            retry_count: 3,
        };
        assert!(msg.exceeded_max_retries(msg.max_retries()));
    }
}
