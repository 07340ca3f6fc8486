use async_trait::async_trait;
use geo_jobs::DownloadJobRepository;
use uuid::Uuid;

/// Polled by a storage backend between batch boundaries so a job marked
/// `Cancelled` on its row stops the write promptly instead of running to
/// completion.
#[async_trait]
pub trait CancellationCheck: Send + Sync {
    async fn is_cancelled(&self) -> bool;
}

/// No-op check for callers storing outside of a tracked download job (e.g.
/// ad-hoc backfills).
pub struct NeverCancelled;

#[async_trait]
impl CancellationCheck for NeverCancelled {
    async fn is_cancelled(&self) -> bool {
        false
    }
}

pub struct JobCancellation {
    repo: DownloadJobRepository,
    job_id: Uuid,
}

impl JobCancellation {
    pub fn new(repo: DownloadJobRepository, job_id: Uuid) -> Self {
        Self { repo, job_id }
    }
}

#[async_trait]
impl CancellationCheck for JobCancellation {
    async fn is_cancelled(&self) -> bool {
        self.repo.is_cancelled(self.job_id).await.unwrap_or(false)
    }
}
