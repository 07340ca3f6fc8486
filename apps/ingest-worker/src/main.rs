//! Ingest Worker Service - Entry Point
//!
//! Background worker that crawls catalog servers, downloads datasets, and
//! caches them via the hybrid storage router.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    ingest_worker::run().await
}
