//! Query-statistics ingestion pipeline.
//!
//! `observe(sample)` is non-blocking and safe to call from many producers;
//! a background flusher drains the buffer in batches of >=100 samples or
//! every <=1s, whichever comes first. `ix-ingestion` exclusively owns the
//! in-memory buffer.

pub mod buffer;
pub mod flush;
pub mod load;

use std::sync::Arc;

use buffer::Buffer;
use ix_config::IngestionConfig;
use ix_domain::QuerySample;
use ix_gateway::ConnectionPool;
use tokio::task::JoinHandle;

/// The ingestion pipeline's public handle. Cheap to clone (an `Arc` inside);
/// every producer in the hosting application holds one.
#[derive(Clone)]
pub struct Ingestion {
    buffer: Arc<Buffer>,
}

impl Ingestion {
    pub fn new(config: &IngestionConfig) -> Self {
        Self {
            buffer: Arc::new(Buffer::new(config.buffer_size)),
        }
    }

    /// Enqueues `sample`. Non-blocking; under saturation the oldest sample
    /// is evicted rather than this call blocking.
    pub fn observe(&self, sample: QuerySample) {
        self.buffer.push(sample);
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn dropped_count(&self) -> u64 {
        Buffer::dropped_count()
    }

    /// Loads one `(tenant, table, field)` key's window of already-flushed
    /// samples, for `ix-daemon`'s `analyze`/`apply` commands to hand to
    /// `ix-analyzer::analyze_field`. Only sees rows a prior flush has
    /// committed; anything still sitting in this process's buffer is not
    /// included.
    pub async fn load_window(
        &self,
        pool: &Arc<ConnectionPool>,
        tenant: Option<&str>,
        table: &str,
        field: &str,
        now: chrono::DateTime<chrono::Utc>,
        window: chrono::Duration,
    ) -> anyhow::Result<Vec<QuerySample>> {
        let conn = pool.acquire().await?;
        load::load_window(&conn, tenant, table, field, now, window).await
    }

    /// Spawns the background flusher. Returns a handle the supervisor joins
    /// on drain; the task stops once `stop` fires, performing one final
    /// flush of anything left in the buffer first.
    pub fn spawn_flusher(
        &self,
        pool: Arc<ConnectionPool>,
        config: IngestionConfig,
        mut stop: tokio::sync::watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let buffer = self.buffer.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(config.flush_interval_ms));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {},
                    _ = stop.changed() => {
                        if *stop.borrow() {
                            drain_and_flush(&buffer, &pool, config.flush_batch_size).await;
                            break;
                        }
                    }
                }
                if buffer.len() >= config.flush_batch_size || !buffer.is_empty() {
                    drain_and_flush(&buffer, &pool, config.flush_batch_size.max(buffer.len())).await;
                }
            }
        })
    }
}

async fn drain_and_flush(buffer: &Buffer, pool: &Arc<ConnectionPool>, max: usize) {
    let batch = buffer.drain(max);
    if batch.is_empty() {
        return;
    }
    let conn = match pool.acquire().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!("ingestion flush could not acquire a connection: {e:#}");
            return;
        },
    };
    if let Err(e) = flush::flush_batch(&conn, &batch).await {
        tracing::warn!(rows = batch.len(), "ingestion flush failed, samples lost: {e:#}");
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ix_domain::QueryShape;

    use super::*;

    fn sample() -> QuerySample {
        QuerySample {
            ts: Utc::now(),
            tenant: Some("t1".into()),
            table: "contacts".into(),
            field: "email".into(),
            shape: QueryShape::PointLookup,
            duration_ms: 5.0,
            rows_examined_estimate: Some(10.0),
            fingerprint: None,
            is_write: false,
        }
    }

    #[test]
    fn observe_is_synchronous_and_reflected_immediately() {
        let ingestion = Ingestion::new(&IngestionConfig {
            buffer_size: 10,
            flush_interval_ms: 1000,
            flush_batch_size: 100,
        });
        ingestion.observe(sample());
        ingestion.observe(sample());
        assert_eq!(ingestion.pending_len(), 2);
    }

    #[test]
    fn dropped_count_is_exposed_for_observability() {
        let ingestion = Ingestion::new(&IngestionConfig {
            buffer_size: 1,
            flush_interval_ms: 1000,
            flush_batch_size: 100,
        });
        ingestion.observe(sample());
        ingestion.observe(sample());
        assert_eq!(ingestion.pending_len(), 1);
    }
}
