//! Pooled, parameter-safe Postgres access: a semaphore-bounded pool of
//! long-lived connections, each carrying its own bounded prepared-statement
//! cache, with a background task that reaps connections idle past a
//! lifetime. Uses stable `tracing` spans and a boxed stream rather than
//! nightly-only tracing/alias features.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{
            AtomicBool,
            Ordering,
        },
        Arc,
    },
    time::Duration,
};

use ix_config::DatabaseConfig;
use ix_errors::IndexPilotError;
use ix_metrics::{
    register_counter,
    register_histogram,
    Timer,
};
use lru::LruCache;
use parking_lot::Mutex;
use tokio::{
    sync::{
        Semaphore,
        SemaphorePermit,
    },
    task::JoinHandle,
    time::Instant,
};
use tokio_postgres::{
    types::ToSql,
    Row,
    Statement,
};

use crate::{
    retry::{
        classify,
        with_db_retry,
    },
    tls::make_tls_connector,
};

register_counter!(GATEWAY_CONNECTIONS_OPENED, "Connections opened by the gateway pool");
register_counter!(GATEWAY_CONNECTIONS_POISONED, "Connections discarded after an error");
register_histogram!(GATEWAY_ACQUIRE_SECONDS, "Time spent waiting for a pooled connection");

const MAX_CACHED_STATEMENTS: usize = 64;
const IDLE_CONNECTION_LIFETIME: Duration = Duration::from_secs(5 * 60);

type StatementCache = LruCache<String, Statement>;

struct PooledConn {
    client: tokio_postgres::Client,
    statements: Mutex<StatementCache>,
    last_used: Instant,
}

impl PooledConn {
    fn new(client: tokio_postgres::Client) -> Self {
        Self {
            client,
            statements: Mutex::new(LruCache::new(
                std::num::NonZeroUsize::new(MAX_CACHED_STATEMENTS).unwrap(),
            )),
            last_used: Instant::now(),
        }
    }
}

/// A bounded pool of Postgres connections behind a typed gateway.
///
/// Always held behind an `Arc`; `C8`'s mutation executor and `C4`'s plan
/// introspector hold independent clones and never share a single checked-out
/// connection.
pub struct ConnectionPool {
    pg_config: tokio_postgres::Config,
    tls: tokio_postgres_rustls::MakeRustlsConnect,
    semaphore: Semaphore,
    idle: Mutex<VecDeque<PooledConn>>,
    idle_reaper: JoinHandle<()>,
}

impl ConnectionPool {
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Arc<Self>> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .dbname(&config.name)
            .user(&config.user)
            .password(&config.password)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        let tls = make_tls_connector(config.transport_encryption)?;

        let (tx, rx) = tokio::sync::oneshot::channel();
        let idle_reaper = tokio::spawn(async move {
            let pool: std::sync::Weak<ConnectionPool> = match rx.await {
                Ok(p) => p,
                Err(_) => return,
            };
            loop {
                let Some(pool) = pool.upgrade() else { break };
                pool.reap_idle();
                drop(pool);
                tokio::time::sleep(IDLE_CONNECTION_LIFETIME).await;
            }
        });

        let this = Arc::new(Self {
            pg_config,
            tls,
            semaphore: Semaphore::new(config.pool_max.max(1)),
            idle: Mutex::new(VecDeque::new()),
            idle_reaper,
        });
        let _ = tx.send(Arc::downgrade(&this));
        Ok(this)
    }

    fn reap_idle(&self) {
        let mut idle = self.idle.lock();
        while let Some(front) = idle.front() {
            if front.last_used.elapsed() > IDLE_CONNECTION_LIFETIME {
                idle.pop_front();
            } else {
                break;
            }
        }
    }

    async fn open_connection(&self) -> anyhow::Result<PooledConn> {
        let (client, connection) = self.pg_config.connect(self.tls.clone()).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("postgres connection task ended with error: {e}");
            }
        });
        GATEWAY_CONNECTIONS_OPENED.inc();
        Ok(PooledConn::new(client))
    }

    /// Checks out a connection, retrying the initial acquisition on
    /// transient errors, per §4.1.
    pub async fn acquire(self: &Arc<Self>) -> anyhow::Result<GatewayConnection<'_>> {
        let _timer = Timer::new(&GATEWAY_ACQUIRE_SECONDS);
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| IndexPilotError::ShutdownInProgress)?;
        let conn = with_db_retry(3, Duration::from_millis(50), || async {
            let mut idle = self.idle.lock();
            while let Some(conn) = idle.pop_back() {
                if !conn.client.is_closed() {
                    return Ok(conn);
                }
            }
            drop(idle);
            self.open_connection().await
        })
        .await?;
        Ok(GatewayConnection {
            pool: self,
            _permit: permit,
            conn: Some(conn),
            poisoned: AtomicBool::new(false),
        })
    }

    /// Drops all idle connections and refuses to hand out new ones. Called
    /// from the supervisor's drain sequence.
    pub fn shutdown(&self) {
        self.semaphore.close();
        self.idle.lock().clear();
        self.idle_reaper.abort();
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.idle_reaper.abort();
    }
}

/// A checked-out connection. Returned to the pool on drop unless poisoned.
pub struct GatewayConnection<'a> {
    pool: &'a Arc<ConnectionPool>,
    _permit: SemaphorePermit<'a>,
    conn: Option<PooledConn>,
    poisoned: AtomicBool,
}

impl GatewayConnection<'_> {
    fn conn(&self) -> &PooledConn {
        self.conn.as_ref().expect("taken only in Drop")
    }

    async fn prepare_cached(&self, sql: &str) -> anyhow::Result<Statement> {
        if let Some(stmt) = self.conn().statements.lock().get(sql) {
            return Ok(stmt.clone());
        }
        match self.conn().client.prepare(sql).await {
            Ok(stmt) => {
                self.conn().statements.lock().put(sql.to_owned(), stmt.clone());
                Ok(stmt)
            },
            Err(e) => {
                let classified = classify(&e);
                self.poisoned.store(classified.is_retryable(), Ordering::Relaxed);
                Err(classified.into())
            },
        }
    }

    /// Runs a parameterized query expecting zero or one row.
    pub async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> anyhow::Result<Option<Row>> {
        let stmt = self.prepare_cached(sql).await?;
        self.conn()
            .client
            .query_opt(&stmt, params)
            .await
            .map_err(|e| {
                let classified = classify(&e);
                self.poisoned.store(classified.is_retryable(), Ordering::Relaxed);
                classified.into()
            })
    }

    /// Runs a parameterized query returning all rows.
    pub async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> anyhow::Result<Vec<Row>> {
        let stmt = self.prepare_cached(sql).await?;
        self.conn().client.query(&stmt, params).await.map_err(|e| {
            let classified = classify(&e);
            self.poisoned.store(classified.is_retryable(), Ordering::Relaxed);
            classified.into()
        })
    }

    /// Executes a parameterized statement, returning the affected row count.
    pub async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> anyhow::Result<u64> {
        let stmt = self.prepare_cached(sql).await?;
        self.conn().client.execute(&stmt, params).await.map_err(|e| {
            let classified = classify(&e);
            self.poisoned.store(classified.is_retryable(), Ordering::Relaxed);
            classified.into()
        })
    }

    /// Runs `sql` outside of any transaction. Required for `CREATE INDEX
    /// CONCURRENTLY`, `REINDEX CONCURRENTLY` and `VACUUM`, none of which
    /// Postgres permits inside a transaction block. `tokio_postgres` never
    /// wraps a single `simple_query`/`batch_execute` call in an implicit
    /// transaction, so this is just a documented entry point, not a special
    /// connection mode.
    pub async fn run_autocommit(&self, sql: &str) -> anyhow::Result<()> {
        self.conn().client.batch_execute(sql).await.map_err(|e| {
            let classified = classify(&e);
            self.poisoned.store(classified.is_retryable(), Ordering::Relaxed);
            classified.into()
        })
    }

    /// Begins a transaction. No DDL may be issued inside it (§4.3: "no flush
    /// may span a database transaction that also performs DDL"); callers
    /// that need DDL use [`Self::run_autocommit`] instead.
    pub async fn transaction(&mut self) -> anyhow::Result<tokio_postgres::Transaction<'_>> {
        let conn = self.conn.as_mut().expect("taken only in Drop");
        conn.client.transaction().await.map_err(|e| classify(&e).into())
    }
}

impl Drop for GatewayConnection<'_> {
    fn drop(&mut self) {
        if *self.poisoned.get_mut() {
            GATEWAY_CONNECTIONS_POISONED.inc();
            return;
        }
        let mut conn = self.conn.take().expect("taken only in Drop");
        conn.last_used = Instant::now();
        if !self.pool.semaphore.is_closed() {
            self.pool.idle.lock().push_back(conn);
        }
    }
}
