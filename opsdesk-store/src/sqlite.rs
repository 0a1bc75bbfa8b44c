// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, migrate};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Create SQLite database if it doesn't already exist.
pub async fn create_database(url: &str) -> Result<(), SqliteError> {
    if !Sqlite::database_exists(url).await? {
        Sqlite::create_database(url).await?
    }
    Ok(())
}

/// Drop SQLite database if it exists.
pub async fn drop_database(url: &str) -> Result<(), SqliteError> {
    if Sqlite::database_exists(url).await? {
        Sqlite::drop_database(url).await?
    }
    Ok(())
}

/// Get migrations from folder without running them.
pub fn migrations() -> Migrator {
    migrate!()
}

/// Run any pending database migrations from inside the application.
pub async fn run_pending_migrations(pool: &sqlx::SqlitePool) -> Result<(), SqliteError> {
    migrations().run(pool).await?;
    Ok(())
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Configuration parameters for the SQLite database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL, for example `sqlite://opsdesk.db`.
    pub url: String,

    /// Maximum number of pooled connections.
    ///
    /// Every connection to an in-memory database shares the same data, but writers are
    /// serialised anyway. More than one connection only pays off for concurrent reads.
    pub max_connections: u32,

    /// Create the database file when it doesn't exist yet.
    pub create_database: bool,

    /// Run pending schema migrations on start.
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            create_database: true,
            run_migrations: true,
        }
    }
}

pub struct SqliteStoreBuilder {
    url: String,
    max_connections: u32,
    run_migrations: bool,
    create_database: bool,
}

impl Default for SqliteStoreBuilder {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

impl SqliteStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            create_database: config.create_database,
            run_migrations: config.run_migrations,
        }
    }

    #[cfg(any(test, feature = "test_utils"))]
    pub fn random_memory_url(mut self) -> Self {
        // Combining Rust tests with in-memory databases can lead to unsound behaviour, this
        // "workaround" assigns every temporary database a different, random name and keeps them
        // isolated from other tests.
        //
        // See related issue: https://github.com/launchbadge/sqlx/issues/2510
        self.url = format!(
            "sqlite://dbmem{}?mode=memory&cache=private",
            rand::random::<u32>()
        );
        self
    }

    pub fn database_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn create_database(mut self, create_database: bool) -> Self {
        self.create_database = create_database;
        self
    }

    pub fn run_default_migrations(mut self, run_migrations: bool) -> Self {
        self.run_migrations = run_migrations;
        self
    }

    pub async fn build<'a>(self) -> Result<SqliteStore<'a>, SqliteError> {
        if self.create_database {
            create_database(&self.url).await?;
        }

        let mut options = SqlitePoolOptions::new().max_connections(self.max_connections);
        if is_memory_url(&self.url) {
            // An in-memory database is gone as soon as its last connection closes, never let the
            // pool reap all of them.
            options = options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool: sqlx::SqlitePool = options.connect(&self.url).await?;

        if self.run_migrations {
            run_pending_migrations(&pool).await?;
        }

        debug!(url = %self.url, max_connections = self.max_connections, "opened sqlite store");

        Ok(SqliteStore::new(pool))
    }
}

pub type Transaction<'a> = sqlx::Transaction<'a, Sqlite>;

/// SQLite database with connection pool and transaction provider.
///
/// This struct can be cloned and used in multiple places in the application. Every cloned instance
/// will re-use the same connection pool and have access to the same transaction instance if one
/// was started.
///
/// SQLite strictly serializes transactions with _writes_ and will block any parallel attempt to
/// begin another one. Processes starting a transaction acquire a `TransactionPermit` and keep it
/// until the transaction was committed or rolled back. Queries which only involve committed
/// _reads_ should not use transactions and go through `execute` directly.
///
/// A process which drops its permit without committing or rolling back (for example because the
/// future driving it was dropped) leaves a stale transaction behind. It gets rolled back by the
/// next `begin`, uncommitted changes of an abandoned transaction are never persisted.
#[derive(Clone, Debug)]
pub struct SqliteStore<'a> {
    tx: Arc<Mutex<Option<Transaction<'a>>>>,
    pool: sqlx::SqlitePool,
    semaphore: Arc<Semaphore>,
}

impl<'a> SqliteStore<'a> {
    pub(crate) fn new(pool: sqlx::SqlitePool) -> Self {
        Self {
            tx: Arc::default(),
            pool,
            // SQLite only ever allows _one_ transaction at a time. This might be a repetition of
            // what sqlx and SQLite do under the hood, but we want to make this behaviour explicit
            // right from the beginning with this semaphore.
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Shortcut building an in-memory SQLite database with a randomised name for testing purposes.
    #[cfg(any(test, feature = "test_utils"))]
    pub async fn temporary() -> Self {
        SqliteStoreBuilder::new()
            .random_memory_url()
            .max_connections(1)
            .build()
            .await
            .expect("migrations succeeded")
    }

    /// Execute SQL query within transaction.
    ///
    /// This method will return an error when no transaction is currently given. Make sure to call
    /// `begin` before.
    ///
    /// If the query fails the user probably wants to roll back the transaction and free the
    /// permit. This is _not_ handled automatically.
    pub async fn tx<F, R>(&self, f: F) -> Result<R, SqliteError>
    where
        F: AsyncFnOnce(&mut Transaction) -> Result<R, SqliteError>,
    {
        let mut tx_ref = self.tx.lock().await;
        let tx = tx_ref.as_mut().ok_or(SqliteError::TransactionMissing)?;

        f(tx).await
    }

    /// Execute SQL query directly.
    pub async fn execute<F, R>(&self, f: F) -> Result<R, SqliteError>
    where
        F: AsyncFnOnce(&sqlx::SqlitePool) -> Result<R, SqliteError>,
    {
        f(&self.pool).await
    }

    /// Close all pooled connections. Any further query fails.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl<'a> crate::traits::Transaction for SqliteStore<'a> {
    type Error = SqliteError;

    type Permit = TransactionPermit;

    /// Begins a transaction.
    ///
    /// Transactions are strictly serialized, this is expressed in form of a `TransactionPermit`
    /// processes need to hold when acquiring access to a new transaction. Any concurrent process
    /// calling it will await here if there's already another process holding a permit.
    async fn begin(&self) -> Result<TransactionPermit, SqliteError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("if semaphore is closed then the whole struct is gone as well");

        // This lock only makes sure that mutable access to the transaction object is exclusive
        // _within_ a process "holding" the transaction permit.
        let mut tx_ref = self.tx.lock().await;

        if let Some(stale) = tx_ref.take() {
            warn!("rolling back transaction abandoned by previous permit holder");
            if let Err(err) = stale.rollback().await {
                warn!("rollback of abandoned transaction failed: {err}");
            }
        }

        let tx = self.pool.begin().await?;
        tx_ref.replace(tx);

        Ok(TransactionPermit(permit))
    }

    /// Rolls back the transaction and with that all uncommitted changes.
    ///
    /// This takes the permit and frees it after the rollback has finished. Other processes can now
    /// begin new transactions.
    async fn rollback(&self, permit: TransactionPermit) -> Result<(), SqliteError> {
        let Some(tx) = self.tx.lock().await.take() else {
            panic!("can't have no transaction without dropping permit first")
        };

        let result = tx.rollback().await.map_err(SqliteError::Sqlite);

        // Always drop the permit, both on successful rollback and error.
        drop(permit);

        result
    }

    /// Commits the transaction.
    ///
    /// This takes the permit and frees it after the commit has finished. Other processes can now
    /// begin new transactions.
    async fn commit(&self, permit: TransactionPermit) -> Result<(), SqliteError> {
        let Some(tx) = self.tx.lock().await.take() else {
            panic!("can't have no transaction without dropping permit first")
        };

        let result = tx.commit().await.map_err(SqliteError::Sqlite);

        // Always drop the permit, both on successful commit and error.
        drop(permit);

        result
    }
}

#[allow(unused)]
pub struct TransactionPermit(OwnedSemaphorePermit);

#[derive(Debug, Error)]
pub enum SqliteError {
    /// This is a critical error as it indicates that something is wrong with the usage of this
    /// API: Queries using transactions can only ever occur if a transaction was started _before_.
    #[error("tried to interact with inexistant transaction")]
    TransactionMissing,

    /// SQLite database and connection error.
    #[error(transparent)]
    Sqlite(#[from] sqlx::Error),

    /// SQL table schema migration error.
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}
