//! Connection pool and per-operation transaction scope.
//!
//! Every logical store operation borrows one pooled connection and runs
//! inside a transaction that resolves to commit-or-rollback at scope exit:
//! commit when the closure returns `Ok`, rollback when it returns `Err`.
//! The outcome is always a `Result`; nothing escapes as a panic or a
//! half-applied write.

use std::time::Duration;

use diesel_async::pooled_connection::bb8::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedBoxFuture;
use diesel_async::{AsyncConnection, AsyncPgConnection};

/// Errors that can occur while acquiring pooled connections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Failed to check out a connection within the configured timeout.
    #[error("failed to get connection from pool: {message}")]
    Checkout { message: String },

    /// Failed to build the connection pool.
    #[error("failed to build connection pool: {message}")]
    Build { message: String },
}

impl PoolError {
    /// Create a checkout error with the given message.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Create a build error with the given message.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }
}

/// Failure of a transaction-scoped operation: either the connection could
/// not be obtained, or the operation body failed and was rolled back.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Connection acquisition failed; the operation never started.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The operation body failed; the transaction was rolled back.
    #[error(transparent)]
    Query(#[from] diesel::result::Error),
}

/// Configuration for the database connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    connection_timeout: Duration,
}

impl PoolConfig {
    /// Create a configuration with default sizing (10 connections, 30 s
    /// checkout timeout).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: 10,
            connection_timeout: Duration::from_secs(30),
        }
    }

    /// Set the maximum number of pooled connections.
    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the connection checkout timeout.
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// The configured database URL.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Async connection pool for PostgreSQL via Diesel.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Build a pool from the given configuration.
    ///
    /// # Errors
    /// Returns [`PoolError::Build`] when the pool cannot be constructed,
    /// e.g. for an unparseable database URL.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let manager =
            AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;
        Ok(Self { inner: pool })
    }

    /// Run `callback` on one pooled connection inside a transaction.
    ///
    /// The transaction commits when the callback returns `Ok` and rolls
    /// back when it returns `Err`; either way the connection returns to the
    /// pool at scope exit.
    ///
    /// # Errors
    /// [`TransactionError::Pool`] when no connection could be checked out;
    /// [`TransactionError::Query`] with the callback's error after rollback.
    pub async fn with_transaction<'a, R, F>(&self, callback: F) -> Result<R, TransactionError>
    where
        F: for<'c> FnOnce(
                &'c mut AsyncPgConnection,
            )
                -> ScopedBoxFuture<'a, 'c, Result<R, diesel::result::Error>>
            + Send
            + 'a,
        R: Send + 'a,
    {
        let mut conn = self
            .inner
            .get()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))?;
        let result = (*conn).transaction(callback).await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_config_default_values() {
        let config = PoolConfig::new("postgres://localhost/test");
        assert_eq!(config.database_url(), "postgres://localhost/test");
        assert_eq!(config.max_size, 10);
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
    }

    #[rstest]
    fn pool_config_builder_pattern() {
        let config = PoolConfig::new("postgres://localhost/test")
            .with_max_size(4)
            .with_connection_timeout(Duration::from_secs(10));
        assert_eq!(config.max_size, 4);
        assert_eq!(config.connection_timeout, Duration::from_secs(10));
    }

    #[rstest]
    fn pool_error_display_carries_message() {
        assert!(PoolError::checkout("connection refused")
            .to_string()
            .contains("connection refused"));
        assert!(PoolError::build("invalid URL").to_string().contains("invalid URL"));
    }
}
