use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::locks::{EntityLocks, LockKey};
use crate::{LedgerError, ResultLedger};

mod accountant;
mod goals;
mod progress;
mod recurring;
mod transactions;
mod users;

pub use goals::GoalSummary;
pub use recurring::SweepReport;
pub use transactions::{AddedTransaction, CategoryTotal, TransactionListFilter};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Boxed future produced by one attempt of a unit of work.
pub(crate) type UnitFuture<'a, T> =
    Pin<Box<dyn Future<Output = ResultLedger<T>> + Send + 'a>>;

const STORAGE_RETRY_LIMIT: u32 = 3;
const STORAGE_RETRY_BASE: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    locks: EntityLocks,
    retry_limit: u32,
    retry_base: Duration,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Runs one facade unit of work.
    ///
    /// Waits for the entity lock, then runs `unit` (which opens and commits
    /// its own DB transaction via `with_tx!`), retrying a bounded number of
    /// times on storage failure. The caller deadline covers the whole call,
    /// lock wait included; when it fires, the in-flight transaction is
    /// dropped and rolls back, so no partial state persists.
    pub(crate) async fn run_unit<'a, T, F>(
        &'a self,
        key: LockKey,
        deadline: Option<Duration>,
        unit: F,
    ) -> ResultLedger<T>
    where
        T: Send,
        F: Fn() -> UnitFuture<'a, T> + Send + Sync + 'a,
    {
        match deadline {
            Some(limit) => tokio::time::timeout(limit, self.locked_attempts(key, unit))
                .await
                .unwrap_or(Err(LedgerError::Timeout)),
            None => self.locked_attempts(key, unit).await,
        }
    }

    async fn locked_attempts<'a, T, F>(&'a self, key: LockKey, unit: F) -> ResultLedger<T>
    where
        F: Fn() -> UnitFuture<'a, T>,
    {
        let _guard = self.locks.acquire(key).await;
        let mut attempt = 0u32;
        loop {
            match unit().await {
                Err(LedgerError::Storage(err)) if attempt < self.retry_limit => {
                    attempt += 1;
                    let backoff = self.retry_base * 2u32.saturating_pow(attempt - 1);
                    tracing::warn!(
                        error = %err,
                        attempt,
                        "storage failure, retrying unit of work"
                    );
                    tokio::time::sleep(backoff).await;
                }
                outcome => return outcome,
            }
        }
    }
}

fn normalize_required_text(value: &str, label: &str) -> ResultLedger<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    retry_limit: Option<u32>,
    retry_base: Option<Duration>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the bounded retry applied to storage failures.
    pub fn storage_retry(mut self, limit: u32, base: Duration) -> EngineBuilder {
        self.retry_limit = Some(limit);
        self.retry_base = Some(base);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultLedger<Engine> {
        Ok(Engine {
            database: self.database,
            locks: EntityLocks::default(),
            retry_limit: self.retry_limit.unwrap_or(STORAGE_RETRY_LIMIT),
            retry_base: self.retry_base.unwrap_or(STORAGE_RETRY_BASE),
        })
    }
}
