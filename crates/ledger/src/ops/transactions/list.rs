use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, Statement, prelude::*};

use crate::{LedgerError, ResultLedger, Transaction, TransactionKind, transactions};

use super::super::Engine;

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<TransactionKind>>,
    /// If present, only transactions with this exact category.
    pub category: Option<String>,
    /// If true, includes soft-deleted transactions (default: false).
    pub include_deleted: bool,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultLedger<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(LedgerError::Validation(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(LedgerError::Validation(
            "kinds must not be empty".to_string(),
        ));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredAt.lt(to));
        }
        if !filter.include_deleted {
            self = self.filter(transactions::Column::DeletedAt.is_null());
        }
        if let Some(kinds) = &filter.kinds {
            let kinds: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
            self = self.filter(transactions::Column::Kind.is_in(kinds));
        }
        if let Some(category) = &filter.category {
            self = self.filter(transactions::Column::Category.eq(category.clone()));
        }
        self
    }
}

/// Per-category totals over a period, one row per (category, kind) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: String,
    pub kind: TransactionKind,
    pub total_minor: i64,
    pub count: i64,
}

impl Engine {
    /// Lists a user's most recent live transactions, newest first.
    pub async fn list_recent_transactions(
        &self,
        chat_id: &str,
        limit: u64,
    ) -> ResultLedger<Vec<Transaction>> {
        self.list_transactions(chat_id, limit, &TransactionListFilter::default())
            .await
    }

    /// Lists a user's transactions, newest first, honoring the filter.
    pub async fn list_transactions(
        &self,
        chat_id: &str,
        limit: u64,
        filter: &TransactionListFilter,
    ) -> ResultLedger<Vec<Transaction>> {
        validate_list_filter(filter)?;
        self.require_user(&self.database, chat_id).await?;

        let rows = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(chat_id))
            .apply_tx_filters(filter)
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::CreatedAt)
            .limit(limit)
            .all(&self.database)
            .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// Sums live transactions per (category, kind) over `[from, to)`,
    /// largest totals first.
    pub async fn category_breakdown(
        &self,
        chat_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ResultLedger<Vec<CategoryTotal>> {
        if from >= to {
            return Err(LedgerError::Validation(
                "invalid range: from must be < to".to_string(),
            ));
        }
        self.require_user(&self.database, chat_id).await?;

        let backend = self.database.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT category, kind, \
                    COALESCE(SUM(amount_minor), 0) AS total_minor, \
                    COUNT(id) AS count \
             FROM transactions \
             WHERE user_id = ? AND deleted_at IS NULL \
               AND occurred_at >= ? AND occurred_at < ? \
             GROUP BY category, kind \
             ORDER BY total_minor DESC",
            vec![chat_id.into(), from.into(), to.into()],
        );

        let rows = self.database.query_all(stmt).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let category: String = row.try_get("", "category")?;
            let kind: String = row.try_get("", "kind")?;
            let total_minor: i64 = row.try_get("", "total_minor")?;
            let count: i64 = row.try_get("", "count")?;
            out.push(CategoryTotal {
                category,
                kind: TransactionKind::try_from(kind.as_str())?,
                total_minor,
                count,
            });
        }
        Ok(out)
    }
}
