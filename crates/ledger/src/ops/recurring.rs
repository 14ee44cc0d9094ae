//! Recurrence materialization.
//!
//! Recurring transactions are templates. When a template's
//! `next_occurrence_at` arrives, a sweep materializes one plain child
//! transaction dated at the due occurrence and advances the template's
//! schedule by its frequency. Advancing and materializing happen in the
//! same database transaction, guarded by a compare-and-swap on the due
//! date, so concurrent sweeps produce at most one child per occurrence.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    JoinType, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::locks::LockKey;
use crate::ops::accountant::Transition;
use crate::{LedgerError, ResultLedger, Transaction, transactions, users};

use super::{Engine, with_tx};

/// Outcome counters for one scheduler pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub materialized: u64,
    pub skipped: u64,
    pub failed: u64,
}

enum MaterializeOutcome {
    Materialized(Uuid),
    Skipped,
}

impl Engine {
    /// Lists recurring templates due at `now` and owned by active users,
    /// oldest due date first.
    pub async fn list_due_recurring(
        &self,
        now: DateTime<Utc>,
    ) -> ResultLedger<Vec<Transaction>> {
        let rows = transactions::Entity::find()
            .filter(transactions::Column::IsRecurring.eq(true))
            .filter(transactions::Column::DeletedAt.is_null())
            .filter(transactions::Column::NextOccurrenceAt.lte(now))
            .join(JoinType::InnerJoin, transactions::Relation::Users.def())
            .filter(users::Column::IsActive.eq(true))
            .order_by_asc(transactions::Column::NextOccurrenceAt)
            .all(&self.database)
            .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// One scheduler pass over everything due at `now`.
    ///
    /// Safe to run concurrently with other passes: the loser of a race over
    /// a template finds the date already advanced and skips without side
    /// effects. A failure on one item is reported and never blocks the
    /// remaining items.
    pub async fn run_recurrence_sweep(&self, now: DateTime<Utc>) -> ResultLedger<SweepReport> {
        let due = self.list_due_recurring(now).await?;
        let mut report = SweepReport::default();
        for template in &due {
            match self.materialize_occurrence(template).await {
                Ok(MaterializeOutcome::Materialized(child_id)) => {
                    tracing::debug!(
                        template = %template.id,
                        child = %child_id,
                        "materialized recurring occurrence"
                    );
                    report.materialized += 1;
                }
                Ok(MaterializeOutcome::Skipped) => report.skipped += 1,
                Err(err) => {
                    tracing::warn!(
                        template = %template.id,
                        error = %err,
                        "failed to materialize recurring occurrence"
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn materialize_occurrence(
        &self,
        template: &Transaction,
    ) -> ResultLedger<MaterializeOutcome> {
        let Some(frequency) = template.recurrence else {
            return Err(LedgerError::Validation(
                "recurring template without frequency".to_string(),
            ));
        };
        let Some(due_at) = template.next_occurrence_at else {
            return Err(LedgerError::Validation(
                "recurring template without next occurrence".to_string(),
            ));
        };

        self.run_unit(LockKey::user(&template.user_id), None, || {
            Box::pin(async move {
                with_tx!(self, |db_tx| {
                    let owner = users::Entity::find_by_id(template.user_id.clone())
                        .one(&db_tx)
                        .await?;
                    if !owner.is_some_and(|user| user.is_active) {
                        Ok(MaterializeOutcome::Skipped)
                    } else {
                        // Claim the occurrence: advance the schedule only if
                        // no other pass got there first.
                        let claimed = transactions::Entity::update_many()
                            .col_expr(
                                transactions::Column::NextOccurrenceAt,
                                Expr::value(frequency.next_occurrence(due_at)),
                            )
                            .filter(transactions::Column::Id.eq(template.id.to_string()))
                            .filter(transactions::Column::NextOccurrenceAt.eq(due_at))
                            .filter(transactions::Column::DeletedAt.is_null())
                            .exec(&db_tx)
                            .await?;
                        if claimed.rows_affected == 0 {
                            Ok(MaterializeOutcome::Skipped)
                        } else {
                            // Materialized occurrences are one-off children;
                            // the template alone carries the schedule
                            // forward.
                            let child = Transaction {
                                id: Uuid::new_v4(),
                                user_id: template.user_id.clone(),
                                kind: template.kind,
                                amount_minor: template.amount_minor,
                                currency: template.currency,
                                category: template.category.clone(),
                                description: template.description.clone(),
                                account: template.account.clone(),
                                occurred_at: due_at,
                                tags: template.tags.clone(),
                                metadata: template.metadata.clone(),
                                recurrence: None,
                                next_occurrence_at: None,
                                parent_transaction_id: Some(template.id),
                                deleted_at: None,
                                created_at: Utc::now(),
                            };
                            transactions::ActiveModel::from(&child).insert(&db_tx).await?;

                            self.apply_transition(
                                &db_tx,
                                &child.user_id,
                                Transition::Insert,
                                child.kind,
                                child.amount_minor,
                                Utc::now(),
                            )
                            .await?;

                            Ok(MaterializeOutcome::Materialized(child.id))
                        }
                    }
                })
            })
        })
        .await
    }
}
