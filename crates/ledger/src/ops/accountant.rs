//! Balance accountant: the only writer of user aggregate fields.
//!
//! Every transaction lifecycle transition funnels through
//! `apply_transition`, inside the unit of work that also writes the
//! transaction row, so readers never observe the aggregates and the rows
//! out of step.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, TransactionTrait, prelude::*};

use crate::locks::LockKey;
use crate::{Balance, ResultLedger, TransactionKind, transactions, users};

use super::{Engine, with_tx};

/// Lifecycle transition of a transaction as seen by the accountant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Transition {
    Insert,
    SoftDelete,
    Restore,
}

impl Engine {
    /// Applies one lifecycle transition to the owning user's aggregates and
    /// returns the new balance.
    ///
    /// Soft-delete reverses the insert using the transaction's original
    /// amount and kind; restore re-applies it. Transfers leave the balance
    /// and the income/expense totals untouched but still count toward
    /// `transaction_count`.
    pub(crate) async fn apply_transition<C>(
        &self,
        conn: &C,
        user_id: &str,
        transition: Transition,
        kind: TransactionKind,
        amount_minor: i64,
        now: DateTime<Utc>,
    ) -> ResultLedger<i64>
    where
        C: ConnectionTrait,
    {
        let user = self.require_user(conn, user_id).await?;

        let direction: i64 = match transition {
            Transition::Insert | Transition::Restore => 1,
            Transition::SoftDelete => -1,
        };

        let income_delta = match kind {
            TransactionKind::Income => direction * amount_minor,
            TransactionKind::Expense | TransactionKind::Transfer => 0,
        };
        let expense_delta = match kind {
            TransactionKind::Expense => direction * amount_minor,
            TransactionKind::Income | TransactionKind::Transfer => 0,
        };
        let new_balance_minor =
            user.current_balance_minor + direction * kind.sign() * amount_minor;

        let active = users::ActiveModel {
            id: ActiveValue::Set(user.id),
            transaction_count: ActiveValue::Set(user.transaction_count + direction),
            total_income_minor: ActiveValue::Set(user.total_income_minor + income_delta),
            total_expenses_minor: ActiveValue::Set(user.total_expenses_minor + expense_delta),
            current_balance_minor: ActiveValue::Set(new_balance_minor),
            last_activity_at: match transition {
                Transition::Insert | Transition::Restore => ActiveValue::Set(Some(now)),
                Transition::SoftDelete => ActiveValue::NotSet,
            },
            ..Default::default()
        };
        active.update(conn).await?;

        Ok(new_balance_minor)
    }

    /// Recomputes a user's denormalized aggregates from the transaction
    /// history, ignoring soft-deleted rows, and returns the repaired
    /// snapshot.
    pub async fn recompute_aggregates(&self, chat_id: &str) -> ResultLedger<Balance> {
        let chat_id = chat_id.to_string();
        let chat_id = &chat_id;
        self.run_unit(LockKey::user(chat_id), None, || {
            Box::pin(async move {
                with_tx!(self, |db_tx| {
                    let user = self.require_user(&db_tx, chat_id).await?;

                    let rows = transactions::Entity::find()
                        .filter(transactions::Column::UserId.eq(chat_id.as_str()))
                        .filter(transactions::Column::DeletedAt.is_null())
                        .all(&db_tx)
                        .await?;

                    let mut transaction_count = 0i64;
                    let mut total_income_minor = 0i64;
                    let mut total_expenses_minor = 0i64;
                    for row in &rows {
                        let kind = TransactionKind::try_from(row.kind.as_str())?;
                        transaction_count += 1;
                        match kind {
                            TransactionKind::Income => total_income_minor += row.amount_minor,
                            TransactionKind::Expense => total_expenses_minor += row.amount_minor,
                            TransactionKind::Transfer => {}
                        }
                    }
                    let current_balance_minor = total_income_minor - total_expenses_minor;

                    let active = users::ActiveModel {
                        id: ActiveValue::Set(user.id.clone()),
                        transaction_count: ActiveValue::Set(transaction_count),
                        total_income_minor: ActiveValue::Set(total_income_minor),
                        total_expenses_minor: ActiveValue::Set(total_expenses_minor),
                        current_balance_minor: ActiveValue::Set(current_balance_minor),
                        ..Default::default()
                    };
                    let model = active.update(&db_tx).await?;
                    Ok(Balance::from(&model))
                })
            })
        })
        .await
    }
}
