use std::time::Duration;

use chrono::Utc;
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::commands::AddTransactionCmd;
use crate::locks::LockKey;
use crate::ops::accountant::Transition;
use crate::{LedgerError, ResultLedger, Transaction, TransactionKind, transactions};

use super::super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

/// Confirmation returned by `add_transaction`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddedTransaction {
    pub transaction_id: Uuid,
    pub new_balance_minor: i64,
}

impl Engine {
    /// Records a transaction and updates the owner's aggregates as one
    /// atomic unit of work.
    ///
    /// A recurring command creates a template whose first due date is one
    /// frequency step after `occurred_at`; the scheduler materializes the
    /// actual occurrences from it.
    pub async fn add_transaction(
        &self,
        cmd: AddTransactionCmd,
        deadline: Option<Duration>,
    ) -> ResultLedger<AddedTransaction> {
        if cmd.amount_minor <= 0 {
            return Err(LedgerError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let category = normalize_required_text(&cmd.category, "category")?;
        let occurred_at = cmd.occurred_at.unwrap_or_else(Utc::now);
        let next_occurrence_at = cmd.recurrence.map(|f| f.next_occurrence(occurred_at));

        let cmd = &cmd;
        let category = &category;
        self.run_unit(LockKey::user(&cmd.user_id), deadline, || {
            Box::pin(async move {
                with_tx!(self, |db_tx| {
                    let user = self.require_active_user(&db_tx, &cmd.user_id).await?;

                    let tx = Transaction {
                        id: Uuid::new_v4(),
                        user_id: user.id.clone(),
                        kind: cmd.kind,
                        amount_minor: cmd.amount_minor,
                        currency: cmd.currency.unwrap_or_else(|| Self::user_currency(&user)),
                        category: category.clone(),
                        description: normalize_optional_text(cmd.description.as_deref()),
                        account: normalize_optional_text(cmd.account.as_deref()),
                        occurred_at,
                        tags: cmd.tags.clone(),
                        metadata: cmd.metadata.clone(),
                        recurrence: cmd.recurrence,
                        next_occurrence_at,
                        parent_transaction_id: None,
                        deleted_at: None,
                        created_at: Utc::now(),
                    };
                    transactions::ActiveModel::from(&tx).insert(&db_tx).await?;

                    let new_balance_minor = self
                        .apply_transition(
                            &db_tx,
                            &tx.user_id,
                            Transition::Insert,
                            tx.kind,
                            tx.amount_minor,
                            Utc::now(),
                        )
                        .await?;

                    Ok(AddedTransaction {
                        transaction_id: tx.id,
                        new_balance_minor,
                    })
                })
            })
        })
        .await
    }

    /// Soft-deletes a transaction and reverses its effect on the owner's
    /// aggregates. Returns the new balance.
    pub async fn remove_transaction(
        &self,
        transaction_id: Uuid,
        deadline: Option<Duration>,
    ) -> ResultLedger<i64> {
        let owner = self.transaction_owner(transaction_id).await?;
        let owner = &owner;
        self.run_unit(LockKey::user(owner), deadline, || {
            Box::pin(async move {
                with_tx!(self, |db_tx| {
                    let model = self.require_transaction(&db_tx, transaction_id).await?;
                    if model.deleted_at.is_some() {
                        return Err(LedgerError::NoOp(
                            "transaction already removed".to_string(),
                        ));
                    }
                    let kind = TransactionKind::try_from(model.kind.as_str())?;

                    let active = transactions::ActiveModel {
                        id: ActiveValue::Set(model.id.clone()),
                        deleted_at: ActiveValue::Set(Some(Utc::now())),
                        ..Default::default()
                    };
                    active.update(&db_tx).await?;

                    self.apply_transition(
                        &db_tx,
                        &model.user_id,
                        Transition::SoftDelete,
                        kind,
                        model.amount_minor,
                        Utc::now(),
                    )
                    .await
                })
            })
        })
        .await
    }

    /// Restores a soft-deleted transaction and re-applies its effect on the
    /// owner's aggregates. Returns the new balance.
    pub async fn restore_transaction(
        &self,
        transaction_id: Uuid,
        deadline: Option<Duration>,
    ) -> ResultLedger<i64> {
        let owner = self.transaction_owner(transaction_id).await?;
        let owner = &owner;
        self.run_unit(LockKey::user(owner), deadline, || {
            Box::pin(async move {
                with_tx!(self, |db_tx| {
                    let model = self.require_transaction(&db_tx, transaction_id).await?;
                    if model.deleted_at.is_none() {
                        return Err(LedgerError::NoOp("transaction not removed".to_string()));
                    }
                    let kind = TransactionKind::try_from(model.kind.as_str())?;

                    let active = transactions::ActiveModel {
                        id: ActiveValue::Set(model.id.clone()),
                        deleted_at: ActiveValue::Set(None),
                        ..Default::default()
                    };
                    active.update(&db_tx).await?;

                    self.apply_transition(
                        &db_tx,
                        &model.user_id,
                        Transition::Restore,
                        kind,
                        model.amount_minor,
                        Utc::now(),
                    )
                    .await
                })
            })
        })
        .await
    }

    async fn transaction_owner(&self, transaction_id: Uuid) -> ResultLedger<String> {
        let model = transactions::Entity::find_by_id(transaction_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| LedgerError::NotFound("transaction".to_string()))?;
        Ok(model.user_id)
    }

    pub(crate) async fn require_transaction<C>(
        &self,
        conn: &C,
        transaction_id: Uuid,
    ) -> ResultLedger<transactions::Model>
    where
        C: sea_orm::ConnectionTrait,
    {
        transactions::Entity::find_by_id(transaction_id.to_string())
            .one(conn)
            .await?
            .ok_or_else(|| LedgerError::NotFound("transaction".to_string()))
    }
}
