//! Goal progress tracker: the only writer of a goal's accumulated amount.

use std::time::Duration;

use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::commands::GoalProgressCmd;
use crate::goals::overshoot_cap_minor;
use crate::locks::LockKey;
use crate::{
    Goal, GoalProgress, GoalStatus, LedgerError, ProgressKind, ResultLedger, goal_progress, goals,
};

use super::{Engine, normalize_optional_text, with_tx};

impl Engine {
    /// Applies one progress event to a goal and appends the audit record.
    ///
    /// The new amount is `current + amount` for a contribution,
    /// `current - amount` (floored at zero) for a withdrawal, and `amount`
    /// itself for an adjustment. The appended record snapshots the amounts
    /// exactly as persisted, before and after.
    ///
    /// A contribution that reaches the target completes the goal, one-way:
    /// later withdrawals never revert `completed`. Any event that would push
    /// the amount past 1.5x the target is rejected with `GoalOverflow`
    /// before anything is written.
    pub async fn record_goal_progress(
        &self,
        cmd: GoalProgressCmd,
        deadline: Option<Duration>,
    ) -> ResultLedger<(GoalProgress, Goal)> {
        if cmd.amount_minor <= 0 {
            return Err(LedgerError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let recorded_at = cmd.recorded_at.unwrap_or_else(Utc::now);

        let cmd = &cmd;
        self.run_unit(LockKey::goal(cmd.goal_id), deadline, || {
            Box::pin(async move {
                with_tx!(self, |db_tx| {
                    let model = self.require_goal(&db_tx, cmd.goal_id).await?;
                    let mut goal = Goal::try_from(model)?;

                    let before_minor = goal.current_amount_minor;
                    let after_minor = match cmd.kind {
                        ProgressKind::Contribution => before_minor + cmd.amount_minor,
                        ProgressKind::Withdrawal => (before_minor - cmd.amount_minor).max(0),
                        ProgressKind::Adjustment => cmd.amount_minor,
                    };

                    let cap_minor = overshoot_cap_minor(goal.target_amount_minor);
                    if after_minor > cap_minor {
                        return Err(LedgerError::GoalOverflow(format!(
                            "goal '{}' holds at most {cap_minor}, event would leave {after_minor}",
                            goal.title
                        )));
                    }

                    goal.current_amount_minor = after_minor;
                    if cmd.kind == ProgressKind::Contribution
                        && after_minor >= goal.target_amount_minor
                        && goal.status == GoalStatus::Active
                    {
                        goal.status = GoalStatus::Completed;
                        goal.completed_at = Some(recorded_at);
                    }

                    let progress = GoalProgress {
                        id: Uuid::new_v4(),
                        goal_id: goal.id,
                        user_id: goal.user_id.clone(),
                        transaction_id: cmd.transaction_id,
                        amount_minor: cmd.amount_minor,
                        kind: cmd.kind,
                        description: normalize_optional_text(cmd.description.as_deref()),
                        metadata: cmd.metadata.clone(),
                        goal_amount_before_minor: before_minor,
                        goal_amount_after_minor: after_minor,
                        recorded_at,
                    };
                    goal_progress::ActiveModel::from(&progress)
                        .insert(&db_tx)
                        .await?;

                    let active = goals::ActiveModel {
                        id: ActiveValue::Set(goal.id.to_string()),
                        current_amount_minor: ActiveValue::Set(goal.current_amount_minor),
                        status: ActiveValue::Set(goal.status.as_str().to_string()),
                        completed_at: ActiveValue::Set(goal.completed_at),
                        ..Default::default()
                    };
                    active.update(&db_tx).await?;

                    Ok((progress, goal))
                })
            })
        })
        .await
    }

    /// Full append-only history for a goal, oldest first.
    pub async fn goal_history(&self, goal_id: Uuid) -> ResultLedger<Vec<GoalProgress>> {
        self.require_goal(&self.database, goal_id).await?;

        let rows = goal_progress::Entity::find()
            .filter(goal_progress::Column::GoalId.eq(goal_id.to_string()))
            .order_by_asc(goal_progress::Column::RecordedAt)
            .all(&self.database)
            .await?;

        rows.into_iter().map(GoalProgress::try_from).collect()
    }
}
