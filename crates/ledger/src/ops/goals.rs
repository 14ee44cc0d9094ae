use std::time::Duration;

use chrono::Utc;
use sea_orm::sea_query::NullOrdering;
use sea_orm::{
    ConnectionTrait, Order, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::commands::CreateGoalCmd;
use crate::locks::LockKey;
use crate::{Goal, GoalStatus, LedgerError, ProgressKind, ResultLedger, goals};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

/// Read-model answer for the goal summary query.
#[derive(Clone, Debug, PartialEq)]
pub struct GoalSummary {
    pub goal_id: Uuid,
    pub title: String,
    pub status: GoalStatus,
    pub target_amount_minor: i64,
    pub current_amount_minor: i64,
    pub progress_percentage: f64,
    /// Distance to the target, floored at zero once reached.
    pub remaining_minor: i64,
    pub contributions_minor: i64,
    pub withdrawals_minor: i64,
    pub event_count: i64,
}

impl Engine {
    /// Creates a goal with `current_amount = 0` and `status = active`.
    pub async fn create_goal(
        &self,
        cmd: CreateGoalCmd,
        deadline: Option<Duration>,
    ) -> ResultLedger<Goal> {
        if cmd.target_amount_minor <= 0 {
            return Err(LedgerError::Validation(
                "target_amount_minor must be > 0".to_string(),
            ));
        }
        let title = normalize_required_text(&cmd.title, "title")?;
        if let Some(priority) = cmd.priority
            && !(1..=5).contains(&priority)
        {
            return Err(LedgerError::Validation(
                "priority must be between 1 and 5".to_string(),
            ));
        }
        let start_date = cmd.start_date.unwrap_or_else(Utc::now);
        if let Some(target_date) = cmd.target_date
            && target_date <= start_date
        {
            return Err(LedgerError::Validation(
                "target_date must be after start_date".to_string(),
            ));
        }

        let cmd = &cmd;
        let title = &title;
        self.run_unit(LockKey::user(&cmd.user_id), deadline, || {
            Box::pin(async move {
                with_tx!(self, |db_tx| {
                    let user = self.require_active_user(&db_tx, &cmd.user_id).await?;

                    let goal = Goal {
                        id: Uuid::new_v4(),
                        user_id: user.id.clone(),
                        title: title.clone(),
                        description: normalize_optional_text(cmd.description.as_deref()),
                        target_amount_minor: cmd.target_amount_minor,
                        current_amount_minor: 0,
                        currency: cmd.currency.unwrap_or_else(|| Self::user_currency(&user)),
                        status: GoalStatus::Active,
                        priority: cmd.priority,
                        category: normalize_optional_text(cmd.category.as_deref()),
                        icon: cmd.icon.clone(),
                        color: cmd.color.clone(),
                        metadata: cmd.metadata.clone(),
                        start_date,
                        target_date: cmd.target_date,
                        completed_at: None,
                        created_at: Utc::now(),
                    };
                    goals::ActiveModel::from(&goal).insert(&db_tx).await?;
                    Ok(goal)
                })
            })
        })
        .await
    }

    /// Lists a user's goals, optionally filtered by status, nearest target
    /// date first (goals without one come last).
    pub async fn list_goals(
        &self,
        chat_id: &str,
        status: Option<GoalStatus>,
    ) -> ResultLedger<Vec<Goal>> {
        self.require_user(&self.database, chat_id).await?;

        let mut query = goals::Entity::find().filter(goals::Column::UserId.eq(chat_id));
        if let Some(status) = status {
            query = query.filter(goals::Column::Status.eq(status.as_str()));
        }
        let rows = query
            .order_by_with_nulls(goals::Column::TargetDate, Order::Asc, NullOrdering::Last)
            .order_by_asc(goals::Column::CreatedAt)
            .all(&self.database)
            .await?;

        rows.into_iter().map(Goal::try_from).collect()
    }

    /// Progress figures for one goal, including contribution/withdrawal
    /// totals from the append-only history.
    pub async fn goal_summary(&self, goal_id: Uuid) -> ResultLedger<GoalSummary> {
        let goal = self.require_goal(&self.database, goal_id).await?;
        let goal = Goal::try_from(goal)?;

        let backend = self.database.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT kind, \
                    COALESCE(SUM(amount_minor), 0) AS total_minor, \
                    COUNT(id) AS count \
             FROM goal_progress \
             WHERE goal_id = ? \
             GROUP BY kind",
            vec![goal_id.to_string().into()],
        );

        let mut contributions_minor = 0i64;
        let mut withdrawals_minor = 0i64;
        let mut event_count = 0i64;
        for row in self.database.query_all(stmt).await? {
            let kind: String = row.try_get("", "kind")?;
            let total_minor: i64 = row.try_get("", "total_minor")?;
            let count: i64 = row.try_get("", "count")?;
            event_count += count;
            match ProgressKind::try_from(kind.as_str())? {
                ProgressKind::Contribution => contributions_minor = total_minor,
                ProgressKind::Withdrawal => withdrawals_minor = total_minor,
                ProgressKind::Adjustment => {}
            }
        }

        Ok(GoalSummary {
            goal_id: goal.id,
            title: goal.title.clone(),
            status: goal.status,
            target_amount_minor: goal.target_amount_minor,
            current_amount_minor: goal.current_amount_minor,
            progress_percentage: goal.progress_percentage(),
            remaining_minor: (goal.target_amount_minor - goal.current_amount_minor).max(0),
            contributions_minor,
            withdrawals_minor,
            event_count,
        })
    }

    pub(crate) async fn require_goal<C>(
        &self,
        conn: &C,
        goal_id: Uuid,
    ) -> ResultLedger<goals::Model>
    where
        C: ConnectionTrait,
    {
        goals::Entity::find_by_id(goal_id.to_string())
            .one(conn)
            .await?
            .ok_or_else(|| LedgerError::NotFound("goal".to_string()))
    }
}
