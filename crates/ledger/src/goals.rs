//! Savings goals.
//!
//! A goal accumulates progress events toward `target_amount_minor`. The
//! stored amount may overshoot the target, but never beyond the 1.5x cap
//! enforced by the progress tracker. `completed_at.is_some()` iff the status
//! is `Completed`.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, LedgerError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
    Paused,
}

impl GoalStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Paused => "paused",
        }
    }
}

impl TryFrom<&str> for GoalStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "paused" => Ok(Self::Paused),
            other => Err(LedgerError::Validation(format!(
                "invalid goal status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub target_amount_minor: i64,
    pub current_amount_minor: i64,
    pub currency: Currency,
    pub status: GoalStatus,
    pub priority: Option<i32>,
    pub category: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub start_date: DateTime<Utc>,
    pub target_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Highest amount the goal may hold: 1.5x the target.
    #[must_use]
    pub fn overshoot_cap_minor(&self) -> i64 {
        overshoot_cap_minor(self.target_amount_minor)
    }

    #[must_use]
    pub fn progress_percentage(&self) -> f64 {
        if self.target_amount_minor == 0 {
            return 0.0;
        }
        (self.current_amount_minor as f64 / self.target_amount_minor as f64) * 100.0
    }
}

pub(crate) fn overshoot_cap_minor(target_amount_minor: i64) -> i64 {
    target_amount_minor.saturating_mul(3) / 2
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "goals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub target_amount_minor: i64,
    pub current_amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub priority: Option<i32>,
    pub category: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub metadata: Option<String>,
    pub start_date: DateTimeUtc,
    pub target_date: Option<DateTimeUtc>,
    pub completed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(has_many = "super::goal_progress::Entity")]
    Progress,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::goal_progress::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Progress.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Goal> for ActiveModel {
    fn from(goal: &Goal) -> Self {
        Self {
            id: ActiveValue::Set(goal.id.to_string()),
            user_id: ActiveValue::Set(goal.user_id.clone()),
            title: ActiveValue::Set(goal.title.clone()),
            description: ActiveValue::Set(goal.description.clone()),
            target_amount_minor: ActiveValue::Set(goal.target_amount_minor),
            current_amount_minor: ActiveValue::Set(goal.current_amount_minor),
            currency: ActiveValue::Set(goal.currency.code().to_string()),
            status: ActiveValue::Set(goal.status.as_str().to_string()),
            priority: ActiveValue::Set(goal.priority),
            category: ActiveValue::Set(goal.category.clone()),
            icon: ActiveValue::Set(goal.icon.clone()),
            color: ActiveValue::Set(goal.color.clone()),
            metadata: ActiveValue::Set(crate::transactions::encode_metadata(
                goal.metadata.as_ref(),
            )),
            start_date: ActiveValue::Set(goal.start_date),
            target_date: ActiveValue::Set(goal.target_date),
            completed_at: ActiveValue::Set(goal.completed_at),
            created_at: ActiveValue::Set(goal.created_at),
        }
    }
}

impl TryFrom<Model> for Goal {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::NotFound("goal".to_string()))?,
            user_id: model.user_id,
            title: model.title,
            description: model.description,
            target_amount_minor: model.target_amount_minor,
            current_amount_minor: model.current_amount_minor,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            status: GoalStatus::try_from(model.status.as_str())?,
            priority: model.priority,
            category: model.category,
            icon: model.icon,
            color: model.color,
            metadata: crate::transactions::decode_metadata(model.metadata.as_deref()),
            start_date: model.start_date,
            target_date: model.target_date,
            completed_at: model.completed_at,
            created_at: model.created_at,
        })
    }
}
