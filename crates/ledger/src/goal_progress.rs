//! Append-only goal progress history.
//!
//! Each row snapshots the goal amount just before and just after the event
//! was applied, so the history doubles as an audit trail. Rows are never
//! mutated or deleted; the optional `transaction_id` is a weak reference
//! (no foreign key), so deleting the triggering transaction leaves the
//! history intact.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LedgerError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    Contribution,
    Withdrawal,
    Adjustment,
}

impl ProgressKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contribution => "contribution",
            Self::Withdrawal => "withdrawal",
            Self::Adjustment => "adjustment",
        }
    }
}

impl TryFrom<&str> for ProgressKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "contribution" => Ok(Self::Contribution),
            "withdrawal" => Ok(Self::Withdrawal),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(LedgerError::Validation(format!(
                "invalid progress kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub user_id: String,
    pub transaction_id: Option<Uuid>,
    pub amount_minor: i64,
    pub kind: ProgressKind,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub goal_amount_before_minor: i64,
    pub goal_amount_after_minor: i64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "goal_progress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub goal_id: String,
    pub user_id: String,
    pub transaction_id: Option<String>,
    pub amount_minor: i64,
    pub kind: String,
    pub description: Option<String>,
    pub metadata: Option<String>,
    pub goal_amount_before_minor: i64,
    pub goal_amount_after_minor: i64,
    pub recorded_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::goals::Entity",
        from = "Column::GoalId",
        to = "super::goals::Column::Id"
    )]
    Goals,
}

impl Related<super::goals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Goals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&GoalProgress> for ActiveModel {
    fn from(progress: &GoalProgress) -> Self {
        Self {
            id: ActiveValue::Set(progress.id.to_string()),
            goal_id: ActiveValue::Set(progress.goal_id.to_string()),
            user_id: ActiveValue::Set(progress.user_id.clone()),
            transaction_id: ActiveValue::Set(progress.transaction_id.map(|id| id.to_string())),
            amount_minor: ActiveValue::Set(progress.amount_minor),
            kind: ActiveValue::Set(progress.kind.as_str().to_string()),
            description: ActiveValue::Set(progress.description.clone()),
            metadata: ActiveValue::Set(crate::transactions::encode_metadata(
                progress.metadata.as_ref(),
            )),
            goal_amount_before_minor: ActiveValue::Set(progress.goal_amount_before_minor),
            goal_amount_after_minor: ActiveValue::Set(progress.goal_amount_after_minor),
            recorded_at: ActiveValue::Set(progress.recorded_at),
        }
    }
}

impl TryFrom<Model> for GoalProgress {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::NotFound("goal progress".to_string()))?,
            goal_id: Uuid::parse_str(&model.goal_id)
                .map_err(|_| LedgerError::NotFound("goal".to_string()))?,
            user_id: model.user_id,
            transaction_id: model.transaction_id.and_then(|s| Uuid::parse_str(&s).ok()),
            amount_minor: model.amount_minor,
            kind: ProgressKind::try_from(model.kind.as_str())?,
            description: model.description,
            metadata: crate::transactions::decode_metadata(model.metadata.as_deref()),
            goal_amount_before_minor: model.goal_amount_before_minor,
            goal_amount_after_minor: model.goal_amount_after_minor,
            recorded_at: model.recorded_at,
        })
    }
}
