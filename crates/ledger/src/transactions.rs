//! Transaction primitives.
//!
//! A `Transaction` is a single signed ledger event owned by one user. Rows
//! are never hard-deleted: removal sets `deleted_at` and restoration clears
//! it, so `deleted_at.is_some()` is the soft-delete flag. Recurring
//! transactions act as templates; the scheduler materializes plain child
//! rows from them and advances `next_occurrence_at`.

use chrono::{DateTime, Duration, Months, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, LedgerError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }

    /// Direction of the balance change: `+1` income, `-1` expense,
    /// `0` transfer (reserved for multi-account support; counted but
    /// balance-neutral).
    #[must_use]
    pub const fn sign(self) -> i64 {
        match self {
            Self::Income => 1,
            Self::Expense => -1,
            Self::Transfer => 0,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(LedgerError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurringFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurringFrequency {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Next due date after `from`.
    ///
    /// Monthly and yearly steps move by calendar months, clamping to the
    /// last day of a shorter target month (Jan 31 + 1 month = Feb 28/29).
    #[must_use]
    pub fn next_occurrence(self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Daily => from + Duration::days(1),
            Self::Weekly => from + Duration::weeks(1),
            Self::Monthly => from.checked_add_months(Months::new(1)).unwrap_or(from),
            Self::Yearly => from.checked_add_months(Months::new(12)).unwrap_or(from),
        }
    }
}

impl TryFrom<&str> for RecurringFrequency {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(LedgerError::Validation(format!(
                "invalid recurring frequency: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub currency: Currency,
    pub category: String,
    pub description: Option<String>,
    pub account: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub metadata: Option<serde_json::Value>,
    /// `Some` marks a recurring template; the frequency drives the schedule.
    pub recurrence: Option<RecurringFrequency>,
    pub next_occurrence_at: Option<DateTime<Utc>>,
    /// Plain self-reference to the template that spawned this row, not an
    /// owning link.
    pub parent_transaction_id: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub currency: String,
    pub category: String,
    pub description: Option<String>,
    pub account: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub tags: Option<String>,
    pub metadata: Option<String>,
    pub is_recurring: bool,
    pub frequency: Option<String>,
    pub next_occurrence_at: Option<DateTimeUtc>,
    pub parent_transaction_id: Option<String>,
    pub deleted_at: Option<DateTimeUtc>,
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
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            category: ActiveValue::Set(tx.category.clone()),
            description: ActiveValue::Set(tx.description.clone()),
            account: ActiveValue::Set(tx.account.clone()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            tags: ActiveValue::Set(encode_tags(&tx.tags)),
            metadata: ActiveValue::Set(encode_metadata(tx.metadata.as_ref())),
            is_recurring: ActiveValue::Set(tx.recurrence.is_some()),
            frequency: ActiveValue::Set(tx.recurrence.map(|f| f.as_str().to_string())),
            next_occurrence_at: ActiveValue::Set(tx.next_occurrence_at),
            parent_transaction_id: ActiveValue::Set(
                tx.parent_transaction_id.map(|id| id.to_string()),
            ),
            deleted_at: ActiveValue::Set(tx.deleted_at),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::NotFound("transaction".to_string()))?,
            user_id: model.user_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            category: model.category,
            description: model.description,
            account: model.account,
            occurred_at: model.occurred_at,
            tags: decode_tags(model.tags.as_deref()),
            metadata: decode_metadata(model.metadata.as_deref()),
            recurrence: match model.frequency.as_deref() {
                Some(raw) => Some(RecurringFrequency::try_from(raw)?),
                None => None,
            },
            next_occurrence_at: model.next_occurrence_at,
            parent_transaction_id: model
                .parent_transaction_id
                .and_then(|s| Uuid::parse_str(&s).ok()),
            deleted_at: model.deleted_at,
            created_at: model.created_at,
        })
    }
}

pub(crate) fn encode_tags(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }
    serde_json::to_string(tags).ok()
}

pub(crate) fn decode_tags(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

pub(crate) fn encode_metadata(metadata: Option<&serde_json::Value>) -> Option<String> {
    metadata.and_then(|value| serde_json::to_string(value).ok())
}

pub(crate) fn decode_metadata(raw: Option<&str>) -> Option<serde_json::Value> {
    raw.and_then(|s| serde_json::from_str(s).ok())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn monthly_clamps_to_shorter_month() {
        let jan31 = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        let next = RecurringFrequency::Monthly.next_occurrence(jan31);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).unwrap());
    }

    #[test]
    fn yearly_clamps_leap_day() {
        let leap = Utc.with_ymd_and_hms(2024, 2, 29, 9, 30, 0).unwrap();
        let next = RecurringFrequency::Yearly.next_occurrence(leap);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 2, 28, 9, 30, 0).unwrap());
    }

    #[test]
    fn daily_and_weekly_are_fixed_steps() {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            RecurringFrequency::Daily.next_occurrence(base),
            base + Duration::days(1)
        );
        assert_eq!(
            RecurringFrequency::Weekly.next_occurrence(base),
            base + Duration::weeks(1)
        );
    }

    #[test]
    fn tags_round_trip_through_storage_encoding() {
        let tags = vec!["food".to_string(), "monthly".to_string()];
        let encoded = encode_tags(&tags);
        assert_eq!(decode_tags(encoded.as_deref()), tags);
        assert_eq!(encode_tags(&[]), None);
        assert!(decode_tags(Some("not json")).is_empty());
    }
}
