//! User records and their denormalized aggregates.
//!
//! A user is keyed by the stable external chat identifier handed in by the
//! (out-of-scope) front-end. The aggregate fields are maintained exclusively
//! by the balance accountant; the invariant
//! `current_balance_minor == total_income_minor - total_expenses_minor`
//! holds after every committed unit of work, computed over non-deleted
//! transactions only.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{Currency, LedgerError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    pub currency: Currency,
    pub timezone: String,
    pub transaction_count: i64,
    pub total_income_minor: i64,
    pub total_expenses_minor: i64,
    pub current_balance_minor: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// Aggregate snapshot returned by the balance query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub current_balance_minor: i64,
    pub total_income_minor: i64,
    pub total_expenses_minor: i64,
    pub transaction_count: i64,
    pub currency: Currency,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    pub currency: String,
    pub timezone: String,
    pub transaction_count: i64,
    pub total_income_minor: i64,
    pub total_expenses_minor: i64,
    pub current_balance_minor: i64,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub last_activity_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::goals::Entity")]
    Goals,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::goals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Goals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        Self {
            id: ActiveValue::Set(user.id.clone()),
            username: ActiveValue::Set(user.username.clone()),
            first_name: ActiveValue::Set(user.first_name.clone()),
            last_name: ActiveValue::Set(user.last_name.clone()),
            language_code: ActiveValue::Set(user.language_code.clone()),
            currency: ActiveValue::Set(user.currency.code().to_string()),
            timezone: ActiveValue::Set(user.timezone.clone()),
            transaction_count: ActiveValue::Set(user.transaction_count),
            total_income_minor: ActiveValue::Set(user.total_income_minor),
            total_expenses_minor: ActiveValue::Set(user.total_expenses_minor),
            current_balance_minor: ActiveValue::Set(user.current_balance_minor),
            is_active: ActiveValue::Set(user.is_active),
            created_at: ActiveValue::Set(user.created_at),
            last_activity_at: ActiveValue::Set(user.last_activity_at),
        }
    }
}

impl TryFrom<Model> for User {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            language_code: model.language_code,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            timezone: model.timezone,
            transaction_count: model.transaction_count,
            total_income_minor: model.total_income_minor,
            total_expenses_minor: model.total_expenses_minor,
            current_balance_minor: model.current_balance_minor,
            is_active: model.is_active,
            created_at: model.created_at,
            last_activity_at: model.last_activity_at,
        })
    }
}

impl From<&Model> for Balance {
    fn from(model: &Model) -> Self {
        Self {
            current_balance_minor: model.current_balance_minor,
            total_income_minor: model.total_income_minor,
            total_expenses_minor: model.total_expenses_minor,
            transaction_count: model.transaction_count,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
        }
    }
}
