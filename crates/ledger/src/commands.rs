//! Command structs for ledger operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists. Fields left unset fall back
//! to the documented defaults at execution time.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Currency, ProgressKind, RecurringFrequency, TransactionKind};

/// Identity and preferences captured on first contact.
#[derive(Clone, Debug)]
pub struct UserProfile {
    pub chat_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    pub currency: Option<Currency>,
    pub timezone: Option<String>,
}

impl UserProfile {
    #[must_use]
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            username: None,
            first_name: None,
            last_name: None,
            language_code: None,
            currency: None,
            timezone: None,
        }
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    #[must_use]
    pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    #[must_use]
    pub fn language_code(mut self, code: impl Into<String>) -> Self {
        self.language_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// Record a transaction against a user's ledger.
#[derive(Clone, Debug)]
pub struct AddTransactionCmd {
    pub user_id: String,
    pub amount_minor: i64,
    pub kind: TransactionKind,
    pub category: String,
    pub description: Option<String>,
    pub currency: Option<Currency>,
    pub account: Option<String>,
    /// Defaults to now when unset.
    pub occurred_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub metadata: Option<serde_json::Value>,
    /// Marks the transaction as a recurring template.
    pub recurrence: Option<RecurringFrequency>,
}

impl AddTransactionCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        amount_minor: i64,
        kind: TransactionKind,
        category: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            amount_minor,
            kind,
            category: category.into(),
            description: None,
            currency: None,
            account: None,
            occurred_at: None,
            tags: Vec::new(),
            metadata: None,
            recurrence: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn recurring(mut self, frequency: RecurringFrequency) -> Self {
        self.recurrence = Some(frequency);
        self
    }
}

/// Create a savings goal.
#[derive(Clone, Debug)]
pub struct CreateGoalCmd {
    pub user_id: String,
    pub title: String,
    pub target_amount_minor: i64,
    pub description: Option<String>,
    pub currency: Option<Currency>,
    pub category: Option<String>,
    /// 1 (highest) to 5 (lowest).
    pub priority: Option<i32>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub metadata: Option<serde_json::Value>,
    /// Defaults to now when unset.
    pub start_date: Option<DateTime<Utc>>,
    pub target_date: Option<DateTime<Utc>>,
}

impl CreateGoalCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        target_amount_minor: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            target_amount_minor,
            description: None,
            currency: None,
            category: None,
            priority: None,
            icon: None,
            color: None,
            metadata: None,
            start_date: None,
            target_date: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    #[must_use]
    pub fn target_date(mut self, target_date: DateTime<Utc>) -> Self {
        self.target_date = Some(target_date);
        self
    }
}

/// Apply a progress event to a goal.
#[derive(Clone, Debug)]
pub struct GoalProgressCmd {
    pub goal_id: Uuid,
    pub amount_minor: i64,
    pub kind: ProgressKind,
    /// Weak reference to the transaction that triggered the event.
    pub transaction_id: Option<Uuid>,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    /// Defaults to now when unset.
    pub recorded_at: Option<DateTime<Utc>>,
}

impl GoalProgressCmd {
    #[must_use]
    pub fn new(goal_id: Uuid, amount_minor: i64, kind: ProgressKind) -> Self {
        Self {
            goal_id,
            amount_minor,
            kind,
            transaction_id: None,
            description: None,
            metadata: None,
            recorded_at: None,
        }
    }

    #[must_use]
    pub fn transaction_id(mut self, transaction_id: Uuid) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn recorded_at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(recorded_at);
        self
    }
}
