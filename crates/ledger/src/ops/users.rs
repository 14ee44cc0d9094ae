use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, TransactionTrait, prelude::*};

use crate::commands::UserProfile;
use crate::locks::LockKey;
use crate::{Balance, Currency, LedgerError, ResultLedger, User, users};

use super::{Engine, normalize_optional_text, with_tx};

impl Engine {
    /// Gets or creates the user behind an external chat identity.
    ///
    /// Returns the user plus whether this call created it. An existing user
    /// only gets `last_activity_at` refreshed; profile fields are written
    /// once, on first contact.
    pub async fn ensure_user(&self, profile: UserProfile) -> ResultLedger<(User, bool)> {
        let chat_id = profile.chat_id.trim().to_string();
        if chat_id.is_empty() {
            return Err(LedgerError::Validation(
                "chat id must not be empty".to_string(),
            ));
        }
        let timezone = match profile.timezone.as_deref() {
            Some(raw) => {
                let tz: chrono_tz::Tz = raw
                    .parse()
                    .map_err(|_| LedgerError::Validation(format!("unknown timezone: {raw}")))?;
                tz.name().to_string()
            }
            None => "UTC".to_string(),
        };

        let profile = &profile;
        let chat_id = &chat_id;
        let timezone = &timezone;
        self.run_unit(LockKey::user(chat_id), None, || {
            Box::pin(async move {
                with_tx!(self, |db_tx| {
                    let existing = users::Entity::find_by_id(chat_id.clone())
                        .one(&db_tx)
                        .await?;
                    match existing {
                        Some(model) => {
                            let touched = users::ActiveModel {
                                id: ActiveValue::Set(model.id.clone()),
                                last_activity_at: ActiveValue::Set(Some(Utc::now())),
                                ..Default::default()
                            };
                            let model = touched.update(&db_tx).await?;
                            Ok((User::try_from(model)?, false))
                        }
                        None => {
                            let now = Utc::now();
                            let user = User {
                                id: chat_id.clone(),
                                username: normalize_optional_text(profile.username.as_deref()),
                                first_name: normalize_optional_text(profile.first_name.as_deref()),
                                last_name: normalize_optional_text(profile.last_name.as_deref()),
                                language_code: normalize_optional_text(
                                    profile.language_code.as_deref(),
                                ),
                                currency: profile.currency.unwrap_or_default(),
                                timezone: timezone.clone(),
                                transaction_count: 0,
                                total_income_minor: 0,
                                total_expenses_minor: 0,
                                current_balance_minor: 0,
                                is_active: true,
                                created_at: now,
                                last_activity_at: Some(now),
                            };
                            users::ActiveModel::from(&user).insert(&db_tx).await?;
                            Ok((user, true))
                        }
                    }
                })
            })
        })
        .await
    }

    /// Soft-deactivates a user. The record and its history stay in place;
    /// recurring templates of an inactive user are no longer materialized.
    pub async fn deactivate_user(&self, chat_id: &str) -> ResultLedger<()> {
        let chat_id = chat_id.to_string();
        let chat_id = &chat_id;
        self.run_unit(LockKey::user(chat_id), None, || {
            Box::pin(async move {
                with_tx!(self, |db_tx| {
                    let model = self.require_user(&db_tx, chat_id).await?;
                    if !model.is_active {
                        return Err(LedgerError::NoOp("user already inactive".to_string()));
                    }
                    let active = users::ActiveModel {
                        id: ActiveValue::Set(model.id),
                        is_active: ActiveValue::Set(false),
                        ..Default::default()
                    };
                    active.update(&db_tx).await?;
                    Ok(())
                })
            })
        })
        .await
    }

    /// Current aggregate snapshot for a user, read fresh from storage.
    pub async fn balance(&self, chat_id: &str) -> ResultLedger<Balance> {
        let model = self.require_user(&self.database, chat_id).await?;
        Ok(Balance::from(&model))
    }

    /// Currency a new record should carry when the caller left it unset.
    pub(crate) fn user_currency(model: &users::Model) -> Currency {
        Currency::try_from(model.currency.as_str()).unwrap_or_default()
    }

    pub(crate) async fn require_user<C>(
        &self,
        conn: &C,
        user_id: &str,
    ) -> ResultLedger<users::Model>
    where
        C: ConnectionTrait,
    {
        users::Entity::find_by_id(user_id.to_string())
            .one(conn)
            .await?
            .ok_or_else(|| LedgerError::NotFound("user".to_string()))
    }

    pub(crate) async fn require_active_user<C>(
        &self,
        conn: &C,
        user_id: &str,
    ) -> ResultLedger<users::Model>
    where
        C: ConnectionTrait,
    {
        let model = self.require_user(conn, user_id).await?;
        if !model.is_active {
            return Err(LedgerError::NotFound("user".to_string()));
        }
        Ok(model)
    }
}
