use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use ledger::{
    AddTransactionCmd, Engine, LedgerError, TransactionKind, TransactionListFilter, UserProfile,
};
use migration::MigratorTrait;

async fn ledger_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    (engine, db)
}

async fn user(engine: &Engine, chat_id: &str) {
    engine
        .ensure_user(UserProfile::new(chat_id).first_name("Test"))
        .await
        .unwrap();
}

#[tokio::test]
async fn ensure_user_is_idempotent_and_touches_activity() {
    let (engine, _db) = ledger_with_db().await;

    let (created_user, created) = engine
        .ensure_user(UserProfile::new("42").username("alice"))
        .await
        .unwrap();
    assert!(created);
    assert_eq!(created_user.current_balance_minor, 0);
    assert!(created_user.is_active);

    let (again, created) = engine
        .ensure_user(UserProfile::new("42").username("ignored"))
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(again.username.as_deref(), Some("alice"));
    assert!(again.last_activity_at >= created_user.last_activity_at);
}

#[tokio::test]
async fn ensure_user_rejects_bad_input() {
    let (engine, _db) = ledger_with_db().await;

    let err = engine.ensure_user(UserProfile::new("  ")).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = engine
        .ensure_user(UserProfile::new("42").timezone("Mars/Olympus"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn balance_invariant_holds_after_every_operation() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "42").await;

    let income = engine
        .add_transaction(
            AddTransactionCmd::new("42", 5000, TransactionKind::Income, "salary"),
            None,
        )
        .await
        .unwrap();
    let expense = engine
        .add_transaction(
            AddTransactionCmd::new("42", 1200, TransactionKind::Expense, "rent"),
            None,
        )
        .await
        .unwrap();
    engine
        .add_transaction(
            AddTransactionCmd::new("42", 300, TransactionKind::Transfer, "moves"),
            None,
        )
        .await
        .unwrap();
    engine
        .remove_transaction(expense.transaction_id, None)
        .await
        .unwrap();
    engine
        .restore_transaction(expense.transaction_id, None)
        .await
        .unwrap();
    engine
        .remove_transaction(income.transaction_id, None)
        .await
        .unwrap();

    let balance = engine.balance("42").await.unwrap();
    assert_eq!(
        balance.current_balance_minor,
        balance.total_income_minor - balance.total_expenses_minor
    );
    assert_eq!(balance.total_income_minor, 0);
    assert_eq!(balance.total_expenses_minor, 1200);
    assert_eq!(balance.current_balance_minor, -1200);
    assert_eq!(balance.transaction_count, 2);
}

#[tokio::test]
async fn soft_delete_round_trip_restores_aggregates() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "42").await;

    engine
        .add_transaction(
            AddTransactionCmd::new("42", 1000, TransactionKind::Income, "salary"),
            None,
        )
        .await
        .unwrap();
    let expense = engine
        .add_transaction(
            AddTransactionCmd::new("42", 200, TransactionKind::Expense, "food"),
            None,
        )
        .await
        .unwrap();
    let after_insert = engine.balance("42").await.unwrap();

    engine
        .remove_transaction(expense.transaction_id, None)
        .await
        .unwrap();
    let while_removed = engine.balance("42").await.unwrap();
    assert_eq!(while_removed.current_balance_minor, 1000);
    assert_eq!(while_removed.total_expenses_minor, 0);
    assert_eq!(while_removed.transaction_count, 1);

    engine
        .restore_transaction(expense.transaction_id, None)
        .await
        .unwrap();
    let after_restore = engine.balance("42").await.unwrap();
    assert_eq!(after_restore, after_insert);
}

#[tokio::test]
async fn transfers_count_but_do_not_move_totals() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "42").await;

    let added = engine
        .add_transaction(
            AddTransactionCmd::new("42", 700, TransactionKind::Transfer, "between accounts"),
            None,
        )
        .await
        .unwrap();
    assert_eq!(added.new_balance_minor, 0);

    let balance = engine.balance("42").await.unwrap();
    assert_eq!(balance.current_balance_minor, 0);
    assert_eq!(balance.total_income_minor, 0);
    assert_eq!(balance.total_expenses_minor, 0);
    assert_eq!(balance.transaction_count, 1);
}

#[tokio::test]
async fn add_transaction_validates_before_any_mutation() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "42").await;

    let err = engine
        .add_transaction(
            AddTransactionCmd::new("42", 0, TransactionKind::Income, "salary"),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = engine
        .add_transaction(
            AddTransactionCmd::new("42", 100, TransactionKind::Income, "   "),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = engine
        .add_transaction(
            AddTransactionCmd::new("nobody", 100, TransactionKind::Income, "salary"),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::NotFound("user".to_string()));

    let balance = engine.balance("42").await.unwrap();
    assert_eq!(balance.transaction_count, 0);
}

#[tokio::test]
async fn inactive_user_cannot_record_transactions() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "42").await;

    engine.deactivate_user("42").await.unwrap();
    let err = engine.deactivate_user("42").await.unwrap_err();
    assert!(matches!(err, LedgerError::NoOp(_)));

    let err = engine
        .add_transaction(
            AddTransactionCmd::new("42", 100, TransactionKind::Income, "salary"),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::NotFound("user".to_string()));
}

#[tokio::test]
async fn remove_and_restore_are_noop_when_already_in_state() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "42").await;

    let added = engine
        .add_transaction(
            AddTransactionCmd::new("42", 100, TransactionKind::Income, "salary"),
            None,
        )
        .await
        .unwrap();

    let err = engine
        .restore_transaction(added.transaction_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NoOp(_)));

    engine
        .remove_transaction(added.transaction_id, None)
        .await
        .unwrap();
    let err = engine
        .remove_transaction(added.transaction_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NoOp(_)));

    let err = engine
        .remove_transaction(uuid::Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::NotFound("transaction".to_string()));

    // A no-op must not have moved the aggregates.
    let balance = engine.balance("42").await.unwrap();
    assert_eq!(balance.transaction_count, 0);
    assert_eq!(balance.current_balance_minor, 0);
}

#[tokio::test]
async fn list_recent_hides_deleted_and_honors_filters() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "42").await;

    engine
        .add_transaction(
            AddTransactionCmd::new("42", 1000, TransactionKind::Income, "salary"),
            None,
        )
        .await
        .unwrap();
    let spend = engine
        .add_transaction(
            AddTransactionCmd::new("42", 100, TransactionKind::Expense, "food"),
            None,
        )
        .await
        .unwrap();
    engine
        .remove_transaction(spend.transaction_id, None)
        .await
        .unwrap();

    let txs = engine.list_recent_transactions("42", 50).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].kind, TransactionKind::Income);

    let filter = TransactionListFilter {
        include_deleted: true,
        ..Default::default()
    };
    let txs = engine.list_transactions("42", 50, &filter).await.unwrap();
    assert_eq!(txs.len(), 2);
    assert!(txs.iter().any(|tx| tx.is_deleted()));

    let filter = TransactionListFilter {
        kinds: Some(vec![TransactionKind::Expense]),
        include_deleted: true,
        ..Default::default()
    };
    let txs = engine.list_transactions("42", 50, &filter).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].kind, TransactionKind::Expense);

    let filter = TransactionListFilter {
        kinds: Some(Vec::new()),
        ..Default::default()
    };
    let err = engine.list_transactions("42", 50, &filter).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn category_breakdown_groups_live_transactions() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "42").await;

    let now = Utc::now();
    for (amount, kind, category) in [
        (1000, TransactionKind::Income, "salary"),
        (300, TransactionKind::Expense, "food"),
        (200, TransactionKind::Expense, "food"),
        (150, TransactionKind::Expense, "transport"),
    ] {
        engine
            .add_transaction(
                AddTransactionCmd::new("42", amount, kind, category).occurred_at(now),
                None,
            )
            .await
            .unwrap();
    }
    let removed = engine
        .add_transaction(
            AddTransactionCmd::new("42", 999, TransactionKind::Expense, "food").occurred_at(now),
            None,
        )
        .await
        .unwrap();
    engine
        .remove_transaction(removed.transaction_id, None)
        .await
        .unwrap();

    let breakdown = engine
        .category_breakdown("42", now - Duration::days(1), now + Duration::days(1))
        .await
        .unwrap();

    let food = breakdown
        .iter()
        .find(|row| row.category == "food")
        .unwrap();
    assert_eq!(food.total_minor, 500);
    assert_eq!(food.count, 2);
    assert_eq!(food.kind, TransactionKind::Expense);
    assert_eq!(breakdown[0].category, "salary");
}

#[tokio::test]
async fn recompute_aggregates_repairs_corrupted_snapshot() {
    let (engine, db) = ledger_with_db().await;
    user(&engine, "42").await;

    engine
        .add_transaction(
            AddTransactionCmd::new("42", 1000, TransactionKind::Income, "salary"),
            None,
        )
        .await
        .unwrap();
    let spend = engine
        .add_transaction(
            AddTransactionCmd::new("42", 400, TransactionKind::Expense, "food"),
            None,
        )
        .await
        .unwrap();
    engine
        .remove_transaction(spend.transaction_id, None)
        .await
        .unwrap();

    // Corrupt the denormalized aggregates directly in the DB.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE users SET current_balance_minor = ?, total_income_minor = ?, \
         total_expenses_minor = ?, transaction_count = ? WHERE id = ?;",
        vec![999i64.into(), 1i64.into(), 2i64.into(), 77i64.into(), "42".into()],
    ))
    .await
    .unwrap();

    let repaired = engine.recompute_aggregates("42").await.unwrap();
    assert_eq!(repaired.current_balance_minor, 1000);
    assert_eq!(repaired.total_income_minor, 1000);
    assert_eq!(repaired.total_expenses_minor, 0);
    assert_eq!(repaired.transaction_count, 1);
    assert_eq!(engine.balance("42").await.unwrap(), repaired);
}

#[tokio::test]
async fn end_to_end_scenario() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "77").await;

    let income = engine
        .add_transaction(
            AddTransactionCmd::new("77", 5000, TransactionKind::Income, "salary"),
            None,
        )
        .await
        .unwrap();
    assert_eq!(income.new_balance_minor, 5000);

    let rent = engine
        .add_transaction(
            AddTransactionCmd::new("77", 1200, TransactionKind::Expense, "rent"),
            None,
        )
        .await
        .unwrap();
    assert_eq!(rent.new_balance_minor, 3800);

    let balance = engine.balance("77").await.unwrap();
    assert_eq!(balance.total_income_minor, 5000);
    assert_eq!(balance.total_expenses_minor, 1200);

    let new_balance = engine
        .remove_transaction(rent.transaction_id, None)
        .await
        .unwrap();
    assert_eq!(new_balance, 5000);

    let goal = engine
        .create_goal(ledger::CreateGoalCmd::new("77", "Vacation", 2000), None)
        .await
        .unwrap();
    let (_, goal) = engine
        .record_goal_progress(
            ledger::GoalProgressCmd::new(goal.id, 2000, ledger::ProgressKind::Contribution),
            None,
        )
        .await
        .unwrap();
    assert_eq!(goal.status, ledger::GoalStatus::Completed);
    assert_eq!(goal.current_amount_minor, 2000);
    assert!(goal.completed_at.is_some());
}
