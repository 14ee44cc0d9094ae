use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{Database, DatabaseConnection};

use ledger::{
    AddTransactionCmd, Engine, RecurrenceScheduler, RecurringFrequency, TransactionKind,
    TransactionListFilter, UserProfile,
};
use migration::MigratorTrait;

async fn ledger_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    (engine, db)
}

async fn user(engine: &Engine, chat_id: &str) {
    engine.ensure_user(UserProfile::new(chat_id)).await.unwrap();
}

#[tokio::test]
async fn recurring_template_gets_first_due_date() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "42").await;

    let occurred_at = Utc::now() - Duration::days(3);
    let added = engine
        .add_transaction(
            AddTransactionCmd::new("42", 1500, TransactionKind::Expense, "subscription")
                .occurred_at(occurred_at)
                .recurring(RecurringFrequency::Monthly),
            None,
        )
        .await
        .unwrap();
    // The template itself is a live transaction and already counted.
    assert_eq!(added.new_balance_minor, -1500);

    let filter = TransactionListFilter::default();
    let txs = engine.list_transactions("42", 10, &filter).await.unwrap();
    assert_eq!(txs.len(), 1);
    let template = &txs[0];
    assert!(template.is_recurring());
    assert_eq!(
        template.next_occurrence_at,
        Some(RecurringFrequency::Monthly.next_occurrence(occurred_at))
    );

    // Not due yet, so nothing is listed.
    let due = engine.list_due_recurring(Utc::now()).await.unwrap();
    assert!(due.is_empty());
}

#[tokio::test]
async fn sweep_materializes_due_template_and_advances_schedule() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "42").await;

    let occurred_at = Utc::now() - Duration::days(35);
    let due_at = RecurringFrequency::Monthly.next_occurrence(occurred_at);
    let added = engine
        .add_transaction(
            AddTransactionCmd::new("42", 1500, TransactionKind::Expense, "rent")
                .occurred_at(occurred_at)
                .recurring(RecurringFrequency::Monthly),
            None,
        )
        .await
        .unwrap();

    let due = engine.list_due_recurring(Utc::now()).await.unwrap();
    assert_eq!(due.len(), 1);

    let report = engine.run_recurrence_sweep(Utc::now()).await.unwrap();
    assert_eq!(report.materialized, 1);
    assert_eq!(report.failed, 0);

    let txs = engine.list_recent_transactions("42", 10).await.unwrap();
    assert_eq!(txs.len(), 2);
    let child = txs
        .iter()
        .find(|tx| tx.parent_transaction_id == Some(added.transaction_id))
        .unwrap();
    assert!(!child.is_recurring());
    assert_eq!(child.occurred_at, due_at);
    assert_eq!(child.amount_minor, 1500);
    assert_eq!(child.category, "rent");

    let template = txs
        .iter()
        .find(|tx| tx.id == added.transaction_id)
        .unwrap();
    assert_eq!(
        template.next_occurrence_at,
        Some(RecurringFrequency::Monthly.next_occurrence(due_at))
    );

    // Both the template and the materialized child hit the accountant.
    let balance = engine.balance("42").await.unwrap();
    assert_eq!(balance.total_expenses_minor, 3000);
    assert_eq!(balance.transaction_count, 2);
}

#[tokio::test]
async fn overdue_template_catches_up_one_occurrence_per_sweep() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "42").await;

    let occurred_at = Utc::now() - Duration::days(3);
    engine
        .add_transaction(
            AddTransactionCmd::new("42", 200, TransactionKind::Expense, "coffee")
                .occurred_at(occurred_at)
                .recurring(RecurringFrequency::Daily),
            None,
        )
        .await
        .unwrap();

    let now = Utc::now();
    let first = engine.run_recurrence_sweep(now).await.unwrap();
    let second = engine.run_recurrence_sweep(now).await.unwrap();
    let third = engine.run_recurrence_sweep(now).await.unwrap();
    assert_eq!(first.materialized, 1);
    assert_eq!(second.materialized, 1);
    assert_eq!(third.materialized, 1);

    // All three missed days are materialized now; the next due date is in
    // the future.
    let due = engine.list_due_recurring(Utc::now()).await.unwrap();
    assert!(due.is_empty());
    let balance = engine.balance("42").await.unwrap();
    assert_eq!(balance.transaction_count, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sweeps_materialize_exactly_once() {
    let (engine, _db) = ledger_with_db().await;
    let engine = Arc::new(engine);
    user(&engine, "42").await;

    let occurred_at = Utc::now() - Duration::days(35);
    let due_at = RecurringFrequency::Monthly.next_occurrence(occurred_at);
    let added = engine
        .add_transaction(
            AddTransactionCmd::new("42", 1000, TransactionKind::Income, "stipend")
                .occurred_at(occurred_at)
                .recurring(RecurringFrequency::Monthly),
            None,
        )
        .await
        .unwrap();

    let now = Utc::now();
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..2 {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move { engine.run_recurrence_sweep(now).await.unwrap() });
    }
    let mut materialized = 0;
    while let Some(report) = tasks.join_next().await {
        materialized += report.unwrap().materialized;
    }
    assert_eq!(materialized, 1);

    let txs = engine.list_recent_transactions("42", 10).await.unwrap();
    let children: Vec<_> = txs
        .iter()
        .filter(|tx| tx.parent_transaction_id == Some(added.transaction_id))
        .collect();
    assert_eq!(children.len(), 1);

    let template = txs
        .iter()
        .find(|tx| tx.id == added.transaction_id)
        .unwrap();
    assert_eq!(
        template.next_occurrence_at,
        Some(RecurringFrequency::Monthly.next_occurrence(due_at))
    );

    let balance = engine.balance("42").await.unwrap();
    assert_eq!(balance.total_income_minor, 2000);
}

#[tokio::test]
async fn sweep_skips_templates_of_inactive_users() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "active").await;
    user(&engine, "dormant").await;

    let occurred_at = Utc::now() - Duration::days(35);
    for chat_id in ["active", "dormant"] {
        engine
            .add_transaction(
                AddTransactionCmd::new(chat_id, 500, TransactionKind::Expense, "rent")
                    .occurred_at(occurred_at)
                    .recurring(RecurringFrequency::Monthly),
                None,
            )
            .await
            .unwrap();
    }
    engine.deactivate_user("dormant").await.unwrap();

    let due = engine.list_due_recurring(Utc::now()).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].user_id, "active");

    let report = engine.run_recurrence_sweep(Utc::now()).await.unwrap();
    assert_eq!(report.materialized, 1);
    assert_eq!(report.failed, 0);

    // The dormant user's ledger is untouched.
    let balance = engine.balance("dormant").await.unwrap();
    assert_eq!(balance.transaction_count, 1);
}

#[tokio::test]
async fn removed_template_is_not_materialized() {
    let (engine, _db) = ledger_with_db().await;
    user(&engine, "42").await;

    let occurred_at = Utc::now() - Duration::days(35);
    let added = engine
        .add_transaction(
            AddTransactionCmd::new("42", 500, TransactionKind::Expense, "rent")
                .occurred_at(occurred_at)
                .recurring(RecurringFrequency::Monthly),
            None,
        )
        .await
        .unwrap();
    engine
        .remove_transaction(added.transaction_id, None)
        .await
        .unwrap();

    let due = engine.list_due_recurring(Utc::now()).await.unwrap();
    assert!(due.is_empty());
    let report = engine.run_recurrence_sweep(Utc::now()).await.unwrap();
    assert_eq!(report.materialized, 0);
}

#[tokio::test]
async fn scheduler_worker_sweeps_on_interval() {
    let (engine, _db) = ledger_with_db().await;
    let engine = Arc::new(engine);
    user(&engine, "42").await;

    engine
        .add_transaction(
            AddTransactionCmd::new("42", 300, TransactionKind::Expense, "subscription")
                .occurred_at(Utc::now() - Duration::days(35))
                .recurring(RecurringFrequency::Monthly),
            None,
        )
        .await
        .unwrap();

    let scheduler = RecurrenceScheduler::new(
        Arc::clone(&engine),
        std::time::Duration::from_millis(50),
    );
    let worker = tokio::spawn(scheduler.run());

    let mut materialized = false;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let txs = engine.list_recent_transactions("42", 10).await.unwrap();
        if txs.iter().any(|tx| tx.parent_transaction_id.is_some()) {
            materialized = true;
            break;
        }
    }
    worker.abort();
    assert!(materialized);
}
