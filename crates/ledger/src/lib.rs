//! Ledger consistency engine.
//!
//! Keeps each user's running balance, income/expense totals and goal
//! progress correct and atomic under concurrent writes, soft-deletion and
//! restoration of transactions, and the background materialization of
//! recurring transactions.
//!
//! The [`Engine`] is the single entry point. Every mutating operation runs
//! as one atomic unit of work: validation first, then a per-entity lock, a
//! database transaction, and the balance accountant and/or goal progress
//! tracker inside it. Aggregates are always read fresh inside the open
//! transaction; nothing is cached across calls.

pub use commands::{AddTransactionCmd, CreateGoalCmd, GoalProgressCmd, UserProfile};
pub use currency::Currency;
pub use error::LedgerError;
pub use goal_progress::{GoalProgress, ProgressKind};
pub use goals::{Goal, GoalStatus};
pub use ops::{
    AddedTransaction, CategoryTotal, Engine, EngineBuilder, GoalSummary, SweepReport,
    TransactionListFilter,
};
pub use scheduler::RecurrenceScheduler;
pub use transactions::{RecurringFrequency, Transaction, TransactionKind};
pub use users::{Balance, User};

mod commands;
mod currency;
mod error;
mod goal_progress;
mod goals;
mod locks;
mod ops;
mod scheduler;
mod transactions;
mod users;

type ResultLedger<T> = Result<T, LedgerError>;
