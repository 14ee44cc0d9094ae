mod list;
mod write;

pub use list::{CategoryTotal, TransactionListFilter};
pub use write::AddedTransaction;
