//! Transaction machinery: lifecycle words, global statistics, and the
//! base transaction that orchestrates begin / commit / rollback.

mod base;
mod object;
mod stat;

pub use base::{Txn, TxnMode};
pub use object::{StatusFlag, TxnObject};
pub use stat::TxnStat;
