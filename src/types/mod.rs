//! Type definitions for the fraud alert service

pub mod alert;
pub mod record;
pub mod transaction;

pub use alert::FraudAlert;
pub use record::{DailyFraudCount, DashboardSummary, TransactionRecord};
pub use transaction::Transaction;
