// Ledger storage backends
pub mod database;
pub mod ledger;
pub mod memory;

pub use database::Database;
pub use ledger::SqliteLedger;
pub use memory::MemoryLedger;
