// Domain-specific error types
pub mod errors;

// Append-only order ledger
pub mod ledger;

// Performance aggregation domain
pub mod performance;

// Port interfaces
pub mod ports;

// Core trading domain
pub mod trading;
