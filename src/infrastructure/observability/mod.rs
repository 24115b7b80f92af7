// Push-only observability: prometheus registry plus a stdout reporter
pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::SnapshotReporter;
