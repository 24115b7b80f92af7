// Performance aggregation domain
pub mod aggregator;
pub mod snapshot;
