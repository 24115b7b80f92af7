pub mod binance;
pub mod core;
pub mod factory;
pub mod observability;
pub mod paper;
pub mod persistence;
pub mod strategy_state;

pub use factory::ServiceFactory;
pub use paper::PaperGateway;
