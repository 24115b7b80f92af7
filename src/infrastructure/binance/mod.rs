// Binance spot venue integration
pub mod gateway;

pub use gateway::BinanceGateway;
