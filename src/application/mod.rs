// Facade layer: the RPC surface and its one concrete implementation
pub mod api;
pub mod trading_service;
