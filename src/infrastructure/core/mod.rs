// Shared infrastructure plumbing
pub mod http_client_factory;
