use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::RetryTransientMiddleware;
use reqwest_retry::policies::ExponentialBackoff;
use std::time::Duration;

/// Builds the shared HTTP client used for venue REST calls.
pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Client with transient-failure retries baked in: exponential backoff,
    /// at most 3 retries. Connection errors and 5xx responses are retried by
    /// the middleware; anything that escapes it is final for this call.
    pub fn create_client(request_timeout: Duration) -> ClientWithMiddleware {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_builds() {
        let _client = HttpClientFactory::create_client(Duration::from_secs(5));
    }
}
