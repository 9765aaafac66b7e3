use std::{thread, time::Duration};

use tracing::{debug, warn};

use super::{
    cache::ResponseCache,
    transport::{RawResponse, Transport},
};
use crate::{config::AppConfig, error::FetchError};

/// Bounds for the retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Live attempts before giving up; at least one is always made.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
    /// Body text that marks a throttled response, matched case-insensitively.
    pub rate_limit_marker: String,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::ZERO,
            rate_limit_marker: "try again later".to_string(),
        }
    }
}

impl RetryPolicy {
    /// Derive the policy from application settings.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.retry_budget.max(1),
            delay: config.retry_delay(),
            rate_limit_marker: config.rate_limit_marker.clone(),
        }
    }

    /// Success predicate: exactly 200 and no throttling marker in the body.
    pub fn is_ready(&self, response: &RawResponse) -> bool {
        response.status == 200 && !self.is_rate_limited(&response.body)
    }

    fn is_rate_limited(&self, body: &str) -> bool {
        !self.rate_limit_marker.is_empty()
            && body
                .to_lowercase()
                .contains(&self.rate_limit_marker.to_lowercase())
    }

    fn describe(&self, response: &RawResponse) -> String {
        if response.status == 200 {
            "rate limited".to_string()
        } else {
            format!("status {}", response.status)
        }
    }
}

/// Wraps a [`Transport`] with a bounded retry loop and an optional cache.
pub struct RetryingFetcher<T> {
    transport: T,
    policy: RetryPolicy,
    cache: Option<ResponseCache>,
}

impl<T: Transport> RetryingFetcher<T> {
    /// Fetcher without a cache.
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            cache: None,
        }
    }

    /// Attach a response cache.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Return the body for `url` once the service reports it ready.
    ///
    /// A cached entry is only served if it satisfies the same predicate as a
    /// live response; anything else goes back to the network.
    pub fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Some(cache) = &self.cache {
            if let Some(entry) = cache.get(url) {
                let cached = RawResponse::new(entry.status, entry.body);
                if self.policy.is_ready(&cached) {
                    debug!(url, "serving cached response");
                    return Ok(cached.body);
                }
                cache.remove(url);
            }
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut last = String::new();
        for attempt in 1..=max_attempts {
            if attempt > 1 && !self.policy.delay.is_zero() {
                thread::sleep(self.policy.delay);
            }

            match self.transport.get(url) {
                Ok(response) if self.policy.is_ready(&response) => {
                    debug!(url, attempt, "request succeeded");
                    self.store(url, &response);
                    return Ok(response.body);
                }
                Ok(response) => {
                    last = self.policy.describe(&response);
                    debug!(url, attempt, reason = %last, "response not ready, retrying");
                }
                Err(err) => {
                    last = format!("{err:#}");
                    warn!(url, attempt, "request error: {last}");
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: max_attempts,
            last,
        })
    }

    fn store(&self, url: &str, response: &RawResponse) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.put(url, response) {
                warn!("failed to persist response cache: {err:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::VecDeque};

    use anyhow::{anyhow, Result};
    use assert_matches::assert_matches;

    use super::*;

    /// Replays a fixed script of responses and records requested URLs.
    struct ScriptedTransport {
        script: RefCell<VecDeque<Result<RawResponse>>>,
        fallback: Option<RawResponse>,
        requests: RefCell<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<RawResponse>>) -> Self {
            Self {
                script: RefCell::new(script.into()),
                fallback: None,
                requests: RefCell::new(Vec::new()),
            }
        }

        fn always(response: RawResponse) -> Self {
            Self {
                script: RefCell::new(VecDeque::new()),
                fallback: Some(response),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl Transport for ScriptedTransport {
        fn get(&self, url: &str) -> Result<RawResponse> {
            self.requests.borrow_mut().push(url.to_string());
            match self.script.borrow_mut().pop_front() {
                Some(next) => next,
                None => self
                    .fallback
                    .clone()
                    .ok_or_else(|| anyhow!("script exhausted for {url}")),
            }
        }
    }

    fn pending() -> Result<RawResponse> {
        Ok(RawResponse::new(202, "Your request has been accepted"))
    }

    #[test]
    fn succeeds_after_pending_responses() {
        let transport = ScriptedTransport::new(vec![
            pending(),
            pending(),
            pending(),
            Ok(RawResponse::new(200, "<items/>")),
        ]);
        let fetcher = RetryingFetcher::new(&transport, RetryPolicy::default());

        let body = fetcher.fetch("https://example.com/c").expect("fourth attempt succeeds");
        assert_eq!(body, "<items/>");
        assert_eq!(transport.request_count(), 4);
    }

    #[test]
    fn exhausts_budget_on_permanent_pending() {
        let transport = ScriptedTransport::always(RawResponse::new(202, ""));
        let fetcher = RetryingFetcher::new(&transport, RetryPolicy::default());

        let err = fetcher.fetch("https://example.com/c").unwrap_err();
        assert_matches!(err, FetchError::Exhausted { attempts: 5, ref last, .. } if last == "status 202");
        assert_eq!(transport.request_count(), 5);
    }

    #[test]
    fn rate_limit_marker_triggers_retry() {
        let transport = ScriptedTransport::new(vec![
            Ok(RawResponse::new(200, "Rate limit exceeded. Please Try Again Later.")),
            Err(anyhow!("connection reset")),
            Ok(RawResponse::new(200, "<plays/>")),
        ]);
        let fetcher = RetryingFetcher::new(&transport, RetryPolicy::default());

        assert_eq!(fetcher.fetch("u").expect("third attempt succeeds"), "<plays/>");
        assert_eq!(transport.request_count(), 3);
    }

    #[test]
    fn cached_success_skips_network() {
        let transport = ScriptedTransport::new(vec![Ok(RawResponse::new(200, "live"))]);
        let fetcher = RetryingFetcher::new(&transport, RetryPolicy::default())
            .with_cache(ResponseCache::in_memory(None));

        assert_eq!(fetcher.fetch("u").expect("live fetch"), "live");
        assert_eq!(fetcher.fetch("u").expect("cached fetch"), "live");
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn cached_pending_response_is_refetched() {
        let cache = ResponseCache::in_memory(None);
        cache
            .put("u", &RawResponse::new(202, "queued"))
            .expect("in-memory put");
        let transport = ScriptedTransport::new(vec![Ok(RawResponse::new(200, "fresh"))]);
        let fetcher =
            RetryingFetcher::new(&transport, RetryPolicy::default()).with_cache(cache);

        assert_eq!(fetcher.fetch("u").expect("live fetch"), "fresh");
        assert_eq!(transport.request_count(), 1);
    }
}
