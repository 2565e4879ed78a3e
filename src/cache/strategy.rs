use chrono::{DateTime, Utc};

use crate::cache::entry::MAX_DELTA_SECONDS;
use crate::cache::{CacheEntry, CacheKey, CacheStorage, InMemoryStorage};
use crate::http::{HeaderValues, Request, CACHE_CONTROL, EXPIRES};
use crate::io::Response;
use crate::time::{self, Clock, SystemClock};
use crate::{log_debug, log_info, log_warn};

/// Status codes whose responses may be stored. Besides successful responses
/// it holds redirects and errors that are final and unlikely to change soon.
pub const CACHEABLE_STATUS_CODES: [u16; 11] =
    [200, 203, 204, 300, 301, 404, 405, 410, 414, 418, 501];

/// TTL given to entries that are kept only for conditional revalidation.
const STALE_TTL: i64 = -1;

/// Private cache decision engine. Decides whether a response may be stored,
/// computes its expiration and reads and writes entries through a
/// [`CacheStorage`] under the request's [`CacheKey`].
pub struct CacheStrategy<S, K = SystemClock> {
    storage: S,
    clock: K,
}

impl CacheStrategy<InMemoryStorage> {
    /// Strategy over a fresh, process local [`InMemoryStorage`].
    pub fn in_memory() -> Self {
        CacheStrategy::new(InMemoryStorage::new())
    }
}

impl<S: CacheStorage> CacheStrategy<S> {
    pub fn new(storage: S) -> Self {
        CacheStrategy::with_clock(storage, SystemClock)
    }
}

impl<S: CacheStorage, K: Clock> CacheStrategy<S, K> {
    pub fn with_clock(storage: S, clock: K) -> Self {
        CacheStrategy { storage, clock }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Decide whether `response` may be cached, and until when it is fresh,
    /// evaluated at `now`. `None` means the response must not be stored.
    pub fn evaluate(&self, response: &Response, now: DateTime<Utc>) -> Option<CacheEntry> {
        evaluate(response, now)
    }

    pub fn key(&self, request: &Request) -> CacheKey {
        CacheKey::from(request)
    }

    /// Stored entry for `request`, fresh or not. Freshness is left to the
    /// caller, which knows whether a stale entry is worth revalidating.
    pub fn fetch(&self, request: &Request) -> Option<CacheEntry> {
        let key = self.key(request);
        let entry = self.storage.fetch(&key);
        log_debug!(
            "Cache {} for {} {} ({})",
            if entry.is_some() { "hit" } else { "miss" },
            request.method(),
            request.url(),
            key
        );
        entry
    }

    /// Evaluate `response` and store the resulting entry under the key of
    /// `request`. Returns false if the response is not cacheable or the
    /// storage write failed.
    pub fn cache(&self, request: &Request, response: &Response) -> bool {
        let Some(entry) = self.evaluate(response, self.clock.now()) else {
            return false;
        };
        let key = self.key(request);
        let saved = self.storage.save(&key, &entry);
        if saved {
            log_info!(
                "Cached {} {} until {}",
                request.method(),
                request.url(),
                time::format_http_date(&entry.expires_at())
            );
        } else {
            log_warn!(
                "Could not cache {} {}, continuing without cache",
                request.method(),
                request.url()
            );
        }
        saved
    }

    pub fn delete(&self, request: &Request) -> bool {
        self.storage.delete(&self.key(request))
    }
}

/// Cacheability and expiration of `response` at `now`. Directive precedence:
/// status code, `no-store`, `no-cache`, `max-age`, `Expires`, then an
/// already stale default.
pub fn evaluate(response: &Response, now: DateTime<Utc>) -> Option<CacheEntry> {
    if !CACHEABLE_STATUS_CODES.contains(&response.status) {
        log_debug!("Status {} is not cacheable", response.status);
        return None;
    }

    let cache_control = HeaderValues::from_header(&response.headers, CACHE_CONTROL);
    if cache_control.has("no-store") {
        log_debug!("Response carries no-store, not caching");
        return None;
    }

    if cache_control.has("no-cache") {
        let entry = CacheEntry::with_ttl(response, now, STALE_TTL);
        if entry.has_validation_information() {
            return Some(entry);
        }
        log_debug!("Response carries no-cache without validators, not caching");
        return None;
    }

    if let Some(max_age) = cache_control.get("max-age") {
        return Some(CacheEntry::with_ttl(
            response,
            now,
            parse_delta_seconds(max_age),
        ));
    }

    if let Some(expires) = response.header(EXPIRES).and_then(time::parse_http_date) {
        return Some(CacheEntry::new(response, expires));
    }

    Some(CacheEntry::with_ttl(response, now, STALE_TTL))
}

/// Integer prefix of a delta-seconds value: `"60"` and `"60abc"` are 60,
/// anything without leading digits is 0. Clamped to [`MAX_DELTA_SECONDS`].
fn parse_delta_seconds(value: &str) -> i64 {
    let value = value.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let mut seconds: i64 = 0;
    for c in digits.chars() {
        let Some(digit) = c.to_digit(10) else {
            break;
        };
        seconds = seconds
            .saturating_mul(10)
            .saturating_add(digit as i64)
            .min(MAX_DELTA_SECONDS);
    }
    if negative {
        -seconds
    } else {
        seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoCache;
    use crate::http::{Headers, Method};
    use crate::test::utils::MockStorage;
    use crate::time::FixedClock;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 13, 19, 50, 23).unwrap()
    }

    fn response(status: u16, headers: Vec<(&str, &str)>) -> Response {
        Response::builder()
            .status(status)
            .headers(headers.into_iter().collect::<Headers>())
            .body("{\"id\":4}")
            .build()
            .unwrap()
    }

    #[test]
    fn test_status_codes_outside_accepted_set_are_not_cacheable() {
        for status in 100..600 {
            let entry = evaluate(&response(status, vec![("Cache-Control", "max-age=60")]), now());
            assert_eq!(
                CACHEABLE_STATUS_CODES.contains(&status),
                entry.is_some(),
                "status {status}"
            );
        }
    }

    #[test]
    fn test_no_store_wins_over_everything() {
        let test_table = vec![
            vec![("Cache-Control", "no-store")],
            vec![("Cache-Control", "max-age=3600, no-store")],
            vec![("Cache-Control", "NO-STORE, no-cache"), ("ETag", "\"a\"")],
            vec![
                ("Cache-Control", "public"),
                ("Cache-Control", "no-store"),
                ("Expires", "Sun, 06 Nov 2044 08:49:37 GMT"),
            ],
        ];
        for headers in test_table {
            assert!(evaluate(&response(200, headers), now()).is_none());
        }
    }

    #[test]
    fn test_no_cache_with_validators_is_stored_stale() {
        let test_table = vec![
            vec![("Cache-Control", "no-cache"), ("ETag", "\"abc\"")],
            vec![
                ("Cache-Control", "no-cache, max-age=3600"),
                ("Last-Modified", "Sat, 13 Jan 2024 19:50:23 GMT"),
            ],
        ];
        for headers in test_table {
            let entry = evaluate(&response(200, headers), now()).unwrap();
            assert!(entry.expires_at() <= now());
            assert_eq!(now() - Duration::seconds(1), entry.expires_at());
            assert!(entry.is_stale(&now()));
        }
    }

    #[test]
    fn test_no_cache_without_validators_is_not_cacheable() {
        let headers = vec![("Cache-Control", "no-cache, max-age=3600")];
        assert!(evaluate(&response(200, headers), now()).is_none());
    }

    #[test]
    fn test_max_age_sets_expiration() {
        let entry = evaluate(&response(200, vec![("Cache-Control", "max-age=60")]), now()).unwrap();
        assert_eq!(now() + Duration::seconds(60), entry.expires_at());
        assert!(entry.is_fresh(&now()));
    }

    #[test]
    fn test_max_age_malformed_values() {
        let test_table = vec![
            ("max-age=abc", 0),
            ("max-age=", 0),
            ("max-age", 0),
            ("max-age=60abc", 60),
            ("max-age=\"120\"", 120),
            ("max-age=-5", -5),
            ("max-age=99999999999999999999999", MAX_DELTA_SECONDS),
        ];
        for (header, ttl) in test_table {
            let entry = evaluate(&response(200, vec![("Cache-Control", header)]), now()).unwrap();
            assert_eq!(now() + Duration::seconds(ttl), entry.expires_at(), "{header}");
        }
    }

    #[test]
    fn test_max_age_wins_over_expires() {
        let headers = vec![
            ("Expires", "Sun, 06 Nov 2044 08:49:37 GMT"),
            ("Cache-Control", "max-age=10"),
        ];
        let entry = evaluate(&response(200, headers), now()).unwrap();
        assert_eq!(now() + Duration::seconds(10), entry.expires_at());
    }

    #[test]
    fn test_expires_sets_exact_expiration() {
        let headers = vec![("Expires", "Sun, 06 Nov 2044 08:49:37 GMT")];
        let entry = evaluate(&response(200, headers), now()).unwrap();
        assert_eq!(
            Utc.with_ymd_and_hms(2044, 11, 6, 8, 49, 37).unwrap(),
            entry.expires_at()
        );
    }

    #[test]
    fn test_invalid_expires_falls_back_to_stale_default() {
        for expires in ["0", "-1", "never", "2044-11-06T08:49:37Z"] {
            let entry = evaluate(&response(200, vec![("Expires", expires)]), now()).unwrap();
            assert_eq!(now() - Duration::seconds(1), entry.expires_at(), "{expires}");
        }
    }

    #[test]
    fn test_no_freshness_information_is_stored_stale() {
        let entry = evaluate(&response(404, vec![]), now()).unwrap();
        assert_eq!(now() - Duration::seconds(1), entry.expires_at());
        assert_eq!(404, entry.status());
    }

    #[test]
    fn test_parse_delta_seconds() {
        let test_table = vec![
            ("0", 0),
            ("60", 60),
            (" 60 ", 60),
            ("+7", 7),
            ("-1", -1),
            ("1.5", 1),
            ("abc", 0),
            ("", 0),
            ("2147483649", MAX_DELTA_SECONDS),
        ];
        for (value, expected) in test_table {
            assert_eq!(expected, parse_delta_seconds(value), "{value:?}");
        }
    }

    #[test]
    fn test_cache_then_fetch_returns_entry_unchanged() {
        let strategy = CacheStrategy::with_clock(InMemoryStorage::new(), FixedClock(now()));
        let request = Request::new("https://api.example.com/projects/4", Method::GET);
        let response = response(200, vec![("Cache-Control", "max-age=60")]);

        assert!(strategy.cache(&request, &response));

        let entry = strategy.fetch(&request).unwrap();
        assert_eq!(now() + Duration::seconds(60), entry.expires_at());
        assert_eq!(response, entry.to_response());
    }

    #[test]
    fn test_cache_rejected_response_does_not_touch_storage() {
        let strategy = CacheStrategy::with_clock(InMemoryStorage::new(), FixedClock(now()));
        let request = Request::new("https://api.example.com/projects/4", Method::GET);

        assert!(!strategy.cache(&request, &response(500, vec![])));
        assert!(!strategy.cache(
            &request,
            &response(200, vec![("Cache-Control", "no-store")])
        ));
        assert!(strategy.storage().is_empty());
        assert!(strategy.fetch(&request).is_none());
    }

    #[test]
    fn test_cache_reports_storage_failure() {
        let strategy = CacheStrategy::with_clock(MockStorage::failing(), FixedClock(now()));
        let request = Request::new("https://api.example.com/projects/4", Method::GET);
        let response = response(200, vec![("Cache-Control", "max-age=60")]);
        assert!(!strategy.cache(&request, &response));
        assert_eq!(1, strategy.storage().saves());
        assert!(strategy.fetch(&request).is_none());

        assert!(!CacheStrategy::new(NoCache).cache(&request, &response));
    }

    #[test]
    fn test_cache_writes_at_most_once() {
        let strategy = CacheStrategy::with_clock(MockStorage::default(), FixedClock(now()));
        let request = Request::new("https://api.example.com/projects/4", Method::GET);
        assert!(strategy.cache(&request, &response(200, vec![])));
        assert_eq!(1, strategy.storage().saves());
        assert!(!strategy.cache(&request, &response(503, vec![])));
        assert_eq!(1, strategy.storage().saves());
        assert_eq!(0, strategy.storage().fetches());
    }

    #[test]
    fn test_delete_removes_entry() {
        let strategy = CacheStrategy::in_memory();
        let request = Request::new("https://api.example.com/projects/4", Method::GET);
        strategy.cache(&request, &response(200, vec![("Cache-Control", "max-age=60")]));
        assert!(strategy.delete(&request));
        assert!(strategy.fetch(&request).is_none());
        assert!(strategy.delete(&request));
    }

    #[test]
    fn test_key_only_depends_on_method_and_url() {
        let strategy = CacheStrategy::in_memory();
        let url = "https://api.example.com/projects/4?page=2";
        let mut with_headers = Request::new(url, Method::GET);
        with_headers.set_header("Accept", "application/json");
        assert_eq!(
            strategy.key(&Request::new(url, Method::GET)),
            strategy.key(&with_headers)
        );
        assert_ne!(
            strategy.key(&Request::new(url, Method::GET)),
            strategy.key(&Request::new(url, Method::HEAD))
        );
    }
}
