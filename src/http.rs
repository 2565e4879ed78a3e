use crate::cache::{CacheEntry, CacheStorage, CacheStrategy};
use crate::config::ConfigProperties;
use crate::error::HPCError;
use crate::io::{HttpRunner, Response};
use crate::time::{Clock, SystemClock};
use crate::{log_debug, log_info, Result};
use std::fmt::{self, Display, Formatter};
use std::slice;
use ureq::typestate::WithoutBody;
use ureq::{Agent, RequestBuilder as UreqRequestBuilder};

pub const CACHE_CONTROL: &str = "cache-control";
pub const EXPIRES: &str = "expires";
pub const ETAG: &str = "etag";
pub const LAST_MODIFIED: &str = "last-modified";
pub const IF_NONE_MATCH: &str = "if-none-match";
pub const IF_MODIFIED_SINCE: &str = "if-modified-since";

/// Blocking HTTP client that consults a private cache around GET and HEAD
/// requests. The cache is advisory: storage faults degrade to a network
/// round trip, never to a failed request.
pub struct Client<S, K = SystemClock> {
    agent: Agent,
    strategy: CacheStrategy<S, K>,
    refresh_cache: bool,
}

impl<S: CacheStorage> Client<S> {
    pub fn new(storage: S, config: &impl ConfigProperties, refresh_cache: bool) -> Self {
        Client::with_strategy(CacheStrategy::new(storage), config, refresh_cache)
    }
}

impl<S: CacheStorage, K: Clock> Client<S, K> {
    pub fn with_strategy(
        strategy: CacheStrategy<S, K>,
        config: &impl ConfigProperties,
        refresh_cache: bool,
    ) -> Self {
        let agent: Agent = Agent::config_builder()
            // 4xx/5xx are regular responses here, some of them cacheable.
            .http_status_as_error(false)
            .timeout_global(Some(config.request_timeout().into()))
            .user_agent(config.user_agent())
            .build()
            .into();
        Client {
            agent,
            strategy,
            refresh_cache,
        }
    }

    pub fn strategy(&self) -> &CacheStrategy<S, K> {
        &self.strategy
    }

    fn send(&self, request: &Request) -> Result<Response> {
        let url = request.url();
        let mut response = match request.method {
            Method::GET => with_headers(self.agent.get(url), request.headers()).call()?,
            Method::HEAD => with_headers(self.agent.head(url), request.headers()).call()?,
            Method::DELETE => with_headers(self.agent.delete(url), request.headers()).call()?,
            Method::POST | Method::PUT | Method::PATCH => {
                return Err(HPCError::UnsupportedMethod(request.method.to_string()).into());
            }
        };
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .fold(Headers::new(), |mut headers, (name, value)| {
                // Non visible ASCII values are dropped, same as most clients.
                if let Ok(value) = value.to_str() {
                    headers.append(name.as_str(), value);
                }
                headers
            });
        let body = if request.method == Method::HEAD {
            Vec::new()
        } else {
            response.body_mut().read_to_vec()?
        };
        let response = Response::builder()
            .status(status)
            .headers(headers)
            .body(body)
            .build()?;
        Ok(response)
    }

    fn run_cached(&self, request: &mut Request) -> Result<Response> {
        let mut stale: Option<CacheEntry> = None;
        if !self.refresh_cache {
            if let Some(entry) = self.strategy.fetch(request) {
                if entry.is_fresh(&self.strategy.now()) {
                    log_info!("Cache hit (fresh) for {} {}", request.method, request.url());
                    return Ok(entry.to_response());
                }
                if entry.has_validation_information() {
                    for (name, value) in entry.conditional_headers().iter() {
                        request.set_header(name, value);
                    }
                    stale = Some(entry);
                } else {
                    log_debug!("Stale entry without validators for {}", request.url());
                }
            }
        }
        let response = self.send(request)?;
        if response.status == 304 {
            if let Some(entry) = stale {
                log_info!("Revalidated cached response for {}", request.url());
                return Ok(entry.to_response());
            }
        }
        if !self.strategy.cache(request, &response) {
            log_debug!(
                "Response {} for {} {} was not cached",
                response.status,
                request.method,
                request.url()
            );
        }
        Ok(response)
    }
}


fn with_headers(
    builder: UreqRequestBuilder<WithoutBody>,
    headers: &Headers,
) -> UreqRequestBuilder<WithoutBody> {
    headers
        .iter()
        .fold(builder, |builder, (key, value)| builder.header(key, value))
}

impl<S: CacheStorage, K: Clock> HttpRunner for Client<S, K> {
    type Response = Response;

    fn run(&self, request: &mut Request) -> Result<Self::Response> {
        match request.method {
            Method::GET | Method::HEAD => self.run_cached(request),
            _ => self.send(request),
        }
    }
}

/// Multi-valued, order preserving header collection. Lookups are case
/// insensitive; names are kept as they were given.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Headers(Vec::new())
    }

    /// Add a value, keeping any previous values for the same name.
    pub fn append<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.push((key.into(), value.into()));
    }

    /// Replace all values for `key` with a single one.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        self.0.retain(|(name, _)| !name.eq_ignore_ascii_case(&key));
        self.0.push((key, value.into()));
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.iter().any(|(name, _)| name.eq_ignore_ascii_case(key))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> HeadersIter<'_> {
        HeadersIter(self.0.iter())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Headers(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

pub struct HeadersIter<'a>(slice::Iter<'a, (String, String)>);

impl<'a> Iterator for HeadersIter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.0
            .next()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// Directive view over the raw values of a single header, for example
/// `Cache-Control: max-age=60, no-cache="Set-Cookie"`. Directive names are
/// case insensitive, valueless directives are present with an empty value
/// and quoted values are unquoted. The first occurrence of a directive wins.
#[derive(Clone, Debug, Default)]
pub struct HeaderValues(Vec<(String, String)>);

impl HeaderValues {
    pub fn new<'a, I: IntoIterator<Item = &'a str>>(values: I) -> Self {
        let mut directives = Vec::new();
        for value in values {
            for directive in split_unquoted(value, ',') {
                let directive = directive.trim();
                if directive.is_empty() {
                    continue;
                }
                let (name, value) = match directive.split_once('=') {
                    Some((name, value)) => (name.trim(), unquote(value.trim())),
                    None => (directive, ""),
                };
                directives.push((name.to_ascii_lowercase(), value.to_string()));
            }
        }
        HeaderValues(directives)
    }

    pub fn from_header(headers: &Headers, name: &str) -> Self {
        HeaderValues::new(headers.get_all(name))
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

fn split_unquoted(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == separator && !in_quotes {
            parts.push(&value[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&value[start..]);
    parts
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[derive(Builder, Clone, Debug)]
#[builder(pattern = "owned")]
pub struct Request {
    #[builder(default)]
    method: Method,
    #[builder(setter(into))]
    url: String,
    #[builder(default)]
    headers: Headers,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn new(url: &str, method: Method) -> Self {
        Request {
            method,
            url: url.to_string(),
            headers: Headers::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_header(&mut self, key: &str, value: &str) {
        self.headers.set(key, value);
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    GET,
    HEAD,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::DELETE => "DELETE",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Method {
    type Error = HPCError;

    fn try_from(method: &str) -> std::result::Result<Self, Self::Error> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "PATCH" => Ok(Method::PATCH),
            "DELETE" => Ok(Method::DELETE),
            _ => Err(HPCError::UnsupportedMethod(method.to_string())),
        }
    }
}
