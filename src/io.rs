use crate::http::{Headers, Request, ETAG, LAST_MODIFIED};
use crate::Result;

/// A trait for the HTTP protocol. Implementors accept a `Request` carrying
/// the method, URL and headers. Clients can do HTTP calls against a remote
/// server or mock the responses for testing purposes.
pub trait HttpRunner {
    type Response;
    fn run(&self, request: &mut Request) -> Result<Self::Response>;
}

/// HTTP response as seen by the cache: status, headers and an opaque body.
#[derive(Builder, Clone, Debug, Default, PartialEq)]
pub struct Response {
    #[builder(default = "200")]
    pub status: u16,
    #[builder(default)]
    pub headers: Headers,
    #[builder(setter(into), default)]
    pub body: Vec<u8>,
}

impl Response {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    pub fn get_etag(&self) -> Option<&str> {
        self.header(ETAG)
    }

    pub fn get_last_modified(&self) -> Option<&str> {
        self.header(LAST_MODIFIED)
    }

    /// Body as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}
