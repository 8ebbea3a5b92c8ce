//! Per-request state shared by every middleware in a chain.
//!
//! A [`Context`] owns the inbound request, a set of typed slots that
//! middleware fill in as the request moves down the chain, and the response
//! state. The response state starts [`Unsent`](ResponseState::Unsent) and
//! moves to [`Sent`](ResponseState::Sent) exactly once; after that every
//! pipeline iterating over this context stops.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, StatusCode, Uri};
use tracing::warn;

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::url::{FormMap, ParsedUrl};

/// Whether a response has been finalized for the request.
#[derive(Debug, Default)]
pub enum ResponseState {
    #[default]
    Unsent,
    Sent(Response),
}

/// A request body decoded by [`ParseBody`](crate::middleware::ParseBody).
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedBody {
    Form(FormMap),
    Json(serde_json::Value),
    Text(String),
}

/// The request context.
#[derive(Debug)]
pub struct Context {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,

    params: HashMap<String, String>,
    url: Option<ParsedUrl>,
    query: Option<FormMap>,
    parsed_body: Option<ParsedBody>,
    request_id: Option<String>,
    matched_route: Option<String>,
    extensions: Extensions,

    staged_headers: Vec<(String, String)>,
    response: ResponseState,
}

impl Context {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            remote_addr: None,
            params: HashMap::new(),
            url: None,
            query: None,
            parsed_body: None,
            request_id: None,
            matched_route: None,
            extensions: Extensions::new(),
            staged_headers: Vec::new(),
            response: ResponseState::Unsent,
        }
    }

    /// Bodiless request for `method` and `uri`. Mostly useful in tests.
    ///
    /// A `uri` that does not parse is replaced by `/`, so a malformed target
    /// reaches whatever is registered at the root. Build the [`Uri`] yourself
    /// and use [`Context::new`] when that fallback would hide a mistake.
    pub fn from_parts(method: Method, uri: &str) -> Self {
        let uri = uri.parse().unwrap_or_else(|_| Uri::from_static("/"));
        Self::new(method, uri, HeaderMap::new(), Bytes::new())
    }

    pub(crate) fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    // ── Inbound request ──────────────────────────────────────────────────────

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Scheme, authority and path of the request, without query or fragment.
    ///
    /// Behind a proxy the scheme comes from `x-forwarded-proto`; the authority
    /// falls back to the `host` header for origin-form targets. Neither header
    /// is authenticated, so links built from this are only as trustworthy as
    /// the proxy that sets them. A forwarded scheme other than `http` or
    /// `https` is ignored.
    pub fn base_url(&self) -> String {
        let scheme = self.header("x-forwarded-proto")
            .map(str::trim)
            .filter(|p| p.eq_ignore_ascii_case("http") || p.eq_ignore_ascii_case("https"))
            .or_else(|| self.uri.scheme_str())
            .unwrap_or("http");
        let authority = self.uri.authority()
            .map(|a| a.as_str())
            .or_else(|| self.header("host"))
            .unwrap_or("localhost");
        format!("{scheme}://{authority}{}", self.uri.path())
    }

    /// Owned snapshot for endpoint handlers.
    pub fn request(&self) -> Request {
        Request {
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            params: self.params.clone(),
            query: self.query.clone(),
            request_id: self.request_id.clone(),
        }
    }

    // ── Typed slots ──────────────────────────────────────────────────────────

    pub fn params(&self) -> &HashMap<String, String> { &self.params }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub fn url(&self) -> Option<&ParsedUrl> { self.url.as_ref() }

    pub fn set_url(&mut self, url: ParsedUrl) {
        self.url = Some(url);
    }

    pub fn query(&self) -> Option<&FormMap> { self.query.as_ref() }

    pub fn set_query(&mut self, query: FormMap) {
        self.query = Some(query);
    }

    pub fn parsed_body(&self) -> Option<&ParsedBody> { self.parsed_body.as_ref() }

    pub fn set_parsed_body(&mut self, body: ParsedBody) {
        self.parsed_body = Some(body);
    }

    pub fn request_id(&self) -> Option<&str> { self.request_id.as_deref() }

    pub fn set_request_id(&mut self, id: String) {
        self.request_id = Some(id);
    }

    /// Pattern of the route that matched, prefix included.
    pub fn matched_route(&self) -> Option<&str> { self.matched_route.as_deref() }

    pub(crate) fn set_matched_route(&mut self, pattern: String) {
        self.matched_route = Some(pattern);
    }

    /// Escape hatch for middleware-specific data, keyed by type.
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    // ── Response ─────────────────────────────────────────────────────────────

    pub fn is_sent(&self) -> bool {
        matches!(self.response, ResponseState::Sent(_))
    }

    pub fn response(&self) -> Option<&Response> {
        match &self.response {
            ResponseState::Sent(res) => Some(res),
            ResponseState::Unsent => None,
        }
    }

    /// Stages a response header. Staged headers are merged into the response
    /// when it is sent; a header the response sets itself wins.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> Result<(), Error> {
        if self.is_sent() {
            return Err(Error::AlreadySent);
        }
        let value = value.into();
        match self.staged_headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = value,
            None => self.staged_headers.push((name.to_owned(), value)),
        }
        Ok(())
    }

    pub fn staged_header(&self, name: &str) -> Option<&str> {
        self.staged_headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Finalizes the response. Fails if one was already sent.
    pub fn send(&mut self, mut response: Response) -> Result<(), Error> {
        if self.is_sent() {
            warn!(path = %self.uri.path(), "attempted to send a second response");
            return Err(Error::AlreadySent);
        }
        for (name, value) in self.staged_headers.drain(..) {
            response.insert_header_if_absent(&name, &value);
        }
        self.response = ResponseState::Sent(response);
        Ok(())
    }

    /// Consumes the context and yields what goes on the wire.
    ///
    /// An unsent context becomes `501 Not Implemented` when a route matched
    /// (its chain ran but produced nothing) and `404 Not Found` otherwise.
    pub fn finish(mut self) -> Response {
        if let ResponseState::Unsent = self.response {
            let status = match self.matched_route {
                Some(_) => StatusCode::NOT_IMPLEMENTED,
                None => StatusCode::NOT_FOUND,
            };
            let fallback = Response::status(status);
            // Unsent, so this cannot fail.
            let _ = self.send(fallback);
        }
        match self.response {
            ResponseState::Sent(res) => res,
            ResponseState::Unsent => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}
