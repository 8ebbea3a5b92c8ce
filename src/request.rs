//! Request snapshot handed to endpoint handlers.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

use crate::url::FormMap;

/// An owned view of the request as seen by an endpoint handler.
///
/// Built from the [`Context`](crate::Context) when the handler runs, so it
/// carries the path parameters bound by the router and the query map if a
/// [`ParseUrl`](crate::middleware::ParseUrl) middleware ran earlier.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) query: Option<FormMap>,
    pub(crate) request_id: Option<String>,
}

impl Request {
    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn request_id(&self) -> Option<&str> { self.request_id.as_deref() }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns a query value. Repeated keys are joined with the separator
    /// [`ParseUrl`](crate::middleware::ParseUrl) was configured with (`,` by default).
    pub fn query(&self, key: &str) -> Option<String> {
        self.query.as_ref()?.get(key).map(|v| v.into_owned())
    }
}
