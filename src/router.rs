//! Request router.
//!
//! A [`Router`] is an ordered table of routes and mounted sub-routers. It is
//! itself a [`Middleware`]: place it in a [`Pipeline`](crate::Pipeline) (or
//! mount it in another router) and it dispatches every request that reaches it.
//!
//! Matching is a linear scan in registration order and the first match wins,
//! so when two patterns overlap the one registered first takes the request.
//!
//! # Pattern syntax
//!
//! Segments starting with `:` bind a parameter; all others match literally
//! and case-sensitively. Leading and trailing slashes are insignificant.
//!
//! ```text
//! /users/:id        matches /users/42          → id = "42"
//!                   rejects /users/42/edit     (segment count)
//!                   rejects /accounts/42       (literal)
//! ```
//!
//! [`Router::exact`] builds a router that skips segment parsing entirely and
//! compares the path with `prefix + pattern` as strings.

use std::collections::HashMap;

use http::Method;
use tracing::debug;

use crate::context::Context;
use crate::error::Error;
use crate::handler::Handler;
use crate::middleware::{BoxFuture, BoxedMiddleware, Middleware, Next};
use crate::url::decode;

/// Marker that turns a pattern segment into a named capture.
pub const PARAM_MARKER: char = ':';

/// How a router compares request paths with its patterns.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Matching {
    /// Whole-path string equality. No parameters.
    Exact,
    /// Segment-wise comparison with `:name` captures.
    #[default]
    Parameterized,
}

/// A method, a path pattern, and the chain that serves it.
pub struct Route {
    method: Method,
    pattern: String,
    /// `pattern` under the router's mount prefix.
    full: String,
    chain: Vec<BoxedMiddleware>,
}

impl Route {
    pub fn method(&self) -> &Method { &self.method }
    pub fn pattern(&self) -> &str { &self.full }
}

enum Entry {
    Route(Route),
    Mount(Router),
}

/// The application router.
///
/// Build it once at startup. Each registration returns `self` so calls chain.
///
/// ```rust
/// use http::Method;
/// use weft::handler::endpoint;
/// use weft::{Request, Router};
///
/// # async fn get_user(_: Request) -> &'static str { "" }
/// # async fn create_user(_: Request) -> &'static str { "" }
/// # async fn health(_: Request) -> &'static str { "ok" }
/// let users = Router::new()
///     .get("/:id", get_user)
///     .post("/", create_user);
///
/// let app = Router::new()
///     .mount("/users", users)
///     .route(Method::GET, "/healthz", vec![endpoint(health)]);
/// ```
pub struct Router {
    matching: Matching,
    /// Path this router was mounted at, relative to its parent.
    mount_path: String,
    /// Absolute prefix: every ancestor's mount path joined.
    prefix: String,
    entries: Vec<Entry>,
}

impl Router {
    /// A router with [`Matching::Parameterized`].
    pub fn new() -> Self {
        Self::with_matching(Matching::Parameterized)
    }

    /// A router with [`Matching::Exact`].
    pub fn exact() -> Self {
        Self::with_matching(Matching::Exact)
    }

    pub fn with_matching(matching: Matching) -> Self {
        Self {
            matching,
            mount_path: String::new(),
            prefix: String::new(),
            entries: Vec::new(),
        }
    }

    pub fn matching(&self) -> Matching { self.matching }

    /// Registers a route served by one endpoint handler.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.route(method, path, vec![handler.into_middleware()])
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PATCH, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Registers a route served by an ordered middleware chain.
    ///
    /// # Panics
    ///
    /// Panics if the pattern has a parameter segment with no name (`/users/:`).
    pub fn route(mut self, method: Method, path: &str, chain: Vec<BoxedMiddleware>) -> Self {
        if path.split('/').any(|s| s == ":") {
            panic!("invalid route `{path}`: parameter segment without a name");
        }
        self.entries.push(Entry::Route(Route {
            method,
            pattern: path.to_owned(),
            full: join(&self.prefix, path),
            chain,
        }));
        self
    }

    /// Mounts `router` under `prefix`. Its patterns are matched against the
    /// request path with `prefix` in front; the prefix is fixed here, not
    /// resolved per request.
    ///
    /// The sub-router occupies one slot in this router's table: it is tried
    /// in registration order like any route, and if none of its own routes
    /// match, scanning continues after it.
    pub fn mount(mut self, prefix: &str, mut router: Router) -> Self {
        router.mount_path = normalize_prefix(prefix);
        router.rebase(&self.prefix);
        self.entries.push(Entry::Mount(router));
        self
    }

    /// Every registered route as `(method, full pattern)`, in match order.
    pub fn routes(&self) -> Vec<(&Method, &str)> {
        let mut out = Vec::new();
        for entry in &self.entries {
            match entry {
                Entry::Route(route) => out.push((route.method(), route.pattern())),
                Entry::Mount(router) => out.extend(router.routes()),
            }
        }
        out
    }

    fn rebase(&mut self, parent: &str) {
        self.prefix = join(parent, &self.mount_path);
        let prefix = self.prefix.clone();
        for entry in &mut self.entries {
            match entry {
                Entry::Route(route) => route.full = join(&prefix, &route.pattern),
                Entry::Mount(router) => router.rebase(&prefix),
            }
        }
    }

    /// Bound parameters if `route` accepts the request, `None` otherwise.
    fn match_route(&self, route: &Route, method: &Method, path: &str) -> Option<HashMap<String, String>> {
        if !route.method.as_str().eq_ignore_ascii_case(method.as_str()) {
            return None;
        }
        match self.matching {
            Matching::Exact => (path == route.full).then(HashMap::new),
            Matching::Parameterized => match_segments(&route.full, path),
        }
    }

    /// Runs the first matching route's chain. Returns whether one matched.
    fn dispatch<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a, Result<bool, Error>> {
        Box::pin(async move {
            for entry in &self.entries {
                match entry {
                    Entry::Route(route) => {
                        let Some(params) = self.match_route(route, cx.method(), cx.path()) else {
                            continue;
                        };
                        debug!(method = %route.method, route = %route.full, "route matched");
                        cx.set_params(params);
                        cx.set_matched_route(route.full.clone());
                        Next::new(&route.chain).run(cx).await?;
                        return Ok(true);
                    }
                    Entry::Mount(router) => {
                        if !within_prefix(cx.path(), &router.prefix) {
                            continue;
                        }
                        if router.dispatch(cx).await? {
                            return Ok(true);
                        }
                    }
                }
            }
            Ok(false)
        })
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl Middleware for Router {
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            self.dispatch(cx).await?;
            next.run(cx).await
        })
    }
}

/// Segment-wise match of `path` against `pattern`.
///
/// Empty segments are dropped on both sides, so `/a/b/` and `a/b` compare
/// equal. Captured values are percent-decoded.
pub fn match_segments(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let mut expected = pattern.split('/').filter(|s| !s.is_empty());
    let mut actual = path.split('/').filter(|s| !s.is_empty());
    let mut params = HashMap::new();

    loop {
        match (expected.next(), actual.next()) {
            (None, None) => return Some(params),
            (Some(want), Some(got)) => match want.strip_prefix(PARAM_MARKER) {
                Some(name) => {
                    params.insert(name.to_owned(), decode(got).into_owned());
                }
                None if want == got => {}
                None => return None,
            },
            _ => return None,
        }
    }
}

fn join(prefix: &str, path: &str) -> String {
    format!("{}{path}", prefix.trim_end_matches('/'))
}

/// `/api/` → `/api`, `api` → `/api`, `/` → ``.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn within_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_bind_parameters() {
        let params = match_segments("/users/:id", "/users/42").unwrap();
        assert_eq!(params["id"], "42");

        assert!(match_segments("/users/:id", "/users/42/edit").is_none());
        assert!(match_segments("/users/:id", "/accounts/42").is_none());
        assert!(match_segments("/users/:id", "/users").is_none());
    }

    #[test]
    fn slashes_are_insignificant() {
        assert!(match_segments("/users/", "users").is_some());
        assert!(match_segments("/", "").is_some());
        assert!(match_segments("", "/").is_some());
    }

    #[test]
    fn literals_are_case_sensitive() {
        assert!(match_segments("/Users", "/users").is_none());
    }

    #[test]
    fn captured_values_are_decoded() {
        let params = match_segments("/files/:name/:rev", "/files/my%20doc.txt/v%2F2").unwrap();
        assert_eq!(params["name"], "my doc.txt");
        assert_eq!(params["rev"], "v/2");
    }

    #[test]
    fn prefixes() {
        assert_eq!(normalize_prefix("/api/"), "/api");
        assert_eq!(normalize_prefix("api"), "/api");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(join("/api", "/users"), "/api/users");
        assert_eq!(join("", "/users"), "/users");

        assert!(within_prefix("/api/users", "/api"));
        assert!(within_prefix("/api", "/api"));
        assert!(!within_prefix("/apix", "/api"));
        assert!(within_prefix("/anything", ""));
    }

    #[test]
    fn nested_mounts_rebase_patterns() {
        async fn h(_: crate::Request) -> &'static str { "" }

        let inner = Router::new().get("/:id", h);
        let middle = Router::new().get("/", h).mount("/items", inner);
        let app = Router::new().mount("/v1/", middle);

        let routes: Vec<_> = app.routes().into_iter().map(|(_, p)| p.to_owned()).collect();
        assert_eq!(routes, ["/v1/", "/v1/items/:id"]);
    }

    #[test]
    #[should_panic(expected = "parameter segment without a name")]
    fn rejects_unnamed_parameter() {
        let _ = Router::new().route(Method::GET, "/users/:", Vec::new());
    }
}
