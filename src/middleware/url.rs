//! Fills the context's URL and query slots.

use super::{BoxFuture, Middleware, Next};
use crate::context::Context;
use crate::error::Error;
use crate::url::{DEFAULT_SEPARATOR, parse_form_like, parse_url};

/// Parses the request URL into [`Context::url`] and its query string into
/// [`Context::query`].
///
/// Repeated query keys are joined with `separator` by [`FormMap::get`](crate::url::FormMap::get).
#[derive(Clone, Debug)]
pub struct ParseUrl {
    separator: String,
}

impl ParseUrl {
    pub fn new(separator: &str) -> Self {
        Self { separator: separator.to_owned() }
    }
}

impl Default for ParseUrl {
    fn default() -> Self { Self::new(DEFAULT_SEPARATOR) }
}

impl Middleware for ParseUrl {
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            let mut raw = cx.base_url();
            if let Some(query) = cx.uri().query() {
                raw.push('?');
                raw.push_str(query);
            }
            let url = parse_url(&raw);
            cx.set_query(parse_form_like(&url.query, &self.separator));
            cx.set_url(url);
            next.run(cx).await
        })
    }
}
