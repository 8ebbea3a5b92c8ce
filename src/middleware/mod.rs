//! Middleware and the pipeline that runs it.
//!
//! A middleware receives the request [`Context`] and a [`Next`] cursor over
//! the rest of its chain. It may read or mutate the context, send a response,
//! and decide whether to call [`Next::run`]:
//!
//! - **Pass through**: `next.run(cx).await`
//! - **Short-circuit**: return without calling `next`; nothing later in this
//!   chain runs.
//! - **Wrap**: do work, call `next`, then do more work with the outcome.
//!
//! # The cursor
//!
//! ```text
//! chain:  [ a ][ b ][ c ]
//! Next::new(chain)          cursor = 0
//!   .run(cx)  → calls a with Next { cursor = 1 }
//!                 a: next.run(cx) → calls b with Next { cursor = 2 }
//!                                     b: next.run(cx) → calls c ...
//! ```
//!
//! `run` stops without side effects when the cursor is past the end of the
//! chain or the context has already been sent. `Next` is consumed by `run`,
//! so a middleware can advance its chain at most once.
//!
//! # Writing middleware
//!
//! Either implement [`Middleware`] on a type (for middleware with state) or
//! write a plain function with this shape:
//!
//! ```rust
//! use weft::middleware::{BoxFuture, Next};
//! use weft::{Context, Error};
//!
//! fn powered_by<'a>(cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
//!     Box::pin(async move {
//!         cx.set_header("x-powered-by", "weft")?;
//!         next.run(cx).await
//!     })
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;

mod body;
mod error_boundary;
mod request_id;
mod trace;
mod url;

pub use body::ParseBody;
pub use error_boundary::ErrorBoundary;
pub use request_id::RequestId;
pub use trace::Trace;
pub use url::ParseUrl;

/// A heap-allocated, type-erased future borrowing from the request.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A unit of request-processing logic.
pub trait Middleware: Send + Sync + 'static {
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>>;
}

/// A shared, type-erased middleware.
///
/// `Arc` lets the same instance sit in several chains and be shared across
/// concurrent requests without copying.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Erases a middleware's concrete type.
pub fn boxed(middleware: impl Middleware) -> BoxedMiddleware {
    Arc::new(middleware)
}

impl<F> Middleware for F
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Result<(), Error>>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
        self(cx, next)
    }
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// Cursor into the remainder of a middleware chain.
///
/// One `Next` is created per dispatch of a chain and never shared between
/// contexts.
#[must_use = "a chain only advances when `run` is awaited"]
pub struct Next<'a> {
    chain: &'a [BoxedMiddleware],
    cursor: usize,
}

impl<'a> Next<'a> {
    /// Positions a cursor before the first middleware of `chain`.
    pub fn new(chain: &'a [BoxedMiddleware]) -> Self {
        Self { chain, cursor: 0 }
    }

    /// Runs the middleware under the cursor, handing it a cursor advanced by
    /// one. Resolves immediately if the chain is exhausted or `cx` is sent.
    ///
    /// Faults from the middleware propagate to the caller untouched.
    pub async fn run(self, cx: &mut Context) -> Result<(), Error> {
        let Some(middleware) = self.chain.get(self.cursor) else {
            return Ok(());
        };
        if cx.is_sent() {
            return Ok(());
        }
        let next = Next { chain: self.chain, cursor: self.cursor + 1 };
        middleware.call(cx, next).await
    }

    /// Middleware left to run, this one's included.
    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.cursor)
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// The ordered global middleware chain served by [`Server`](crate::Server).
///
/// ```rust
/// use weft::middleware::{ErrorBoundary, ParseUrl, RequestId, Trace};
/// use weft::{Mode, Pipeline, Router};
///
/// let app = Pipeline::new()
///     .with(ErrorBoundary::new(Mode::from_env()))
///     .with(RequestId::new())
///     .with(Trace)
///     .with(ParseUrl::default())
///     .with(Router::new());
/// ```
#[derive(Clone, Default)]
pub struct Pipeline {
    chain: Vec<BoxedMiddleware>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { chain: Vec::new() }
    }

    /// Appends `middleware` to the end of the chain.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.chain.push(boxed(middleware));
        self
    }

    /// Appends an already-erased middleware.
    pub fn with_boxed(mut self, middleware: BoxedMiddleware) -> Self {
        self.chain.push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Runs the whole chain against `cx` with a fresh cursor.
    pub async fn execute(&self, cx: &mut Context) -> Result<(), Error> {
        Next::new(&self.chain).run(cx).await
    }
}

impl From<crate::router::Router> for Pipeline {
    fn from(router: crate::router::Router) -> Self {
        Self::new().with(router)
    }
}
