//! Endpoint handlers and their adaptation into middleware.
//!
//! # How async handlers become middleware
//!
//! A route's chain holds [`BoxedMiddleware`]s. An endpoint is written as a
//! plain async function over an owned [`Request`], so it is wrapped:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_middleware()                          ← Handler blanket impl
//!        ↓
//! Arc::new(Endpoint(hello))                        ← implements Middleware
//!        ↓  at request time
//! cx.request() → hello(req).await → cx.send(res)   ← then next.run(cx)
//! ```
//!
//! The snapshot costs one clone of the request parts; the body is `Bytes`,
//! so it is reference-counted rather than copied.

use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;
use crate::middleware::{BoxFuture, BoxedMiddleware, Middleware, Next};
use crate::request::Request;
use crate::response::IntoResponse;

/// Implemented for every valid endpoint handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    /// Wraps the handler as the terminal middleware of a route.
    fn into_middleware(self) -> BoxedMiddleware;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_middleware(self) -> BoxedMiddleware {
        Arc::new(Endpoint(self))
    }
}

/// Adapts a handler to the middleware contract: run it on a snapshot of the
/// request, send what it returns, then continue the chain.
struct Endpoint<F>(F);

impl<F, Fut, R> Middleware for Endpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            let response = (self.0)(cx.request()).await.into_response();
            cx.send(response)?;
            next.run(cx).await
        })
    }
}

/// Erases a handler into a middleware for use in a route chain.
pub fn endpoint(handler: impl Handler) -> BoxedMiddleware {
    handler.into_middleware()
}
