//! Converts faults escaping the chain into `500 Internal Server Error`.

use http::StatusCode;
use tracing::error;

use super::{BoxFuture, Middleware, Next};
use crate::config::Mode;
use crate::context::Context;
use crate::error::Error;
use crate::response::Response;

/// Body sent in production instead of the fault's diagnostic text.
pub const REDACTED_BODY: &str = "Internal Server Error";

/// Catches every [`Error`] raised further down the chain.
///
/// Register it first so it wraps everything else. The fault is logged; the
/// client gets a `500` whose body is the fault's text in development and
/// [`REDACTED_BODY`] in production. If a response was already sent before
/// the fault, it is left as is.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorBoundary {
    mode: Mode,
}

impl ErrorBoundary {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }
}

impl Middleware for ErrorBoundary {
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            let Err(fault) = next.run(cx).await else {
                return Ok(());
            };

            error!(
                error = %fault,
                method = %cx.method(),
                path = %cx.path(),
                request_id = cx.request_id().unwrap_or("-"),
                "request failed"
            );
            if cx.is_sent() {
                return Ok(());
            }

            let body = if self.mode.is_production() {
                REDACTED_BODY.to_owned()
            } else {
                fault.to_string()
            };
            cx.send(
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .header("cache-control", "no-store")
                    .text(body),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::middleware::Pipeline;

    fn explode<'a>(_cx: &'a mut Context, _next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async { Err(Error::handler("database unreachable")) })
    }

    #[tokio::test]
    async fn development_shows_diagnostics() {
        let app = Pipeline::new().with(ErrorBoundary::new(Mode::Development)).with(explode);
        let mut cx = Context::from_parts(Method::GET, "/");
        app.execute(&mut cx).await.unwrap();

        let res = cx.response().unwrap();
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body(), b"handler: database unreachable");
        assert_eq!(res.header("cache-control"), Some("no-store"));
    }

    #[tokio::test]
    async fn production_redacts() {
        let app = Pipeline::new().with(ErrorBoundary::new(Mode::Production)).with(explode);
        let mut cx = Context::from_parts(Method::GET, "/");
        app.execute(&mut cx).await.unwrap();

        assert_eq!(cx.response().unwrap().body(), REDACTED_BODY.as_bytes());
    }

    fn send_then_fail<'a>(cx: &'a mut Context, _next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            cx.send(Response::text("partial"))?;
            Err(Error::handler("late"))
        })
    }

    #[tokio::test]
    async fn keeps_response_sent_before_fault() {
        let app = Pipeline::new().with(ErrorBoundary::default()).with(send_then_fail);
        let mut cx = Context::from_parts(Method::GET, "/");
        app.execute(&mut cx).await.unwrap();

        let res = cx.response().unwrap();
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"partial");
    }
}
