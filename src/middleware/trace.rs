//! One tracing span per request.

use std::time::Instant;

use tracing::{Instrument, info, info_span};

use super::{BoxFuture, Middleware, Next};
use crate::context::Context;
use crate::error::Error;

/// Wraps the rest of the chain in a `request` span and logs the status and
/// latency once it returns.
///
/// Place it after [`RequestId`](super::RequestId) to get the id on the span.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            let span = info_span!(
                "request",
                method = %cx.method(),
                path = %cx.path(),
                request_id = cx.request_id().unwrap_or("-")
            );
            let started = Instant::now();

            let result = next.run(cx).instrument(span.clone()).await;

            let status = cx.response().map(|r| r.status_code().as_u16());
            span.in_scope(|| {
                info!(
                    status = status.unwrap_or(0),
                    route = cx.matched_route().unwrap_or("-"),
                    latency_us = started.elapsed().as_micros() as u64,
                    failed = result.is_err(),
                    "request finished"
                );
            });
            result
        })
    }
}
