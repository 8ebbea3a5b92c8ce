//! Per-request identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

use super::{BoxFuture, Middleware, Next};
use crate::context::Context;
use crate::error::Error;

pub const HEADER: &str = "x-request-id";

/// Numbers requests and echoes the number in `x-request-id`.
///
/// The counter belongs to this instance, so two servers in one process (or
/// two tests) number their requests independently. Ids start at 1.
#[derive(Debug, Default)]
pub struct RequestId {
    counter: AtomicU64,
}

impl RequestId {
    pub fn new() -> Self {
        Self { counter: AtomicU64::new(0) }
    }

    /// Hands out the next id.
    pub fn next_id(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Middleware for RequestId {
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            let id = self.next_id().to_string();
            cx.set_header(HEADER, id.as_str())?;
            cx.set_request_id(id);
            next.run(cx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::Method;

    use super::*;
    use crate::middleware::Pipeline;
    use crate::response::Response;

    fn reply<'a>(cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            cx.send(Response::text("ok"))?;
            next.run(cx).await
        })
    }

    #[tokio::test]
    async fn numbers_requests_and_sets_header() {
        let app = Pipeline::new().with(RequestId::new()).with(reply);

        for expected in ["1", "2"] {
            let mut cx = Context::from_parts(Method::GET, "/");
            app.execute(&mut cx).await.unwrap();
            assert_eq!(cx.request_id(), Some(expected));
            assert_eq!(cx.response().unwrap().header(HEADER), Some(expected));
        }
    }

    #[test]
    fn instances_count_independently() {
        let a = RequestId::new();
        let b = RequestId::new();
        a.next_id();
        assert_eq!(a.next_id(), 2);
        assert_eq!(b.next_id(), 1);
    }

    #[tokio::test]
    async fn concurrent_ids_are_unique() {
        let ids = Arc::new(RequestId::new());
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..64 {
            let ids = Arc::clone(&ids);
            tasks.spawn(async move { ids.next_id() });
        }
        let mut seen = Vec::new();
        while let Some(id) = tasks.join_next().await {
            seen.push(id.unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (1..=64).collect::<Vec<_>>());
    }
}
