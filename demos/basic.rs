//! Minimal weft example: a global chain, a mounted API router, a guarded
//! route chain and a paginated listing.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/api/users/42
//!   curl -i 'http://localhost:3000/api/items?page=2&size=10'
//!   curl -i -X DELETE http://localhost:3000/api/users/42
//!   curl -i -X DELETE -H 'authorization: Bearer demo' http://localhost:3000/api/users/42
//!   curl -i http://localhost:3000/healthz

use http::{Method, StatusCode};
use weft::handler::endpoint;
use weft::middleware::{BoxFuture, ErrorBoundary, Next, ParseBody, ParseUrl, RequestId, Trace, boxed};
use weft::outcome::{Outcome, render_paged};
use weft::{Context, Error, Mode, Paged, Pipeline, Request, Response, Router, Server, health};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let api = Router::new()
        .get("/users/:id", get_user)
        .post("/users", create_user)
        .route(Method::DELETE, "/users/:id", vec![boxed(require_token), endpoint(delete_user)])
        .route(Method::GET, "/items", vec![boxed(list_items)]);

    let probes = Router::exact()
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness);

    let app = Pipeline::new()
        .with(ErrorBoundary::new(Mode::from_env()))
        .with(RequestId::new())
        .with(Trace)
        .with(ParseUrl::default())
        .with(ParseBody::default())
        .with(Router::new().mount("/api", api).mount("/", probes));

    if let Err(e) = Server::bind("0.0.0.0:3000").serve(app).await {
        eprintln!("server error: {e}");
    }
}

// GET /api/users/:id
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// POST /api/users
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/api/users/99")
        .json(br#"{"id":"99","name":"new_user"}"#.to_vec())
}

// DELETE /api/users/:id → 204 No Content
async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}

// Stops the route chain unless a bearer token is present.
fn require_token<'a>(cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
    Box::pin(async move {
        let authorized = cx
            .header("authorization")
            .is_some_and(|v| v.starts_with("Bearer "));
        if !authorized {
            return cx.send(Response::status(StatusCode::UNAUTHORIZED));
        }
        next.run(cx).await
    })
}

const MAX_PAGE_SIZE: u64 = 100;

// GET /api/items?page=&size=
fn list_items<'a>(cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
    Box::pin(async move {
        let number = |key: &str, default: u64| {
            cx.query()
                .and_then(|q| q.get(key))
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };
        let page = number("page", 1).max(1);
        let size = number("size", 10).min(MAX_PAGE_SIZE);

        let outcome = if size == 0 {
            Outcome::bad_request("size must be positive")
        } else {
            let total = 95;
            let values: Vec<u64> = page_window(page, size, total).collect();
            Outcome::ok(Paged::new(total, values))
        };
        render_paged(cx, outcome, page, size)?;
        next.run(cx).await
    })
}

/// Item indices on `page`, clamped to `total` so huge client-supplied
/// values cannot overflow.
fn page_window(page: u64, size: u64, total: u64) -> std::ops::Range<u64> {
    let start = page.saturating_sub(1).saturating_mul(size).min(total);
    start..start.saturating_add(size).min(total)
}

#[cfg(test)]
mod tests {
    use super::page_window;

    #[test]
    fn window_stays_within_total() {
        assert_eq!(page_window(1, 10, 95), 0..10);
        assert_eq!(page_window(10, 10, 95), 90..95);
        assert_eq!(page_window(11, 10, 95), 95..95);
        assert_eq!(page_window(u64::MAX, u64::MAX, 95), 95..95);
    }
}
