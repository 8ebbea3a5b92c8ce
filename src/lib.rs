//! # weft
//!
//! A minimal HTTP framework built around one idea: a request is a
//! [`Context`] pushed through an ordered chain of [`Middleware`].
//!
//! ## The contract
//!
//! Each middleware gets the context and a [`Next`] cursor. It can inspect or
//! mutate the context, send a response, and decide whether the rest of the
//! chain runs. Once a response is sent, nothing further in any chain runs for
//! that request. The [`Router`] is just another middleware: it finds the first
//! route matching the request, runs that route's own chain, and hands control
//! back to the global chain.
//!
//! What weft leaves to the transport or the proxy in front of it:
//!
//! - **TLS termination**
//! - **Keep-alive and HTTP/2 management**: hyper does it
//! - **Body-size limits**: `client_max_body_size` in nginx
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use weft::middleware::{ErrorBoundary, ParseUrl, RequestId, Trace};
//! use weft::{Mode, Pipeline, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let api = Router::new()
//!         .get("/users/:id", get_user)
//!         .post("/users", create_user);
//!
//!     let app = Pipeline::new()
//!         .with(ErrorBoundary::new(Mode::from_env()))
//!         .with(RequestId::new())
//!         .with(Trace)
//!         .with(ParseUrl::default())
//!         .with(Router::new().mount("/api", api));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(http::StatusCode::BAD_REQUEST);
//!     }
//!     Response::builder()
//!         .status(http::StatusCode::CREATED)
//!         .header("location", "/api/users/99")
//!         .json(br#"{"id":"99"}"#.to_vec())
//! }
//! ```

mod context;
mod error;
mod request;
mod response;
mod router;
mod server;

pub mod config;
pub mod handler;
pub mod health;
pub mod middleware;
pub mod outcome;
pub mod pagination;
pub mod url;

pub use config::Mode;
pub use context::{Context, ParsedBody, ResponseState};
pub use error::Error;
pub use handler::Handler;
pub use middleware::{Middleware, Next, Pipeline};
pub use outcome::Outcome;
pub use pagination::{Paged, Pagination};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{Matching, Route, Router, match_segments};
pub use server::Server;
