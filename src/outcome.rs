//! Uniform success / error rendering.
//!
//! Application code returns an [`Outcome`] instead of building responses by
//! hand. Domain errors travel as data: they are never raised through the
//! chain, they are rendered with their status and `Cache-Control: no-store`.

use http::StatusCode;
use serde::Serialize;

use crate::context::Context;
use crate::error::Error;
use crate::pagination::{Paged, Pagination};
use crate::response::Response;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Either a payload or an error, each with the status to send it with.
#[derive(Debug)]
pub enum Outcome<T> {
    Success { payload: T, status: StatusCode },
    Failure { error: BoxError, status: StatusCode },
}

impl<T> Outcome<T> {
    pub fn success(payload: T, status: StatusCode) -> Self {
        Self::Success { payload, status }
    }

    pub fn failure(error: impl Into<BoxError>, status: StatusCode) -> Self {
        Self::Failure { error: error.into(), status }
    }

    /// `200 OK`
    pub fn ok(payload: T) -> Self {
        Self::success(payload, StatusCode::OK)
    }

    /// `201 Created`
    pub fn created(payload: T) -> Self {
        Self::success(payload, StatusCode::CREATED)
    }

    /// `404 Not Found`
    pub fn not_found(error: impl Into<BoxError>) -> Self {
        Self::failure(error, StatusCode::NOT_FOUND)
    }

    /// `400 Bad Request`
    pub fn bad_request(error: impl Into<BoxError>) -> Self {
        Self::failure(error, StatusCode::BAD_REQUEST)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success { status, .. } | Self::Failure { status, .. } => *status,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

/// Textual form of a success payload.
pub trait Render {
    fn render(&self) -> Result<String, Error>;
}

impl Render for String {
    fn render(&self) -> Result<String, Error> { Ok(self.clone()) }
}

impl Render for &str {
    fn render(&self) -> Result<String, Error> { Ok((*self).to_owned()) }
}

impl Render for serde_json::Value {
    fn render(&self) -> Result<String, Error> { Ok(self.to_string()) }
}

/// Renders its contents as JSON.
#[derive(Clone, Debug)]
pub struct Json<T>(pub T);

impl<T: Serialize> Render for Json<T> {
    fn render(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.0)?)
    }
}

/// A page renders as the JSON array of its values; the total travels in headers.
impl<T: Serialize> Render for Paged<T> {
    fn render(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.values)?)
    }
}

/// Sends `outcome` on `cx`.
///
/// Failures get `Cache-Control: no-store` and the error's text as body;
/// successes get the rendered payload. The content type is detected from the
/// body text.
pub fn render<T: Render>(cx: &mut Context, outcome: Outcome<T>) -> Result<(), Error> {
    match outcome {
        Outcome::Failure { error, status } => {
            cx.set_header("cache-control", "no-store")?;
            cx.send(Response::auto(status, error.to_string()))
        }
        Outcome::Success { payload, status } => {
            cx.send(Response::auto(status, payload.render()?))
        }
    }
}

/// [`render`] for a page, adding pagination headers for `page` and `size`
/// when the outcome is a success.
///
/// The headers are only staged once the page has rendered, so a payload that
/// fails to serialize leaves no pagination behind for the error response.
pub fn render_paged<T: Serialize>(
    cx: &mut Context,
    outcome: Outcome<Paged<T>>,
    page: u64,
    size: u64,
) -> Result<(), Error> {
    match outcome {
        Outcome::Success { payload, status } => {
            let body = payload.render()?;
            Pagination::new(payload.total, page, size).apply(cx)?;
            cx.send(Response::auto(status, body))
        }
        failure => render(cx, failure),
    }
}
