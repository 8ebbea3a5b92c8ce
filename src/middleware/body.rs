//! Decodes the request body into [`Context::parsed_body`].

use http::StatusCode;

use super::{BoxFuture, Middleware, Next};
use crate::context::{Context, ParsedBody};
use crate::error::Error;
use crate::response::Response;
use crate::url::{DEFAULT_SEPARATOR, parse_form_like};

/// Parses form, JSON and text bodies by `content-type`.
///
/// | content-type | slot |
/// |---|---|
/// | `application/x-www-form-urlencoded` | [`ParsedBody::Form`] |
/// | `application/json`, `*+json` | [`ParsedBody::Json`] |
/// | `text/*` | [`ParsedBody::Text`] |
///
/// Empty bodies and other types are left alone. A body that does not decode
/// gets `400 Bad Request` and the chain stops.
#[derive(Clone, Debug)]
pub struct ParseBody {
    separator: String,
}

impl ParseBody {
    /// `separator` joins repeated form keys.
    pub fn new(separator: &str) -> Self {
        Self { separator: separator.to_owned() }
    }

    fn parse(&self, content_type: &str, body: &[u8]) -> Result<Option<ParsedBody>, Error> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        let text = || std::str::from_utf8(body).map_err(|e| Error::Body(e.to_string()));

        let parsed = match mime.as_str() {
            "application/x-www-form-urlencoded" => {
                ParsedBody::Form(parse_form_like(text()?, &self.separator))
            }
            "application/json" => ParsedBody::Json(serde_json::from_slice(body)?),
            m if m.starts_with("application/") && m.ends_with("+json") => {
                ParsedBody::Json(serde_json::from_slice(body)?)
            }
            m if m.starts_with("text/") => ParsedBody::Text(text()?.to_owned()),
            _ => return Ok(None),
        };
        Ok(Some(parsed))
    }
}

impl Default for ParseBody {
    fn default() -> Self { Self::new(DEFAULT_SEPARATOR) }
}

impl Middleware for ParseBody {
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            if cx.body().is_empty() {
                return next.run(cx).await;
            }
            let content_type = cx.header("content-type").unwrap_or("");

            match self.parse(content_type, cx.body()) {
                Ok(Some(parsed)) => cx.set_parsed_body(parsed),
                Ok(None) => {}
                Err(e) => {
                    return cx.send(
                        Response::builder()
                            .status(StatusCode::BAD_REQUEST)
                            .header("cache-control", "no-store")
                            .text(e.to_string()),
                    );
                }
            }
            next.run(cx).await
        })
    }
}
