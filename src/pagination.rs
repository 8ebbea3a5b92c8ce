//! Page metadata and RFC 5988 `Link` headers.
//!
//! ```rust
//! use weft::pagination::Pagination;
//!
//! let p = Pagination::new(95, 1, 10);
//! assert_eq!(p.total_pages, 10);
//!
//! let links = p.links("https://api.test/items");
//! assert!(links.prev.is_none() && links.first.is_none());
//! assert_eq!(links.next.as_deref(), Some("https://api.test/items?page=2&size=10"));
//! ```

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::Error;

pub const TOTAL_COUNT: &str = "X-Total-Count";
pub const PAGE: &str = "X-Page";
pub const PAGE_SIZE: &str = "X-Page-Size";
pub const TOTAL_PAGES: &str = "X-Total-Pages";
pub const LINK: &str = "Link";

/// One page of a larger result set.
///
/// `values.len() <= size` is the producer's business; nothing here checks it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub total: u64,
    pub values: Vec<T>,
}

impl<T> Paged<T> {
    pub fn new(total: u64, values: Vec<T>) -> Self {
        Self { total, values }
    }
}

/// Page arithmetic for `total_count` items split into pages of `size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub total_count: u64,
    /// 1-based.
    pub page: u64,
    pub size: u64,
    /// Never below 1, even for an empty result or a zero `size`.
    pub total_pages: u64,
}

/// Navigation URLs. Each is present or absent independently.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub prev: Option<String>,
    pub next: Option<String>,
    pub first: Option<String>,
    pub last: Option<String>,
}

impl Pagination {
    pub fn new(total_count: u64, page: u64, size: u64) -> Self {
        let total_pages = match size {
            0 => 1,
            _ => total_count.div_ceil(size).max(1),
        };
        Self { total_count, page, size, total_pages }
    }

    /// Builds navigation URLs on top of `base` (scheme, authority and path).
    pub fn links(&self, base: &str) -> PageLinks {
        let at = |page: u64| format!("{base}?page={page}&size={}", self.size);

        PageLinks {
            prev: (self.page > 1).then(|| at(self.page - 1)),
            next: (self.page < self.total_pages).then(|| at(self.page + 1)),
            first: (self.page != 1).then(|| at(1)),
            last: (self.page != self.total_pages).then(|| at(self.total_pages)),
        }
    }

    /// The numeric headers plus `Link` when any navigation exists.
    pub fn headers(&self, base: &str) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            (TOTAL_COUNT, self.total_count.to_string()),
            (PAGE, self.page.to_string()),
            (PAGE_SIZE, self.size.to_string()),
            (TOTAL_PAGES, self.total_pages.to_string()),
        ];
        if let Some(link) = self.links(base).header_value() {
            headers.push((LINK, link));
        }
        headers
    }

    /// Stages the headers on `cx`, with links built from the request URL.
    ///
    /// Must run before the response is sent.
    pub fn apply(&self, cx: &mut Context) -> Result<(), Error> {
        let base = cx.base_url();
        for (name, value) in self.headers(&base) {
            cx.set_header(name, value)?;
        }
        Ok(())
    }
}

impl PageLinks {
    /// `<url>; rel="prev", <url>; rel="next", ...` in prev, next, first, last
    /// order, or `None` if there are no links.
    pub fn header_value(&self) -> Option<String> {
        let rels = [
            ("prev", &self.prev),
            ("next", &self.next),
            ("first", &self.first),
            ("last", &self.last),
        ];
        let parts: Vec<String> = rels.iter()
            .filter_map(|(rel, url)| url.as_ref().map(|u| format!("<{u}>; rel=\"{rel}\"")))
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;

    const BASE: &str = "http://h/items";

    #[test]
    fn total_pages() {
        assert_eq!(Pagination::new(95, 1, 10).total_pages, 10);
        assert_eq!(Pagination::new(100, 1, 10).total_pages, 10);
        assert_eq!(Pagination::new(101, 1, 10).total_pages, 11);
        assert_eq!(Pagination::new(0, 1, 10).total_pages, 1);
        assert_eq!(Pagination::new(5, 1, 0).total_pages, 1);
    }

    #[test]
    fn first_page() {
        let links = Pagination::new(95, 1, 10).links(BASE);
        assert_eq!(links.first, None);
        assert_eq!(links.prev, None);
        assert_eq!(links.next.as_deref(), Some("http://h/items?page=2&size=10"));
        assert_eq!(links.last.as_deref(), Some("http://h/items?page=10&size=10"));
    }

    #[test]
    fn last_page() {
        let links = Pagination::new(95, 10, 10).links(BASE);
        assert_eq!(links.last, None);
        assert_eq!(links.next, None);
        assert_eq!(links.prev.as_deref(), Some("http://h/items?page=9&size=10"));
        assert_eq!(links.first.as_deref(), Some("http://h/items?page=1&size=10"));
    }

    #[test]
    fn single_page_has_no_link_header() {
        let headers = Pagination::new(3, 1, 10).headers(BASE);
        assert_eq!(headers.len(), 4);
        assert!(headers.iter().all(|(name, _)| *name != LINK));
    }

    #[test]
    fn link_header_order() {
        let link = Pagination::new(30, 2, 10).links(BASE).header_value().unwrap();
        assert_eq!(
            link,
            "<http://h/items?page=1&size=10>; rel=\"prev\", \
             <http://h/items?page=3&size=10>; rel=\"next\", \
             <http://h/items?page=1&size=10>; rel=\"first\", \
             <http://h/items?page=3&size=10>; rel=\"last\"",
        );
    }

    #[test]
    fn apply_stages_headers_from_request_url() {
        let mut cx = Context::from_parts(Method::GET, "https://api.test/items?page=3&size=5");
        Pagination::new(12, 3, 5).apply(&mut cx).unwrap();

        assert_eq!(cx.staged_header("x-total-count"), Some("12"));
        assert_eq!(cx.staged_header("x-page"), Some("3"));
        assert_eq!(cx.staged_header("x-page-size"), Some("5"));
        assert_eq!(cx.staged_header("x-total-pages"), Some("3"));
        assert_eq!(
            cx.staged_header("link"),
            Some("<https://api.test/items?page=2&size=5>; rel=\"prev\", <https://api.test/items?page=1&size=5>; rel=\"first\""),
        );
    }
}
