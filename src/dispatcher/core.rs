//! Request/response views handed to middleware by the host pipeline.
//!
//! Header storage uses `SmallVec` so the common case (a handful of headers)
//! never touches the heap. Header names are `Arc<str>`: most of them are
//! static strings repeated on every request.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use http::Method;
use smallvec::SmallVec;

use super::vary;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage, `(name, value)` pairs in insertion order
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Read-only view of an inbound request
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// HTTP method (GET, OPTIONS, etc.)
    pub method: Method,
    /// Request path
    pub path: String,
    /// HTTP headers
    pub headers: HeaderVec,
}

impl HandlerRequest {
    /// Create a request view from its parts
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderVec) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
        }
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `true` when the method is `OPTIONS`, compared case-insensitively
    ///
    /// `http::Method` keeps non-canonical spellings such as `options` as
    /// extension methods, so the comparison goes through the string form.
    #[inline]
    #[must_use]
    pub fn is_options(&self) -> bool {
        self.method.as_str().eq_ignore_ascii_case(Method::OPTIONS.as_str())
    }
}

/// Mutable response under construction
///
/// Middleware writes headers and (for short-circuited preflights) the
/// status. The body stays with the host.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    /// HTTP status code (200, 204, 404, etc.)
    pub status: u16,
    /// HTTP response headers; a name may appear more than once
    pub headers: HeaderVec,
}

impl Default for HandlerResponse {
    fn default() -> Self {
        Self::new(200, HeaderVec::new())
    }
}

impl HandlerResponse {
    /// Create a new response with the given status and headers
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec) -> Self {
        Self { status, headers }
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or overwrite a header
    pub fn set_header(&mut self, name: &str, value: String) {
        // Remove existing header with same name (case-insensitive)
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Merge `fields` into the `Vary` header without dropping what is already there
    ///
    /// Several contributors (CORS, compression, content negotiation) may each
    /// add vary keys; none of them may clobber the others.
    ///
    /// Every existing `Vary` line is folded in, so the result is a single line.
    pub fn append_vary(&mut self, fields: &str) {
        let existing = self
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("vary"))
            .map(|(_, v)| v.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let merged = vary::append(&existing, fields);
        if !merged.is_empty() {
            self.set_header("Vary", merged);
        }
    }
}

/// The rest of the pipeline, handed to a middleware as an opaque continuation
///
/// Consumed on invocation, so it runs at most once. Its outcome is returned
/// to the caller untouched.
pub struct Next<'a> {
    inner: Box<dyn FnOnce(&'a mut HandlerResponse) -> BoxFuture<'a, anyhow::Result<()>> + Send + 'a>,
}

impl<'a> Next<'a> {
    /// Wrap an async downstream handler
    ///
    /// ```rust
    /// use brrtrouter_cors::dispatcher::Next;
    ///
    /// let next = Next::new(|res| async move {
    ///     res.status = 200;
    ///     Ok::<(), anyhow::Error>(())
    /// });
    /// # drop(next);
    /// ```
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(&'a mut HandlerResponse) -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'a,
    {
        Self {
            inner: Box::new(
                move |res: &'a mut HandlerResponse| -> BoxFuture<'a, anyhow::Result<()>> {
                    Box::pin(f(res))
                },
            ),
        }
    }

    /// A continuation that does nothing (end of the pipeline)
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_res| async { Ok::<(), anyhow::Error>(()) })
    }

    /// Invoke the downstream pipeline
    pub async fn run(self, res: &'a mut HandlerResponse) -> anyhow::Result<()> {
        (self.inner)(res).await
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Next(<continuation>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_get_header_is_case_insensitive() {
        let req = HandlerRequest::new(
            Method::GET,
            "/",
            smallvec![(Arc::from("Origin"), "https://a.com".to_string())],
        );
        assert_eq!(req.get_header("origin"), Some("https://a.com"));
        assert_eq!(req.get_header("ORIGIN"), Some("https://a.com"));
        assert_eq!(req.get_header("host"), None);
    }

    #[test]
    fn test_is_options_ignores_case() {
        let upper = HandlerRequest::new(Method::OPTIONS, "/", HeaderVec::new());
        assert!(upper.is_options());

        let lower = HandlerRequest::new(
            Method::from_bytes(b"options").unwrap(),
            "/",
            HeaderVec::new(),
        );
        assert!(lower.is_options());

        let get = HandlerRequest::new(Method::GET, "/", HeaderVec::new());
        assert!(!get.is_options());
    }

    #[test]
    fn test_set_header_replaces_existing() {
        let mut res = HandlerResponse::default();
        res.set_header("content-length", "10".to_string());
        res.set_header("Content-Length", "0".to_string());
        assert_eq!(res.headers.len(), 1);
        assert_eq!(res.get_header("content-length"), Some("0"));
    }

    #[test]
    fn test_append_vary_keeps_existing_fields() {
        let mut res = HandlerResponse::default();
        res.set_header("Vary", "Accept-Encoding".to_string());
        res.append_vary("Origin");
        res.append_vary("origin");
        assert_eq!(res.get_header("vary"), Some("Accept-Encoding, Origin"));
    }

    #[test]
    fn test_append_vary_folds_every_vary_line() {
        let mut res = HandlerResponse::new(
            200,
            smallvec![
                (Arc::from("Vary"), "Accept-Encoding".to_string()),
                (Arc::from("content-type"), "text/plain".to_string()),
                (Arc::from("vary"), "Accept-Language".to_string()),
            ],
        );
        res.append_vary("Origin");

        let vary_lines: Vec<&str> = res
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("vary"))
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(vary_lines, vec!["Accept-Encoding, Accept-Language, Origin"]);
        assert_eq!(res.get_header("content-type"), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_next_runs_downstream() {
        let mut res = HandlerResponse::default();
        let next = Next::new(|res| async move {
            res.status = 418;
            Ok::<(), anyhow::Error>(())
        });
        next.run(&mut res).await.unwrap();
        assert_eq!(res.status, 418);
    }
}
