use std::time::Duration;

use http::Method;
use tracing::warn;

use super::error::{compile_pattern, validate_status};
use super::{
    AllowedOrigin, CorsConfigError, CorsMiddleware, CorsOverrides, HeaderList, MaxAge,
    OriginMatcher, OriginPolicy,
};

/// Builder for creating `CorsMiddleware` with a fluent API
///
/// Unset fields keep the defaults (`origin` reflects the request,
/// `methods` is `GET,HEAD,PUT,PATCH,POST,DELETE`, preflights answer `204`).
///
/// # Example
///
/// ```rust
/// use brrtrouter_cors::middleware::CorsMiddlewareBuilder;
/// use http::Method;
///
/// let cors = CorsMiddlewareBuilder::new()
///     .allowed_origins(&["https://example.com", "https://api.example.com"])
///     .methods(&[Method::GET, Method::POST, Method::PUT])
///     .allowed_headers(&["Content-Type", "Authorization", "X-Custom-Header"])
///     .credentials(true)
///     .exposed_headers(&["X-Total-Count", "X-Page-Number"])
///     .max_age(3600u64) // Cache preflight for 1 hour
///     .build()
///     .expect("Invalid CORS configuration");
/// # drop(cors);
/// ```
#[derive(Debug, Default)]
pub struct CorsMiddlewareBuilder {
    overrides: CorsOverrides,
    /// Origin matchers accumulated by `allowed_origins` / `origin_pattern`
    matchers: Vec<OriginMatcher>,
    /// First configuration error, reported by `build()`
    error: Option<CorsConfigError>,
}

impl CorsMiddlewareBuilder {
    /// Create a new builder with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the allowed origin directly, replacing anything set before
    #[must_use]
    pub fn origin(mut self, origin: impl Into<AllowedOrigin>) -> Self {
        self.matchers.clear();
        self.overrides.origin = Some(OriginPolicy::Allowed(origin.into()));
        self
    }

    /// Reflect whatever origin the request declares
    #[must_use]
    pub fn allow_any_origin(self) -> Self {
        self.origin(AllowedOrigin::Reflect)
    }

    /// Answer every request with `Access-Control-Allow-Origin: *`
    #[must_use]
    pub fn wildcard_origin(self) -> Self {
        self.origin(AllowedOrigin::Wildcard)
    }

    /// Admit these exact origins (added to any patterns configured)
    ///
    /// # Example
    ///
    /// ```rust
    /// # use brrtrouter_cors::middleware::CorsMiddlewareBuilder;
    /// let cors = CorsMiddlewareBuilder::new()
    ///     .allowed_origins(&["https://example.com", "https://api.example.com"])
    ///     .build()
    ///     .unwrap();
    /// # drop(cors);
    /// ```
    #[must_use]
    pub fn allowed_origins(mut self, origins: &[&str]) -> Self {
        self.matchers
            .extend(origins.iter().map(|o| OriginMatcher::from(*o)));
        self
    }

    /// Admit origins matching a regular expression
    ///
    /// An invalid pattern is reported by [`build`](Self::build).
    #[must_use]
    pub fn origin_pattern(mut self, pattern: &str) -> Self {
        match compile_pattern(pattern) {
            Ok(re) => self.matchers.push(OriginMatcher::Pattern(re)),
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(e);
                }
            }
        }
        self
    }

    /// Admit origins matching any of the patterns
    #[must_use]
    pub fn origin_patterns(self, patterns: &[&str]) -> Self {
        patterns
            .iter()
            .fold(self, |builder, pattern| builder.origin_pattern(pattern))
    }

    /// Decide the allowed origin per request
    ///
    /// The callback sees the request's `Origin` header. Returning `None`
    /// skips CORS for that request entirely.
    #[must_use]
    pub fn origin_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&str>) -> Option<AllowedOrigin> + Send + Sync + 'static,
    {
        self.matchers.clear();
        self.overrides.origin = Some(OriginPolicy::computed(f));
        self
    }

    /// Set the methods advertised on preflight responses
    #[must_use]
    pub fn methods(mut self, methods: &[Method]) -> Self {
        self.overrides.methods = Some(HeaderList::from(methods));
        self
    }

    /// Set allowed request headers; without this the requested headers are reflected
    #[must_use]
    pub fn allowed_headers(mut self, headers: &[&str]) -> Self {
        self.overrides.allowed_headers = Some(HeaderList::from(headers));
        self
    }

    /// Set headers readable by client scripts
    #[must_use]
    pub fn exposed_headers(mut self, headers: &[&str]) -> Self {
        self.overrides.exposed_headers = Some(HeaderList::from(headers));
        self
    }

    /// Enable or disable `Access-Control-Allow-Credentials: true`
    #[must_use]
    pub fn credentials(mut self, allow: bool) -> Self {
        self.overrides.credentials = Some(allow);
        self
    }

    /// Set the preflight cache duration (seconds or a raw header value)
    #[must_use]
    pub fn max_age(mut self, max_age: impl Into<MaxAge>) -> Self {
        self.overrides.max_age = Some(max_age.into());
        self
    }

    /// Set the preflight cache duration, truncated to whole seconds
    #[must_use]
    pub fn max_age_duration(self, duration: Duration) -> Self {
        self.max_age(duration)
    }

    /// Let the pipeline continue after preflight headers are applied
    #[must_use]
    pub fn preflight_continue(mut self, continue_: bool) -> Self {
        self.overrides.preflight_continue = Some(continue_);
        self
    }

    /// Status for answered preflights (`0` leaves status and length untouched)
    #[must_use]
    pub fn options_success_status(mut self, status: u16) -> Self {
        self.overrides.options_success_status = Some(status);
        self
    }

    /// The overrides collected so far, with origin matchers folded in
    pub fn into_overrides(mut self) -> Result<CorsOverrides, CorsConfigError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if !self.matchers.is_empty() {
            self.overrides.origin = Some(OriginPolicy::Allowed(AllowedOrigin::List(
                self.matchers,
            )));
        }
        if let Some(status) = self.overrides.options_success_status {
            validate_status(status)?;
        }
        Ok(self.overrides)
    }

    /// Build the CORS middleware
    ///
    /// # Errors
    ///
    /// - `CorsConfigError::InvalidPattern` if an origin pattern does not compile
    /// - `CorsConfigError::InvalidStatus` if `options_success_status` is not a valid status
    pub fn build(self) -> Result<CorsMiddleware, CorsConfigError> {
        let overrides = self.into_overrides()?;

        let wildcard = matches!(
            &overrides.origin,
            Some(OriginPolicy::Allowed(origin)) if origin.is_wildcard()
        );
        if wildcard && overrides.credentials == Some(true) {
            warn!(
                "CORS configuration: wildcard origin (*) combined with credentials; \
                browsers will refuse credentialed responses"
            );
        }

        Ok(CorsMiddleware::with_overrides(overrides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_exact_and_pattern_origins() {
        let overrides = CorsMiddlewareBuilder::new()
            .allowed_origins(&["https://a.com"])
            .origin_pattern(r"\.example\.com$")
            .into_overrides()
            .unwrap();
        match overrides.origin {
            Some(OriginPolicy::Allowed(AllowedOrigin::List(matchers))) => {
                assert_eq!(matchers.len(), 2);
                assert!(matches!(matchers[0], OriginMatcher::Exact(_)));
                assert!(matches!(matchers[1], OriginMatcher::Pattern(_)));
            }
            other => panic!("unexpected origin: {other:?}"),
        }
    }

    #[test]
    fn test_builder_reports_first_invalid_pattern() {
        let err = CorsMiddlewareBuilder::new()
            .origin_patterns(&["[a-", "(b"])
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CorsConfigError::InvalidPattern { ref pattern, .. } if pattern == "[a-"
        ));
    }

    #[test]
    fn test_builder_rejects_invalid_status() {
        let err = CorsMiddlewareBuilder::new()
            .options_success_status(42)
            .build()
            .unwrap_err();
        assert_eq!(err, CorsConfigError::InvalidStatus { status: 42 });
    }

    #[test]
    fn test_builder_keeps_defaults_for_unset_fields() {
        let cors = CorsMiddlewareBuilder::new().credentials(true).build().unwrap();
        let options = cors.options().unwrap();
        assert!(options.credentials);
        assert_eq!(options.options_success_status, 204);
        assert!(matches!(
            options.origin,
            OriginPolicy::Allowed(AllowedOrigin::Reflect)
        ));
    }

    #[test]
    fn test_wildcard_with_credentials_is_allowed() {
        let cors = CorsMiddlewareBuilder::new()
            .wildcard_origin()
            .credentials(true)
            .build();
        assert!(cors.is_ok());
    }
}
