mod builder;
mod config;
mod directive;
mod error;
mod options;

pub use builder::CorsMiddlewareBuilder;
pub use config::{CorsFileConfig, OriginConfig, OriginEntryConfig, CORS_CONFIG_ENV};
pub use directive::{
    apply_headers, configure_allowed_headers, configure_credentials, configure_exposed_headers,
    configure_max_age, configure_methods, configure_origin, HeaderDirective, VARY_ORIGIN,
    VARY_REQUEST_HEADERS,
};
pub use error::CorsConfigError;
pub use options::{
    AllowedOrigin, CorsOptions, CorsOverrides, CorsSetting, HeaderList, MaxAge, OriginFn,
    OriginMatcher, OriginPolicy, DEFAULT_METHODS, DEFAULT_OPTIONS_SUCCESS_STATUS,
};

use std::borrow::Cow;

use futures::future::BoxFuture;
use http::header::{CONTENT_LENGTH, ORIGIN};
use tracing::debug;

use crate::dispatcher::{HandlerRequest, HandlerResponse, Next};
use crate::middleware::{Disposition, Middleware};

/// CORS (Cross-Origin Resource Sharing) middleware
///
/// Decides per request which CORS headers to emit, applies them to the
/// response, and either hands the request on or answers a preflight itself.
///
/// # CORS Flow
///
/// 1. **Disabled**: nothing is touched, the pipeline continues
/// 2. **Computed origin returns `None`**: same as disabled, for this request only
/// 3. **Preflight (`OPTIONS`)**: origin, credentials, methods, allowed headers,
///    max age and exposed headers are applied. Unless `preflight_continue` is
///    set, the response is finalized with `options_success_status` and
///    `Content-Length: 0` and the pipeline does **not** continue.
/// 4. **Actual request**: origin, credentials and exposed headers are applied
///    before the pipeline continues; the handler owns status and body.
///
/// # Usage
///
/// ```rust
/// use brrtrouter_cors::middleware::{cors, CorsMiddlewareBuilder};
///
/// // Reflect any origin, with credentials
/// let permissive = cors(true);
///
/// // Explicit configuration
/// let strict = CorsMiddlewareBuilder::new()
///     .allowed_origins(&["https://app.example.com"])
///     .origin_pattern(r"\.example\.com$")
///     .credentials(true)
///     .max_age(600u64)
///     .build()
///     .expect("valid CORS configuration");
/// # let _ = (permissive, strict);
/// ```
#[derive(Clone, Debug)]
pub struct CorsMiddleware {
    /// `None` when CORS is disabled entirely
    options: Option<CorsOptions>,
}

/// Build the middleware from a top-level setting (`false`, `true`, or overrides)
///
/// - `false` disables CORS processing
/// - `true` (or no overrides) reflects any origin and allows credentials
/// - overrides are merged over the defaults
#[must_use]
pub fn cors(setting: impl Into<CorsSetting>) -> CorsMiddleware {
    CorsMiddleware::from_setting(setting.into())
}

impl CorsMiddleware {
    /// Resolve a top-level setting into the middleware
    #[must_use]
    pub fn from_setting(setting: CorsSetting) -> Self {
        let options = match setting {
            CorsSetting::Disabled => None,
            CorsSetting::Permissive => Some(CorsOptions::permissive()),
            CorsSetting::Custom(overrides) => Some(CorsOptions::default().merge(&overrides)),
        };
        Self { options }
    }

    /// Reflect any origin and allow credentials
    #[must_use]
    pub fn permissive() -> Self {
        Self::from_setting(CorsSetting::Permissive)
    }

    /// Pass every request through untouched
    #[must_use]
    pub fn disabled() -> Self {
        Self::from_setting(CorsSetting::Disabled)
    }

    /// Defaults merged with `overrides`
    #[must_use]
    pub fn with_overrides(overrides: CorsOverrides) -> Self {
        Self::from_setting(CorsSetting::Custom(overrides))
    }

    /// Use fully resolved options as they are
    #[must_use]
    pub fn with_options(options: CorsOptions) -> Self {
        Self {
            options: Some(options),
        }
    }

    /// The effective options, `None` when disabled
    #[must_use]
    pub fn options(&self) -> Option<&CorsOptions> {
        self.options.as_ref()
    }

    /// Resolve the allowed origin for this request
    ///
    /// A computed origin is evaluated exactly once here. `None` means CORS does
    /// not apply to the request (disabled, or the callback rejected it).
    fn resolve_origin<'s>(
        &'s self,
        req: &HandlerRequest,
    ) -> Option<(&'s CorsOptions, Cow<'s, AllowedOrigin>)> {
        let options = self.options.as_ref()?;
        let origin = match &options.origin {
            OriginPolicy::Allowed(origin) => Cow::Borrowed(origin),
            OriginPolicy::Computed(compute) => {
                let computed = compute(req.get_header(ORIGIN.as_str()))?;
                if matches!(&computed, AllowedOrigin::Fixed(o) if o.is_empty()) {
                    return None;
                }
                Cow::Owned(computed)
            }
        };
        Some((options, origin))
    }

    /// The ordered header directives this request would receive
    ///
    /// Returns `None` when CORS processing is skipped for the request.
    #[must_use]
    pub fn directives_for(&self, req: &HandlerRequest) -> Option<Vec<HeaderDirective>> {
        let (options, origin) = self.resolve_origin(req)?;
        Some(build_directives(options, &origin, req))
    }
}

/// Preflight: origin, credentials, methods, allowed headers, max age, exposed headers.
/// Actual request: origin, credentials, exposed headers.
fn build_directives(
    options: &CorsOptions,
    origin: &AllowedOrigin,
    req: &HandlerRequest,
) -> Vec<HeaderDirective> {
    let mut directives: Vec<HeaderDirective> =
        configure_origin(origin, req).into_iter().flatten().collect();
    directives.extend(configure_credentials(options));

    if req.is_options() {
        directives.extend(configure_methods(options));
        directives.extend(configure_allowed_headers(options, req).into_iter().flatten());
        directives.extend(configure_max_age(options));
    }

    directives.extend(configure_exposed_headers(options));
    directives
}

impl Middleware for CorsMiddleware {
    fn handle<'a>(
        &'a self,
        req: &'a HandlerRequest,
        res: &'a mut HandlerResponse,
        next: Next<'a>,
    ) -> BoxFuture<'a, anyhow::Result<Disposition>> {
        Box::pin(async move {
            let Some((options, origin)) = self.resolve_origin(req) else {
                debug!(method = %req.method, path = %req.path, "CORS: not applicable, passing through");
                next.run(res).await?;
                return Ok(Disposition::Skipped);
            };

            let directives = build_directives(options, &origin, req);
            apply_headers(&directives, res);

            if req.is_options() && !options.preflight_continue {
                let status = (options.options_success_status != 0).then(|| {
                    res.status = options.options_success_status;
                    res.set_header(CONTENT_LENGTH.as_str(), "0".to_string());
                    options.options_success_status
                });
                debug!(path = %req.path, status = ?status, "CORS: preflight answered");
                return Ok(Disposition::ShortCircuited { status });
            }

            next.run(res).await?;
            Ok(Disposition::Continued)
        })
    }
}

/// Permissive by default, matching the `cors(true)` shorthand
impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::permissive()
    }
}
