//! Header directives: the decisions the engine makes, separated from the
//! response they are applied to.
//!
//! Each `configure_*` function inspects the options (and sometimes the
//! request) and yields zero or more directives. The engine concatenates them
//! into one flat, ordered list and hands it to [`apply_headers`].

use http::header::{
    HeaderName, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
    ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS, ORIGIN,
};
use tracing::{debug, trace};

use super::options::{AllowedOrigin, CorsOptions};
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// `Vary` field for origin-dependent responses
pub const VARY_ORIGIN: &str = "Origin";
/// `Vary` field for responses that reflect the requested headers
pub const VARY_REQUEST_HEADERS: &str = "Access-Control-Request-Headers";

/// A single header decision
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderDirective {
    /// Overwrite `name` with `value`
    Set { name: HeaderName, value: String },
    /// Merge a field into `Vary`
    Vary(&'static str),
}

impl HeaderDirective {
    fn set(name: HeaderName, value: impl Into<String>) -> Self {
        HeaderDirective::Set {
            name,
            value: value.into(),
        }
    }
}

/// `Access-Control-Allow-Origin` and, when the answer depends on the request, `Vary: Origin`
#[must_use]
pub fn configure_origin(
    origin: &AllowedOrigin,
    req: &HandlerRequest,
) -> [Option<HeaderDirective>; 2] {
    if origin.is_wildcard() {
        return [Some(HeaderDirective::set(ACCESS_CONTROL_ALLOW_ORIGIN, "*")), None];
    }

    if let AllowedOrigin::Fixed(fixed) = origin {
        return [
            Some(HeaderDirective::set(ACCESS_CONTROL_ALLOW_ORIGIN, fixed.as_str())),
            Some(HeaderDirective::Vary(VARY_ORIGIN)),
        ];
    }

    let request_origin = req.get_header(ORIGIN.as_str());
    let allow = request_origin
        .filter(|o| !o.is_empty() && origin.admits(Some(*o)))
        .map(|o| HeaderDirective::set(ACCESS_CONTROL_ALLOW_ORIGIN, o));
    if allow.is_none() {
        if let Some(rejected) = request_origin {
            debug!(origin = %rejected, "CORS: origin not allowed");
        }
    }
    [allow, Some(HeaderDirective::Vary(VARY_ORIGIN))]
}

#[must_use]
pub fn configure_credentials(options: &CorsOptions) -> Option<HeaderDirective> {
    options
        .credentials
        .then(|| HeaderDirective::set(ACCESS_CONTROL_ALLOW_CREDENTIALS, "true"))
}

#[must_use]
pub fn configure_methods(options: &CorsOptions) -> Option<HeaderDirective> {
    let methods = options.methods.joined();
    (!methods.is_empty()).then(|| HeaderDirective::set(ACCESS_CONTROL_ALLOW_METHODS, methods))
}

/// Configured allowed headers, or a reflection of `Access-Control-Request-Headers`
///
/// Reflection also adds `Vary: Access-Control-Request-Headers`, ahead of the
/// allow directive.
#[must_use]
pub fn configure_allowed_headers(
    options: &CorsOptions,
    req: &HandlerRequest,
) -> [Option<HeaderDirective>; 2] {
    match options.allowed_headers.as_ref().filter(|h| !h.is_unset()) {
        Some(configured) => {
            let value = configured.joined();
            [
                None,
                (!value.is_empty())
                    .then(|| HeaderDirective::set(ACCESS_CONTROL_ALLOW_HEADERS, value)),
            ]
        }
        None => {
            let requested = req
                .get_header(ACCESS_CONTROL_REQUEST_HEADERS.as_str())
                .filter(|h| !h.is_empty())
                .map(|h| HeaderDirective::set(ACCESS_CONTROL_ALLOW_HEADERS, h));
            [Some(HeaderDirective::Vary(VARY_REQUEST_HEADERS)), requested]
        }
    }
}

#[must_use]
pub fn configure_exposed_headers(options: &CorsOptions) -> Option<HeaderDirective> {
    let value = options.exposed_headers.as_ref()?.joined();
    (!value.is_empty()).then(|| HeaderDirective::set(ACCESS_CONTROL_EXPOSE_HEADERS, value))
}

#[must_use]
pub fn configure_max_age(options: &CorsOptions) -> Option<HeaderDirective> {
    let value = options.max_age.as_ref()?.header_value()?;
    Some(HeaderDirective::set(ACCESS_CONTROL_MAX_AGE, value))
}

/// Write directives to the response in order
///
/// `Vary` directives merge into the existing header. `Set` directives
/// overwrite; an empty value is skipped and never clears a header written by
/// someone else.
pub fn apply_headers(directives: &[HeaderDirective], res: &mut HandlerResponse) {
    for directive in directives {
        match directive {
            HeaderDirective::Vary(field) => {
                trace!(field = %field, "cors: vary");
                res.append_vary(field);
            }
            HeaderDirective::Set { name, value } if !value.is_empty() => {
                trace!(header = %name, value = %value, "cors: set header");
                res.set_header(name.as_str(), value.clone());
            }
            HeaderDirective::Set { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::HeaderVec;
    use crate::middleware::cors::options::{HeaderList, MaxAge};
    use http::Method;
    use regex::Regex;
    use smallvec::smallvec;
    use std::sync::Arc;

    fn request(origin: Option<&str>, request_headers: Option<&str>) -> HandlerRequest {
        let mut headers = HeaderVec::new();
        if let Some(o) = origin {
            headers.push((Arc::from("origin"), o.to_string()));
        }
        if let Some(h) = request_headers {
            headers.push((Arc::from("access-control-request-headers"), h.to_string()));
        }
        HandlerRequest::new(Method::OPTIONS, "/", headers)
    }

    fn flat(directives: [Option<HeaderDirective>; 2]) -> Vec<HeaderDirective> {
        directives.into_iter().flatten().collect()
    }

    #[test]
    fn test_wildcard_has_no_vary() {
        let req = request(Some("https://a.com"), None);
        let out = flat(configure_origin(&AllowedOrigin::Wildcard, &req));
        assert_eq!(out, vec![HeaderDirective::set(ACCESS_CONTROL_ALLOW_ORIGIN, "*")]);
    }

    #[test]
    fn test_fixed_origin_ignores_request() {
        let req = request(Some("https://evil.com"), None);
        let out = flat(configure_origin(&AllowedOrigin::from("https://a.com"), &req));
        assert_eq!(
            out,
            vec![
                HeaderDirective::set(ACCESS_CONTROL_ALLOW_ORIGIN, "https://a.com"),
                HeaderDirective::Vary(VARY_ORIGIN),
            ]
        );
    }

    #[test]
    fn test_rejected_origin_still_varies() {
        let req = request(Some("https://example.org"), None);
        let pattern = AllowedOrigin::Pattern(Regex::new(r"example\.com$").unwrap());
        let out = flat(configure_origin(&pattern, &req));
        assert_eq!(out, vec![HeaderDirective::Vary(VARY_ORIGIN)]);
    }

    #[test]
    fn test_reflect_without_origin_sets_nothing() {
        let req = request(None, None);
        let out = flat(configure_origin(&AllowedOrigin::Reflect, &req));
        assert_eq!(out, vec![HeaderDirective::Vary(VARY_ORIGIN)]);
    }

    #[test]
    fn test_allowed_headers_reflects_request() {
        let req = request(None, Some("X-Custom, Content-Type"));
        let out = flat(configure_allowed_headers(&CorsOptions::default(), &req));
        assert_eq!(
            out,
            vec![
                HeaderDirective::Vary(VARY_REQUEST_HEADERS),
                HeaderDirective::set(ACCESS_CONTROL_ALLOW_HEADERS, "X-Custom, Content-Type"),
            ]
        );
    }

    #[test]
    fn test_allowed_headers_configured_list() {
        let options = CorsOptions {
            allowed_headers: Some(HeaderList::from(vec!["Content-Type", "Authorization"])),
            ..CorsOptions::default()
        };
        let req = request(None, Some("X-Ignored"));
        let out = flat(configure_allowed_headers(&options, &req));
        assert_eq!(
            out,
            vec![HeaderDirective::set(
                ACCESS_CONTROL_ALLOW_HEADERS,
                "Content-Type,Authorization"
            )]
        );
    }

    #[test]
    fn test_empty_allowed_header_list_emits_nothing() {
        let options = CorsOptions {
            allowed_headers: Some(HeaderList::List(vec![])),
            ..CorsOptions::default()
        };
        let out = flat(configure_allowed_headers(&options, &request(None, Some("X-A"))));
        assert!(out.is_empty());
    }

    #[test]
    fn test_optional_directives() {
        let mut options = CorsOptions::default();
        assert_eq!(configure_credentials(&options), None);
        assert_eq!(configure_exposed_headers(&options), None);
        assert_eq!(configure_max_age(&options), None);
        assert_eq!(
            configure_methods(&options),
            Some(HeaderDirective::set(
                ACCESS_CONTROL_ALLOW_METHODS,
                "GET,HEAD,PUT,PATCH,POST,DELETE"
            ))
        );

        options.credentials = true;
        options.exposed_headers = Some(HeaderList::from(vec!["X-Total-Count", "X-Page"]));
        options.max_age = Some(MaxAge::Seconds(0));
        assert_eq!(
            configure_credentials(&options),
            Some(HeaderDirective::set(ACCESS_CONTROL_ALLOW_CREDENTIALS, "true"))
        );
        assert_eq!(
            configure_exposed_headers(&options),
            Some(HeaderDirective::set(ACCESS_CONTROL_EXPOSE_HEADERS, "X-Total-Count,X-Page"))
        );
        assert_eq!(
            configure_max_age(&options),
            Some(HeaderDirective::set(ACCESS_CONTROL_MAX_AGE, "0"))
        );
    }

    #[test]
    fn test_apply_headers_never_clears() {
        let mut res = HandlerResponse::new(200, smallvec![]);
        res.set_header("access-control-allow-origin", "https://kept.com".to_string());
        res.set_header("vary", "Accept-Encoding".to_string());

        apply_headers(
            &[
                HeaderDirective::set(ACCESS_CONTROL_ALLOW_ORIGIN, ""),
                HeaderDirective::Vary(VARY_ORIGIN),
            ],
            &mut res,
        );

        assert_eq!(res.get_header("access-control-allow-origin"), Some("https://kept.com"));
        assert_eq!(res.get_header("vary"), Some("Accept-Encoding, Origin"));
    }
}
