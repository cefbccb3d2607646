use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// Methods advertised on preflight responses unless overridden
pub const DEFAULT_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

/// Status used to finalize a preflight unless overridden
pub const DEFAULT_OPTIONS_SUCCESS_STATUS: u16 = 204;

/// Per-request origin callback
///
/// Receives the request's `Origin` header (if any). Returning `None` means
/// CORS does not apply to this request at all: no headers are written and the
/// pipeline continues.
pub type OriginFn = Arc<dyn Fn(Option<&str>) -> Option<AllowedOrigin> + Send + Sync>;

/// One entry of an allowed-origin list
#[derive(Clone, Debug)]
pub enum OriginMatcher {
    /// Exact, case-sensitive string comparison
    Exact(String),
    /// Regex test against the request origin
    Pattern(Regex),
    /// Nested list (any entry may match)
    List(Vec<OriginMatcher>),
}

impl OriginMatcher {
    /// Test a request origin; an absent origin matches nothing
    #[must_use]
    pub fn matches(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin else {
            return false;
        };
        match self {
            OriginMatcher::Exact(allowed) => allowed == origin,
            OriginMatcher::Pattern(re) => re.is_match(origin),
            OriginMatcher::List(entries) => entries.iter().any(|m| m.matches(Some(origin))),
        }
    }
}

impl From<&str> for OriginMatcher {
    fn from(origin: &str) -> Self {
        OriginMatcher::Exact(origin.to_string())
    }
}

impl From<String> for OriginMatcher {
    fn from(origin: String) -> Self {
        OriginMatcher::Exact(origin)
    }
}

impl From<Regex> for OriginMatcher {
    fn from(re: Regex) -> Self {
        OriginMatcher::Pattern(re)
    }
}

impl<T: Into<OriginMatcher>> From<Vec<T>> for OriginMatcher {
    fn from(entries: Vec<T>) -> Self {
        OriginMatcher::List(entries.into_iter().map(Into::into).collect())
    }
}

/// Which origins a response admits
#[derive(Clone, Debug)]
pub enum AllowedOrigin {
    /// Echo the request's own `Origin` back (`origin: true`)
    Reflect,
    /// `Access-Control-Allow-Origin: *` (also what `origin: false` means here)
    Wildcard,
    /// A fixed origin sent regardless of the request
    ///
    /// `"*"` and `""` behave like [`AllowedOrigin::Wildcard`].
    Fixed(String),
    /// Reflect the request origin if any entry matches
    List(Vec<OriginMatcher>),
    /// Reflect the request origin if the pattern matches
    Pattern(Regex),
}

impl AllowedOrigin {
    /// Build an allowed-origin list from anything convertible to matchers
    #[must_use]
    pub fn list<T: Into<OriginMatcher>>(entries: impl IntoIterator<Item = T>) -> Self {
        AllowedOrigin::List(entries.into_iter().map(Into::into).collect())
    }

    /// Whether this value emits the `*` wildcard
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        match self {
            AllowedOrigin::Wildcard => true,
            AllowedOrigin::Fixed(origin) => origin.is_empty() || origin == "*",
            _ => false,
        }
    }

    /// Whether the request origin is admitted by a reflecting policy
    ///
    /// Only meaningful for [`Reflect`](AllowedOrigin::Reflect),
    /// [`List`](AllowedOrigin::List) and [`Pattern`](AllowedOrigin::Pattern).
    #[must_use]
    pub fn admits(&self, origin: Option<&str>) -> bool {
        match self {
            AllowedOrigin::Reflect => true,
            AllowedOrigin::List(entries) => entries.iter().any(|m| m.matches(origin)),
            AllowedOrigin::Pattern(re) => origin.is_some_and(|o| re.is_match(o)),
            AllowedOrigin::Wildcard | AllowedOrigin::Fixed(_) => false,
        }
    }
}

impl From<bool> for AllowedOrigin {
    fn from(allow: bool) -> Self {
        if allow {
            AllowedOrigin::Reflect
        } else {
            AllowedOrigin::Wildcard
        }
    }
}

impl From<&str> for AllowedOrigin {
    fn from(origin: &str) -> Self {
        AllowedOrigin::Fixed(origin.to_string())
    }
}

impl From<String> for AllowedOrigin {
    fn from(origin: String) -> Self {
        AllowedOrigin::Fixed(origin)
    }
}

impl From<Regex> for AllowedOrigin {
    fn from(re: Regex) -> Self {
        AllowedOrigin::Pattern(re)
    }
}

impl<T: Into<OriginMatcher>> From<Vec<T>> for AllowedOrigin {
    fn from(entries: Vec<T>) -> Self {
        AllowedOrigin::list(entries)
    }
}

/// The `origin` setting: either static or computed per request
#[derive(Clone)]
pub enum OriginPolicy {
    Allowed(AllowedOrigin),
    Computed(OriginFn),
}

impl OriginPolicy {
    /// Wrap a per-request origin callback
    #[must_use]
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(Option<&str>) -> Option<AllowedOrigin> + Send + Sync + 'static,
    {
        OriginPolicy::Computed(Arc::new(f))
    }
}

impl Default for OriginPolicy {
    fn default() -> Self {
        OriginPolicy::Allowed(AllowedOrigin::Reflect)
    }
}

impl From<AllowedOrigin> for OriginPolicy {
    fn from(origin: AllowedOrigin) -> Self {
        OriginPolicy::Allowed(origin)
    }
}

impl fmt::Debug for OriginPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginPolicy::Allowed(origin) => f.debug_tuple("Allowed").field(origin).finish(),
            OriginPolicy::Computed(_) => write!(f, "Computed(<function>)"),
        }
    }
}

/// A header value given either as one string or as a list joined with `,`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderList {
    Single(String),
    List(Vec<String>),
}

impl HeaderList {
    /// An empty single string counts as "not configured"
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, HeaderList::Single(s) if s.is_empty())
    }

    /// The header value to emit
    #[must_use]
    pub fn joined(&self) -> String {
        match self {
            HeaderList::Single(s) => s.clone(),
            HeaderList::List(items) => items.join(","),
        }
    }
}

impl From<&str> for HeaderList {
    fn from(value: &str) -> Self {
        HeaderList::Single(value.to_string())
    }
}

impl From<String> for HeaderList {
    fn from(value: String) -> Self {
        HeaderList::Single(value)
    }
}

impl From<Vec<String>> for HeaderList {
    fn from(items: Vec<String>) -> Self {
        HeaderList::List(items)
    }
}

impl From<Vec<&str>> for HeaderList {
    fn from(items: Vec<&str>) -> Self {
        HeaderList::List(items.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for HeaderList {
    fn from(items: &[&str]) -> Self {
        HeaderList::List(items.iter().map(|s| s.to_string()).collect())
    }
}

impl From<&[Method]> for HeaderList {
    fn from(methods: &[Method]) -> Self {
        HeaderList::List(methods.iter().map(|m| m.as_str().to_string()).collect())
    }
}

/// Preflight cache lifetime for `Access-Control-Max-Age`
///
/// Deserializes from a non-negative integer (`Seconds`), or from any other
/// number or string (`Raw`, numbers rendered as text).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxAge {
    Seconds(u64),
    /// Passed through verbatim; empty means "not set"
    Raw(#[serde(deserialize_with = "number_or_string")] String),
}

fn number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Text(s) => s,
    })
}

impl MaxAge {
    /// The header value to emit, if any (`0` is a valid value)
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        match self {
            MaxAge::Seconds(secs) => Some(secs.to_string()),
            MaxAge::Raw(raw) if !raw.is_empty() => Some(raw.clone()),
            MaxAge::Raw(_) => None,
        }
    }
}

impl From<u64> for MaxAge {
    fn from(secs: u64) -> Self {
        MaxAge::Seconds(secs)
    }
}

impl From<u32> for MaxAge {
    fn from(secs: u32) -> Self {
        MaxAge::Seconds(u64::from(secs))
    }
}

impl From<Duration> for MaxAge {
    fn from(d: Duration) -> Self {
        MaxAge::Seconds(d.as_secs())
    }
}

impl From<&str> for MaxAge {
    fn from(raw: &str) -> Self {
        MaxAge::Raw(raw.to_string())
    }
}

impl From<String> for MaxAge {
    fn from(raw: String) -> Self {
        MaxAge::Raw(raw)
    }
}

/// Fully resolved CORS configuration
///
/// Read-only for the lifetime of a request. Build it with
/// [`CorsOptions::merge`] from caller overrides; the defaults are never
/// mutated.
#[derive(Clone, Debug)]
pub struct CorsOptions {
    /// Allowed origin(s); default reflects the request origin
    pub origin: OriginPolicy,
    /// `Access-Control-Allow-Methods` on preflight responses
    pub methods: HeaderList,
    /// `Access-Control-Allow-Headers`; `None` reflects `Access-Control-Request-Headers`
    pub allowed_headers: Option<HeaderList>,
    /// `Access-Control-Expose-Headers`
    pub exposed_headers: Option<HeaderList>,
    /// Emit `Access-Control-Allow-Credentials: true`
    pub credentials: bool,
    /// `Access-Control-Max-Age` on preflight responses
    pub max_age: Option<MaxAge>,
    /// Run the rest of the pipeline after answering a preflight
    pub preflight_continue: bool,
    /// Status for short-circuited preflights; `0` leaves status and body length alone
    pub options_success_status: u16,
}

impl Default for CorsOptions {
    fn default() -> Self {
        Self {
            origin: OriginPolicy::default(),
            methods: HeaderList::Single(DEFAULT_METHODS.to_string()),
            allowed_headers: None,
            exposed_headers: None,
            credentials: false,
            max_age: None,
            preflight_continue: false,
            options_success_status: DEFAULT_OPTIONS_SUCCESS_STATUS,
        }
    }
}

impl CorsOptions {
    /// Options used by the bare `cors(true)` shorthand: reflect any origin, with credentials
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            origin: OriginPolicy::Allowed(AllowedOrigin::Reflect),
            credentials: true,
            ..Self::default()
        }
    }

    /// Return a new value with every field set in `overrides` replaced
    #[must_use]
    pub fn merge(&self, overrides: &CorsOverrides) -> Self {
        let base = self.clone();
        Self {
            origin: overrides.origin.clone().unwrap_or(base.origin),
            methods: overrides.methods.clone().unwrap_or(base.methods),
            allowed_headers: overrides.allowed_headers.clone().or(base.allowed_headers),
            exposed_headers: overrides.exposed_headers.clone().or(base.exposed_headers),
            credentials: overrides.credentials.unwrap_or(base.credentials),
            max_age: overrides.max_age.clone().or(base.max_age),
            preflight_continue: overrides
                .preflight_continue
                .unwrap_or(base.preflight_continue),
            options_success_status: overrides
                .options_success_status
                .unwrap_or(base.options_success_status),
        }
    }
}

/// Caller-supplied settings; unset fields keep their defaults
#[derive(Clone, Debug, Default)]
pub struct CorsOverrides {
    pub origin: Option<OriginPolicy>,
    pub methods: Option<HeaderList>,
    pub allowed_headers: Option<HeaderList>,
    pub exposed_headers: Option<HeaderList>,
    pub credentials: Option<bool>,
    pub max_age: Option<MaxAge>,
    pub preflight_continue: Option<bool>,
    pub options_success_status: Option<u16>,
}

/// Top-level switch accepted by [`cors`](super::cors)
#[derive(Clone, Debug, Default)]
pub enum CorsSetting {
    /// No CORS processing at all
    Disabled,
    /// Reflect any origin with credentials
    #[default]
    Permissive,
    /// Defaults merged with the given overrides
    Custom(CorsOverrides),
}

impl From<bool> for CorsSetting {
    fn from(enabled: bool) -> Self {
        if enabled {
            CorsSetting::Permissive
        } else {
            CorsSetting::Disabled
        }
    }
}

impl From<CorsOverrides> for CorsSetting {
    fn from(overrides: CorsOverrides) -> Self {
        CorsSetting::Custom(overrides)
    }
}

impl From<Option<CorsOverrides>> for CorsSetting {
    fn from(overrides: Option<CorsOverrides>) -> Self {
        overrides.map_or(CorsSetting::Permissive, CorsSetting::Custom)
    }
}
