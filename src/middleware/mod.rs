mod core;
mod cors;

pub use self::core::{Disposition, Middleware};
pub use cors::{
    apply_headers, configure_allowed_headers, configure_credentials, configure_exposed_headers,
    configure_max_age, configure_methods, configure_origin, cors, AllowedOrigin, CorsConfigError,
    CorsFileConfig, CorsMiddleware, CorsMiddlewareBuilder, CorsOptions, CorsOverrides,
    CorsSetting, HeaderDirective, HeaderList, MaxAge, OriginConfig, OriginEntryConfig, OriginFn,
    OriginMatcher, OriginPolicy, CORS_CONFIG_ENV, DEFAULT_METHODS,
    DEFAULT_OPTIONS_SUCCESS_STATUS, VARY_ORIGIN, VARY_REQUEST_HEADERS,
};
