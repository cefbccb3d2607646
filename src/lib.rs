//! # BRRTRouter CORS
//!
//! CORS (Cross-Origin Resource Sharing) decision middleware for request
//! pipelines. Given the resolved options and an incoming request, it decides
//! which `Access-Control-*` and `Vary` headers the response gets, and whether
//! a preflight is answered on the spot or handed on to the rest of the
//! pipeline.
//!
//! ## Architecture
//!
//! - **[`dispatcher`]** - Request/response views and the [`Next`](dispatcher::Next) continuation
//! - **[`middleware`]** - The [`Middleware`](middleware::Middleware) contract and the CORS engine
//! - **[`otel`]** - Structured logging setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host as Host Pipeline
//!     participant Cors as CorsMiddleware
//!     participant Next as Next (downstream)
//!
//!     Host->>Cors: handle(req, res, next)
//!     alt CORS disabled or origin callback returned None
//!         Cors->>Next: run(res)
//!         Next-->>Cors: Ok / Err
//!         Cors-->>Host: Skipped
//!     else OPTIONS (preflight)
//!         Cors->>Cors: origin, credentials, methods,<br/>allowed headers, max age, exposed headers
//!         alt preflight_continue
//!             Cors->>Next: run(res)
//!             Cors-->>Host: Continued
//!         else
//!             Cors->>Cors: status = options_success_status<br/>Content-Length: 0
//!             Cors-->>Host: ShortCircuited
//!         end
//!     else actual request
//!         Cors->>Cors: origin, credentials, exposed headers
//!         Cors->>Next: run(res)
//!         Cors-->>Host: Continued
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtrouter_cors::dispatcher::{HandlerRequest, HandlerResponse, HeaderVec, Next};
//! use brrtrouter_cors::middleware::{cors, Disposition, Middleware};
//! use http::Method;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mw = cors(true);
//!
//! let mut headers = HeaderVec::new();
//! headers.push((Arc::from("origin"), "https://app.example.com".to_string()));
//! let req = HandlerRequest::new(Method::OPTIONS, "/pets", headers);
//! let mut res = HandlerResponse::default();
//!
//! let outcome = mw.handle(&req, &mut res, Next::noop()).await.unwrap();
//! assert_eq!(outcome, Disposition::ShortCircuited { status: Some(204) });
//! assert_eq!(res.get_header("access-control-allow-origin"), Some("https://app.example.com"));
//! assert_eq!(res.get_header("access-control-allow-credentials"), Some("true"));
//! # });
//! ```

pub mod dispatcher;
pub mod middleware;
pub mod otel;

pub use middleware::{cors, CorsMiddleware, CorsMiddlewareBuilder, Disposition, Middleware};
