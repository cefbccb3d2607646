//! # Dispatcher Module
//!
//! The host-facing side of the middleware contract. A host pipeline (an HTTP
//! server or router) adapts its own request and response types into
//! [`HandlerRequest`] and [`HandlerResponse`], and wraps whatever runs after
//! the middleware into a [`Next`] continuation.
//!
//! ```rust
//! use brrtrouter_cors::dispatcher::{HandlerRequest, HandlerResponse, HeaderVec, Next};
//! use http::Method;
//! use std::sync::Arc;
//!
//! let mut headers = HeaderVec::new();
//! headers.push((Arc::from("origin"), "https://app.example.com".to_string()));
//! let req = HandlerRequest::new(Method::GET, "/pets", headers);
//! let res = HandlerResponse::default();
//! let next = Next::new(|res| async move {
//!     res.status = 200;
//!     Ok::<(), anyhow::Error>(())
//! });
//! # let _ = (req, res, next);
//! ```

mod core;
pub mod vary;

pub use self::core::{HandlerRequest, HandlerResponse, HeaderVec, Next, MAX_INLINE_HEADERS};
