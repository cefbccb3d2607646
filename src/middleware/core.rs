use futures::future::BoxFuture;

use crate::dispatcher::{HandlerRequest, HandlerResponse, Next};

/// What a middleware did with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The middleware did not apply; the continuation ran untouched
    Skipped,
    /// Headers were applied and the continuation ran
    Continued,
    /// The middleware answered the request itself; the continuation did not run
    ///
    /// `status` is the status written to the response, if any.
    ShortCircuited { status: Option<u16> },
}

impl Disposition {
    /// `true` if the downstream pipeline was invoked
    #[must_use]
    pub fn invoked_next(&self) -> bool {
        !matches!(self, Disposition::ShortCircuited { .. })
    }
}

/// Request interceptor registered once with the host pipeline
///
/// Called once per request with the request view, the response under
/// construction and the rest of the pipeline. The implementation decides
/// whether to run `next`; any error `next` produces must be returned as is.
pub trait Middleware: Send + Sync {
    fn handle<'a>(
        &'a self,
        req: &'a HandlerRequest,
        res: &'a mut HandlerResponse,
        next: Next<'a>,
    ) -> BoxFuture<'a, anyhow::Result<Disposition>>;
}
