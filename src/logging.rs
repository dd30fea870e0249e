use std::fmt;

/// A request-scoped logging handle.
///
/// Obtained from [`Ctx::log`](crate::Ctx::log). Every event carries the
/// request id and the acting principal (`-` when anonymous) as structured
/// fields. It is lifetime-bound to the context it came from.
///
/// Secret values are redacted by their own `Debug`/`Display` impls, so they
/// may be passed through here safely.
#[derive(Debug, Clone, Copy)]
pub struct RequestLog<'a> {
    request_id: &'a str,
    principal: Option<&'a str>,
}

impl<'a> RequestLog<'a> {
    /// `pub(crate)`: only `Ctx` creates request loggers.
    pub(crate) fn new(request_id: &'a str, principal: Option<&'a str>) -> Self {
        Self {
            request_id,
            principal,
        }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    fn principal(&self) -> &str {
        self.principal.unwrap_or("-")
    }

    /// Logs an info-level message.
    ///
    /// ```
    /// # use accounts_core::{Ctx, RequestMeta, Secret};
    /// # use http::Method;
    /// let ctx = Ctx::new(&RequestMeta::anonymous("req-1"), Method::POST);
    /// let password = Secret::new("hunter2".to_string());
    /// ctx.log().info(format_args!("login attempt with {:?}", password));
    /// // logs "login attempt with [REDACTED]"
    /// ```
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, principal = %self.principal(), "{}", args);
    }

    /// Logs a warning-level message.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, principal = %self.principal(), "{}", args);
    }

    /// Logs an error-level message.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, principal = %self.principal(), "{}", args);
    }

    /// Logs a debug-level message.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, principal = %self.principal(), "{}", args);
    }
}
