//! Logging trait for dispatcher activity.
//!
//! This module provides the [`DispatchLogger`] trait that allows callers to
//! capture every query the [`QueryDispatcher`](crate::QueryDispatcher) sends and
//! how it settled.

use crate::error::Error;
use crate::types::{QueryReply, QueryRequest};

/// A trait for logging dispatched queries.
///
/// Exactly one of [`log_reply`](DispatchLogger::log_reply) or
/// [`log_failure`](DispatchLogger::log_failure) follows each
/// [`log_request`](DispatchLogger::log_request).
///
/// # Example
///
/// ```rust,ignore
/// use ecobot::{DispatchLogger, Error, QueryReply, QueryRequest};
///
/// struct Quiet;
///
/// impl DispatchLogger for Quiet {
///     fn log_request(&self, _request: &QueryRequest) {}
///     fn log_reply(&self, _request: &QueryRequest, _reply: &QueryReply) {}
///     fn log_failure(&self, request: &QueryRequest, error: &Error) {
///         eprintln!("{} failed: {error}", request.query);
///     }
/// }
/// ```
pub trait DispatchLogger: Send + Sync {
    /// Log a query just before it is handed to the answering service.
    fn log_request(&self, request: &QueryRequest);

    /// Log a decoded reply.
    fn log_reply(&self, request: &QueryRequest, reply: &QueryReply);

    /// Log a failed dispatch.
    fn log_failure(&self, request: &QueryRequest, error: &Error);
}

/// Writes one line per event to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrLogger;

impl DispatchLogger for StderrLogger {
    fn log_request(&self, request: &QueryRequest) {
        eprintln!("[dispatch] sending query: {:?}", request.query);
    }

    fn log_reply(&self, request: &QueryRequest, reply: &QueryReply) {
        match &reply.answer {
            Some(answer) => eprintln!(
                "[dispatch] {:?} answered ({} bytes, {} sources)",
                request.query,
                answer.len(),
                reply.sources.len()
            ),
            None => eprintln!("[dispatch] {:?} answered without a response field", request.query),
        }
    }

    fn log_failure(&self, request: &QueryRequest, error: &Error) {
        eprintln!("[dispatch] {:?} failed: {error}", request.query);
    }
}
