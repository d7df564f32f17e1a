//! The query dispatcher.
//!
//! A dispatch maps one submitted query to one call on the answering service and
//! settles it into exactly one assistant-turn text.  Every path produces that
//! text: an answer, the fallback literal, or an `"Error: ..."` diagnostic.
//! Nothing is retried and nothing is cancelled.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::dispatch_logger::DispatchLogger;
use crate::error::Error;
use crate::observability::{
    DISPATCH_ANSWERED, DISPATCH_DURATION, DISPATCH_FAILURES, DISPATCH_REQUESTS,
    DISPATCH_UNANSWERED,
};
use crate::service::AnsweringService;
use crate::types::{FALLBACK_ANSWER, QueryReply, QueryRequest};

/// How a dispatched query settled.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The service replied with an answer.
    Answered(QueryReply),

    /// The service replied without a usable answer field.
    Unanswered(QueryReply),

    /// The request failed in transport or the reply could not be decoded.
    Failed(Error),
}

impl Outcome {
    /// Classify the result of a service call.
    pub fn from_result(result: crate::Result<QueryReply>) -> Self {
        match result {
            Ok(reply) if reply.answer.is_some() => Outcome::Answered(reply),
            Ok(reply) => Outcome::Unanswered(reply),
            Err(err) => Outcome::Failed(err),
        }
    }

    /// The content of the assistant turn this outcome produces.
    pub fn content(&self) -> String {
        match self {
            Outcome::Answered(reply) => reply.answer_or_fallback().to_string(),
            Outcome::Unanswered(_) => FALLBACK_ANSWER.to_string(),
            Outcome::Failed(err) => failure_content(err),
        }
    }

    /// The reply, when the service produced one.
    pub fn reply(&self) -> Option<&QueryReply> {
        match self {
            Outcome::Answered(reply) | Outcome::Unanswered(reply) => Some(reply),
            Outcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Render a failure as assistant-turn text.
pub fn failure_content(err: &dyn std::fmt::Display) -> String {
    format!("Error: {err}")
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("answering service panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("answering service panicked: {message}")
    } else {
        "answering service panicked".to_string()
    }
}

/// Routes submitted queries to an [`AnsweringService`].
#[derive(Clone)]
pub struct QueryDispatcher {
    service: Arc<dyn AnsweringService>,
    context: Option<String>,
    logger: Option<Arc<dyn DispatchLogger>>,
}

impl QueryDispatcher {
    /// Creates a dispatcher that sends queries to `service`.
    pub fn new(service: Arc<dyn AnsweringService>) -> Self {
        Self {
            service,
            context: None,
            logger: None,
        }
    }

    /// Installs a logger that observes every dispatch.
    pub fn with_logger(mut self, logger: Arc<dyn DispatchLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets or clears the document context attached to later dispatches.
    pub fn set_context(&mut self, context: Option<String>) {
        self.context = context;
    }

    /// Returns the document context attached to dispatches, if any.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Builds the request for one submitted query.
    pub fn request_for(&self, query: impl Into<String>) -> QueryRequest {
        QueryRequest::new(query).with_context(self.context.clone())
    }

    /// Dispatches one query.
    ///
    /// The returned future owns everything it needs, so it can be spawned as an
    /// independent task.  It never fails; failures are folded into the outcome.
    pub fn dispatch(&self, query: impl Into<String>) -> BoxFuture<'static, Outcome> {
        let request = self.request_for(query);
        let service = Arc::clone(&self.service);
        let logger = self.logger.clone();
        Box::pin(async move {
            DISPATCH_REQUESTS.click();
            if let Some(logger) = &logger {
                logger.log_request(&request);
            }
            let start = Instant::now();
            let result = AssertUnwindSafe(service.answer(&request))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(Error::internal(panic_message(panic))));
            DISPATCH_DURATION.add(start.elapsed().as_secs_f64());
            match (&result, &logger) {
                (Ok(reply), Some(logger)) => logger.log_reply(&request, reply),
                (Err(err), Some(logger)) => logger.log_failure(&request, err),
                (_, None) => {}
            }
            let outcome = Outcome::from_result(result);
            match &outcome {
                Outcome::Answered(_) => DISPATCH_ANSWERED.click(),
                Outcome::Unanswered(_) => DISPATCH_UNANSWERED.click(),
                Outcome::Failed(_) => DISPATCH_FAILURES.click(),
            }
            outcome
        })
    }
}
