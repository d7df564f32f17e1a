//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::sync::Arc;
use std::time::Duration;

use arrrg_derive::CommandLine;
use url::Url;

use crate::chat::session::ChatSession;
use crate::dispatch_logger::StderrLogger;
use crate::dispatcher::QueryDispatcher;
use crate::error::{Error, Result};
use crate::service::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, HttpAnsweringService};

/// Command-line arguments for the ecobot-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Query endpoint of the answering service.
    #[arrrg(optional, "Query endpoint (default: http://127.0.0.1:8000/query/)", "URL")]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Document context sent with every question.
    #[arrrg(optional, "Document context to send with each question", "TEXT")]
    pub context: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log every dispatch to stderr.
    #[arrrg(flag, "Log each request and its outcome to stderr")]
    pub verbose: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// The URL questions are posted to.
    pub endpoint: Url,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Optional document context sent with every question.
    pub context: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to log each dispatch to stderr.
    pub verbose: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Endpoint: http://127.0.0.1:8000/query/
    /// - Timeout: 60 seconds
    /// - Context: none
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout: DEFAULT_TIMEOUT,
            context: None,
            use_color: true,
            verbose: false,
        }
    }

    /// Sets the query endpoint.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the document context.
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Enables per-dispatch logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Builds a session that talks to the configured endpoint.
    pub fn session(&self) -> Result<ChatSession> {
        let service =
            HttpAnsweringService::with_options(self.endpoint.clone(), Some(self.timeout))?;
        let mut dispatcher = QueryDispatcher::new(Arc::new(service));
        if self.verbose {
            dispatcher = dispatcher.with_logger(Arc::new(StderrLogger));
        }
        dispatcher.set_context(self.context.clone());
        Ok(ChatSession::with_dispatcher(dispatcher))
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let endpoint = match args.endpoint {
            Some(endpoint) => Url::parse(&endpoint)?,
            None => default_endpoint(),
        };
        let timeout = match args.timeout_secs {
            Some(0) => {
                return Err(Error::validation(
                    "timeout must be at least one second",
                    Some("timeout-secs".to_string()),
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };
        let context = args.context.filter(|c| !c.trim().is_empty());

        Ok(ChatConfig {
            endpoint,
            timeout,
            context,
            use_color: !args.no_color,
            verbose: args.verbose,
        })
    }
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("DEFAULT_ENDPOINT should be a valid URL")
}
