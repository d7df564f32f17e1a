// Public modules
pub mod chat;
pub mod dispatch_logger;
pub mod dispatcher;
pub mod error;
pub mod observability;
pub mod service;
pub mod store;
pub mod types;

// Re-exports
pub use chat::ChatSession;
pub use dispatch_logger::{DispatchLogger, StderrLogger};
pub use dispatcher::{Outcome, QueryDispatcher};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use service::{AnsweringService, HttpAnsweringService};
pub use store::{ConversationStore, StoreListener, Submission};
pub use types::*;
