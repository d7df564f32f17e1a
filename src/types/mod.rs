// Public modules
pub mod query_reply;
pub mod query_request;
pub mod turn;

// Re-exports
pub use query_reply::{FALLBACK_ANSWER, QueryReply};
pub use query_request::QueryRequest;
pub use turn::{Role, Turn};
