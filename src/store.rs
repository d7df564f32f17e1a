//! The conversation store.
//!
//! [`ConversationStore`] owns the transcript and the pending-input buffer.  It
//! is the single source of truth for what the presentation layer shows, and it
//! exposes exactly three mutation points: [`ConversationStore::set_input`],
//! [`ConversationStore::submit`], and [`ConversationStore::append_assistant_turn`].
//! Nothing removes or edits a turn once it is appended.

use crate::observability::STORE_REJECTED_SUBMISSIONS;
use crate::types::Turn;

/// Receives change notifications from a [`ConversationStore`].
///
/// The presentation layer implements this to re-render when state changes.
pub trait StoreListener: Send {
    /// Called after the input buffer was replaced.
    fn input_changed(&mut self, _input: &str) {}

    /// Called after a turn was appended at `index`.
    fn turn_appended(&mut self, index: usize, turn: &Turn);
}

/// A submission accepted by [`ConversationStore::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Index of the user turn this submission created.
    pub turn_index: usize,

    /// The trimmed text to dispatch.
    pub query: String,
}

/// Owner of the transcript and the input buffer.
#[derive(Default)]
pub struct ConversationStore {
    transcript: Vec<Turn>,
    input: String,
    listeners: Vec<Box<dyn StoreListener>>,
}

impl ConversationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for input and transcript changes.
    pub fn subscribe(&mut self, listener: Box<dyn StoreListener>) {
        self.listeners.push(listener);
    }

    /// Replaces the input buffer verbatim.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        for listener in self.listeners.iter_mut() {
            listener.input_changed(&self.input);
        }
    }

    /// Accepts the input buffer as a user turn.
    ///
    /// Returns `None`, leaving both the transcript and the input buffer
    /// untouched, when the buffer is empty after trimming.  Otherwise appends a
    /// user turn holding the trimmed text, clears the buffer, and returns the
    /// text for dispatch.
    pub fn submit(&mut self) -> Option<Submission> {
        let query = self.input.trim();
        if query.is_empty() {
            STORE_REJECTED_SUBMISSIONS.click();
            return None;
        }
        let query = query.to_string();
        let turn_index = self.push(Turn::user(query.clone()));
        self.set_input(String::new());
        Some(Submission { turn_index, query })
    }

    /// Appends an assistant turn and returns its index.
    ///
    /// Callable at any time, regardless of how many submissions are outstanding.
    pub fn append_assistant_turn(&mut self, content: impl Into<String>) -> usize {
        self.push(Turn::assistant(content))
    }

    /// The transcript, in append order.
    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    /// The not-yet-submitted input.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Returns the number of turns in the transcript.
    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    /// Returns true if no turn has been appended.
    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    fn push(&mut self, turn: Turn) -> usize {
        let index = self.transcript.len();
        self.transcript.push(turn);
        let turn = &self.transcript[index];
        for listener in self.listeners.iter_mut() {
            listener.turn_appended(index, turn);
        }
        index
    }
}
