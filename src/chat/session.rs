//! Core chat session management.
//!
//! [`ChatSession`] ties the conversation store to the query dispatcher.  It is
//! meant to live on a single event-processing task: user input mutates the
//! store synchronously, every accepted submission is spawned as an independent
//! dispatch task, and settled dispatches are applied back to the store one at a
//! time, in the order they complete.

use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};

use crate::dispatcher::{Outcome, QueryDispatcher, failure_content};
use crate::service::AnsweringService;
use crate::store::{ConversationStore, StoreListener, Submission};
use crate::types::{QueryReply, Turn};

/// A dispatch that has been applied to the transcript.
#[derive(Debug, Clone)]
pub struct Settled {
    /// Index of the user turn that started the dispatch.
    ///
    /// `None` only when the dispatch task was torn down by the runtime.
    pub question_index: Option<usize>,

    /// Index of the assistant turn the dispatch produced.
    pub answer_index: usize,

    /// The reply, when the service produced one.
    pub reply: Option<QueryReply>,

    /// True when the assistant turn is an error diagnostic.
    pub failed: bool,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// The number of turns in the transcript.
    pub turn_count: usize,
    /// Total submissions accepted.
    pub submitted: u64,
    /// Dispatches that settled with an answer or the fallback.
    pub answered: u64,
    /// Dispatches that settled with an error diagnostic.
    pub failed: u64,
    /// Dispatches still outstanding.
    pub in_flight: usize,
}

/// A chat session that owns conversation state and outstanding dispatches.
pub struct ChatSession {
    store: ConversationStore,
    dispatcher: QueryDispatcher,
    in_flight: JoinSet<(usize, Outcome)>,
    reply_context: Option<String>,
    submitted: u64,
    answered: u64,
    failed: u64,
}

impl ChatSession {
    /// Creates a new chat session backed by `service`.
    pub fn new(service: Arc<dyn AnsweringService>) -> Self {
        Self::with_dispatcher(QueryDispatcher::new(service))
    }

    /// Creates a new chat session with a preconfigured dispatcher.
    pub fn with_dispatcher(dispatcher: QueryDispatcher) -> Self {
        Self {
            store: ConversationStore::new(),
            dispatcher,
            in_flight: JoinSet::new(),
            reply_context: None,
            submitted: 0,
            answered: 0,
            failed: 0,
        }
    }

    /// Registers a listener on the underlying store.
    pub fn subscribe(&mut self, listener: Box<dyn StoreListener>) {
        self.store.subscribe(listener);
    }

    /// Replaces the input buffer verbatim.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.store.set_input(text);
    }

    /// Submits the input buffer.
    ///
    /// When the store accepts the submission, a dispatch task is spawned at
    /// once; there is no queue and no limit on outstanding dispatches.  Must be
    /// called from within a tokio runtime.
    pub fn submit(&mut self) -> Option<Submission> {
        let submission = self.store.submit()?;
        self.submitted += 1;
        let question_index = submission.turn_index;
        let dispatch = self.dispatcher.dispatch(submission.query.clone());
        self.in_flight.spawn(async move { (question_index, dispatch.await) });
        Some(submission)
    }

    /// Waits for the next dispatch to settle and appends its assistant turn.
    ///
    /// Returns `None` when nothing is outstanding.  Dispatches are applied in
    /// completion order, which need not match submission order.
    pub async fn next_settled(&mut self) -> Option<Settled> {
        let joined = self.in_flight.join_next().await?;
        Some(self.apply(joined))
    }

    /// Waits for every outstanding dispatch to settle.
    pub async fn settle_all(&mut self) -> Vec<Settled> {
        let mut settled = Vec::new();
        while let Some(s) = self.next_settled().await {
            settled.push(s);
        }
        settled
    }

    fn apply(&mut self, joined: Result<(usize, Outcome), JoinError>) -> Settled {
        match joined {
            Ok((question_index, outcome)) => {
                let answer_index = self.store.append_assistant_turn(outcome.content());
                if outcome.is_failed() {
                    self.failed += 1;
                } else {
                    self.answered += 1;
                }
                if let Some(context) = outcome.reply().and_then(|r| r.pdf_context.clone()) {
                    self.reply_context = Some(context);
                }
                Settled {
                    question_index: Some(question_index),
                    answer_index,
                    reply: outcome.reply().cloned(),
                    failed: outcome.is_failed(),
                }
            }
            // The dispatcher catches service panics, so this only fires when the
            // runtime aborts the task.  It still owes its question a terminal turn.
            Err(err) => {
                let answer_index = self.store.append_assistant_turn(failure_content(&err));
                self.failed += 1;
                Settled {
                    question_index: None,
                    answer_index,
                    reply: None,
                    failed: true,
                }
            }
        }
    }

    /// Sets or clears the document context attached to later dispatches.
    pub fn set_context(&mut self, context: Option<String>) {
        self.dispatcher.set_context(context);
    }

    /// Returns the document context attached to dispatches, if any.
    pub fn context(&self) -> Option<&str> {
        self.dispatcher.context()
    }

    /// The document text extracted by the most recently settled reply that
    /// carried one.
    pub fn reply_context(&self) -> Option<&str> {
        self.reply_context.as_deref()
    }

    /// Sends the most recent reply's extracted document text with later
    /// questions.  Returns the adopted context, or `None` (leaving the current
    /// context untouched) when no reply has carried any.
    pub fn adopt_reply_context(&mut self) -> Option<&str> {
        let context = self.reply_context.clone()?;
        self.dispatcher.set_context(Some(context));
        self.dispatcher.context()
    }

    /// The transcript, in append order.
    pub fn transcript(&self) -> &[Turn] {
        self.store.transcript()
    }

    /// The not-yet-submitted input.
    pub fn input(&self) -> &str {
        self.store.input()
    }

    /// Returns the number of dispatches still outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            turn_count: self.store.len(),
            submitted: self.submitted,
            answered: self.answered,
            failed: self.failed,
            in_flight: self.in_flight(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use tokio::sync::oneshot;

    use super::*;
    use crate::error::{Error, Result};
    use crate::types::{QueryRequest, Role};

    /// Holds each query until the test releases it.
    #[derive(Default)]
    struct Gated {
        gates: Mutex<HashMap<String, oneshot::Receiver<Result<QueryReply>>>>,
    }

    impl Gated {
        fn gate(&self, query: &str) -> oneshot::Sender<Result<QueryReply>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(query.to_string(), rx);
            tx
        }
    }

    #[async_trait::async_trait]
    impl AnsweringService for Gated {
        async fn answer(&self, request: &QueryRequest) -> Result<QueryReply> {
            let gate = self.gates.lock().unwrap().remove(&request.query);
            match gate {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(Error::connection("gate dropped", None))),
                None => match &request.context {
                    Some(context) => Ok(QueryReply::answered(format!(
                        "echo {} [{context}]",
                        request.query
                    ))),
                    None => Ok(QueryReply::answered(format!("echo {}", request.query))),
                },
            }
        }
    }

    struct Panicking;

    #[async_trait::async_trait]
    impl AnsweringService for Panicking {
        async fn answer(&self, _request: &QueryRequest) -> Result<QueryReply> {
            panic!("service exploded");
        }
    }

    fn contents(session: &ChatSession) -> Vec<(Role, String)> {
        session
            .transcript()
            .iter()
            .map(|turn| (turn.role(), turn.content().to_string()))
            .collect()
    }

    #[tokio::test]
    async fn submission_round_trip() {
        let mut session = ChatSession::new(Arc::new(Gated::default()));
        session.set_input("  hello ");
        let submission = session.submit().unwrap();
        assert_eq!(submission.query, "hello");
        assert_eq!(session.input(), "");
        assert_eq!(session.in_flight(), 1);
        assert_eq!(session.transcript().len(), 1);

        let settled = session.next_settled().await.unwrap();
        assert_eq!(settled.question_index, Some(0));
        assert_eq!(settled.answer_index, 1);
        assert!(!settled.failed);
        assert_eq!(
            contents(&session),
            vec![
                (Role::User, "hello".to_string()),
                (Role::Assistant, "echo hello".to_string()),
            ]
        );
        assert!(session.next_settled().await.is_none());
    }

    #[tokio::test]
    async fn empty_submission_dispatches_nothing() {
        let mut session = ChatSession::new(Arc::new(Gated::default()));
        session.set_input("   ");
        assert!(session.submit().is_none());
        assert_eq!(session.in_flight(), 0);
        assert_eq!(session.input(), "   ");
        assert!(session.transcript().is_empty());
        assert_eq!(session.stats().submitted, 0);
    }

    #[tokio::test]
    async fn assistant_turns_follow_completion_order() {
        let service = Arc::new(Gated::default());
        let q1 = service.gate("Q1");
        let q2 = service.gate("Q2");
        let mut session = ChatSession::new(service);

        session.set_input("Q1");
        session.submit().unwrap();
        session.set_input("Q2");
        session.submit().unwrap();
        assert_eq!(session.in_flight(), 2);

        q2.send(Ok(QueryReply::answered("reply(Q2)"))).unwrap();
        let first = session.next_settled().await.unwrap();
        assert_eq!(first.question_index, Some(1));

        q1.send(Ok(QueryReply::answered("reply(Q1)"))).unwrap();
        let second = session.next_settled().await.unwrap();
        assert_eq!(second.question_index, Some(0));

        assert_eq!(
            contents(&session),
            vec![
                (Role::User, "Q1".to_string()),
                (Role::User, "Q2".to_string()),
                (Role::Assistant, "reply(Q2)".to_string()),
                (Role::Assistant, "reply(Q1)".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn every_path_appends_exactly_one_assistant_turn() {
        let service = Arc::new(Gated::default());
        let ok = service.gate("ok");
        let empty = service.gate("empty");
        let broken = service.gate("broken");
        let mut session = ChatSession::new(service);

        for query in ["ok", "empty", "broken"] {
            session.set_input(query);
            session.submit().unwrap();
        }
        broken
            .send(Err(Error::connection("connection refused", None)))
            .unwrap();
        empty.send(Ok(QueryReply::default())).unwrap();
        ok.send(Ok(QueryReply::answered("fine"))).unwrap();

        let settled = session.settle_all().await;
        assert_eq!(settled.len(), 3);
        assert_eq!(session.in_flight(), 0);

        let assistant: Vec<_> = session
            .transcript()
            .iter()
            .filter(|turn| turn.is_assistant())
            .map(|turn| turn.content().to_string())
            .collect();
        assert_eq!(assistant.len(), 3);
        assert!(assistant.contains(&"fine".to_string()));
        assert!(assistant.contains(&"No response received.".to_string()));
        assert!(
            assistant
                .iter()
                .any(|c| c.starts_with("Error:") && c.contains("connection refused"))
        );

        let stats = session.stats();
        assert_eq!(stats.turn_count, 6);
        assert_eq!(stats.submitted, 3);
        assert_eq!(stats.answered, 2);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn later_submissions_do_not_cancel_earlier_ones() {
        let service = Arc::new(Gated::default());
        let slow = service.gate("slow");
        let mut session = ChatSession::new(service);

        session.set_input("slow");
        session.submit().unwrap();
        for i in 0..3 {
            session.set_input(format!("fast {i}"));
            session.submit().unwrap();
        }
        for _ in 0..3 {
            let settled = session.next_settled().await.unwrap();
            assert!(settled.question_index.is_some_and(|i| i > 0));
        }
        assert_eq!(session.in_flight(), 1);

        slow.send(Ok(QueryReply::answered("finally"))).unwrap();
        let settled = session.next_settled().await.unwrap();
        assert_eq!(settled.question_index, Some(0));
        assert_eq!(
            session.transcript().last().map(Turn::content),
            Some("finally")
        );
    }

    #[tokio::test]
    async fn panicking_dispatch_still_terminates_the_turn() {
        let mut session = ChatSession::new(Arc::new(Panicking));
        session.set_input("boom");
        session.submit().unwrap();
        let settled = session.next_settled().await.unwrap();
        assert!(settled.failed);
        assert_eq!(settled.question_index, Some(0));
        let last = session.transcript().last().unwrap();
        assert!(last.is_assistant());
        assert!(last.content().starts_with("Error:"));
    }

    #[tokio::test]
    async fn context_flows_into_requests() {
        let mut session = ChatSession::new(Arc::new(Gated::default()));
        assert!(session.context().is_none());
        session.set_context(Some("field notes".to_string()));
        assert_eq!(session.context(), Some("field notes"));

        session.set_input("what lives here?");
        session.submit().unwrap();
        session.next_settled().await.unwrap();
        assert_eq!(
            session.transcript().last().map(Turn::content),
            Some("echo what lives here? [field notes]")
        );

        session.set_context(None);
        session.set_input("and now?");
        session.submit().unwrap();
        session.next_settled().await.unwrap();
        assert_eq!(
            session.transcript().last().map(Turn::content),
            Some("echo and now?")
        );
    }

    #[tokio::test]
    async fn reply_context_can_be_adopted() {
        let service = Arc::new(Gated::default());
        let extract = service.gate("summarise the survey");
        let plain = service.gate("thanks");
        let mut session = ChatSession::new(service);
        assert!(session.adopt_reply_context().is_none());
        assert!(session.context().is_none());

        session.set_input("summarise the survey");
        session.submit().unwrap();
        session.set_input("thanks");
        session.submit().unwrap();

        let reply = QueryReply {
            answer: Some("Herons and newts.".to_string()),
            pdf_context: Some("Survey 2023: heron, newt.".to_string()),
            ..QueryReply::default()
        };
        extract.send(Ok(reply)).unwrap();
        let settled = session.next_settled().await.unwrap();
        assert_eq!(
            settled.reply.and_then(|r| r.pdf_context).as_deref(),
            Some("Survey 2023: heron, newt.")
        );

        // A later reply without extracted text does not erase the earlier one.
        plain.send(Ok(QueryReply::answered("You're welcome."))).unwrap();
        session.next_settled().await.unwrap();
        assert_eq!(session.reply_context(), Some("Survey 2023: heron, newt."));
        assert!(session.context().is_none());

        assert_eq!(
            session.adopt_reply_context(),
            Some("Survey 2023: heron, newt.")
        );
        session.set_input("which is rarest?");
        session.submit().unwrap();
        session.next_settled().await.unwrap();
        assert_eq!(
            session.transcript().last().map(Turn::content),
            Some("echo which is rarest? [Survey 2023: heron, newt.]")
        );
    }

    #[tokio::test]
    async fn aborted_dispatch_still_terminates_the_turn() {
        let service = Arc::new(Gated::default());
        let _held = service.gate("stuck");
        let mut session = ChatSession::new(service);
        session.set_input("stuck");
        session.submit().unwrap();

        session.in_flight.abort_all();
        let settled = session.next_settled().await.unwrap();
        assert!(settled.failed);
        assert_eq!(settled.question_index, None);
        assert_eq!(settled.answer_index, 1);
        let last = session.transcript().last().unwrap();
        assert!(last.is_assistant());
        assert!(last.content().starts_with("Error:"));
        assert_eq!(session.stats().failed, 1);
        assert_eq!(session.in_flight(), 0);
    }
}
