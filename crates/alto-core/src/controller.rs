//! Conversation controller
//!
//! Owns the transcript and the busy flag, and mediates at most one outbound
//! completion call at a time. Front ends only ever call [`ConversationController::submit`]
//! and read state back through [`ConversationController::snapshot`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::message::{Message, Snapshot};
use crate::provider::{CompletionProvider, GENERIC_ERROR_TEXT};

#[derive(Default)]
struct ControllerState {
    transcript: Vec<Message>,
    busy: bool,
}

struct Shared {
    state: Mutex<ControllerState>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

/// Holds the busy flag for one in-flight call.
///
/// Whatever way the call task exits, exactly one bot message is appended and
/// the flag is cleared. A task that dies before recording an outcome gets the
/// generic error text.
struct InFlight {
    shared: Arc<Shared>,
    done: bool,
}

impl InFlight {
    fn finish(&mut self, reply: &str) -> Message {
        let message = Message::bot(reply);
        {
            let mut state = self.shared.lock();
            state.transcript.push(message.clone());
            state.busy = false;
        }
        self.done = true;
        self.shared.bump();
        message
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.done {
            warn!("completion task ended without an outcome");
            self.finish(GENERIC_ERROR_TEXT);
        }
    }
}

/// Handle to an accepted submission
pub struct PendingReply {
    handle: JoinHandle<Message>,
}

impl PendingReply {
    /// Wait until the bot reply for this submission is in the transcript.
    pub async fn resolved(self) -> Message {
        match self.handle.await {
            Ok(message) => message,
            // The in-flight guard has already recorded the generic error
            Err(_) => Message::bot(GENERIC_ERROR_TEXT),
        }
    }
}

#[derive(Clone)]
pub struct ConversationController {
    shared: Arc<Shared>,
    provider: Arc<dyn CompletionProvider>,
}

impl ConversationController {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ControllerState::default()),
                revision,
            }),
            provider,
        }
    }

    /// Accept user input and start the outbound call.
    ///
    /// Returns `None` without touching state when the trimmed input is empty
    /// or a call is already in flight. The transcript keeps `raw_text` as
    /// typed; the provider receives it trimmed. Must be called from within a
    /// Tokio runtime.
    pub fn submit(&self, raw_text: &str) -> Option<PendingReply> {
        let message = raw_text.trim();
        if message.is_empty() {
            debug!("ignoring blank submission");
            return None;
        }

        {
            let mut state = self.shared.lock();
            if state.busy {
                debug!("ignoring submission while a reply is pending");
                return None;
            }
            state.transcript.push(Message::user(raw_text));
            state.busy = true;
        }
        self.shared.bump();

        let mut in_flight = InFlight {
            shared: Arc::clone(&self.shared),
            done: false,
        };
        let provider = Arc::clone(&self.provider);
        let message = message.to_string();

        debug!(chars = message.chars().count(), "submitting message");
        let handle = tokio::spawn(async move {
            let reply = match provider.complete(&message).await {
                Ok(result) => {
                    info!(chars = result.chars().count(), "received completion");
                    result
                }
                Err(err) => {
                    warn!(kind = err.kind(), error = %err, "completion failed");
                    err.reply_text().to_string()
                }
            };
            in_flight.finish(&reply)
        });

        Some(PendingReply { handle })
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.shared.lock();
        Snapshot {
            transcript: state.transcript.clone(),
            busy: state.busy,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.shared.lock().busy
    }

    pub fn len(&self) -> usize {
        self.shared.lock().transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Revision counter that changes whenever transcript or busy changes
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpCompletionClient;
    use crate::message::Sender;
    use crate::provider::{ProviderError, UNPROCESSABLE_TEXT};
    use crate::test_support::{serve, unused_endpoint};
    use async_trait::async_trait;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::json;
    use tokio::sync::Notify;

    /// Replies with a fixed outcome and records what it was sent
    struct ScriptedProvider {
        outcome: Result<String, ProviderError>,
        received: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(outcome: Result<String, ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                received: Mutex::new(Vec::new()),
            })
        }

        fn received(&self) -> Vec<String> {
            self.received.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(&self, message: &str) -> Result<String, ProviderError> {
            self.received.lock().unwrap().push(message.to_string());
            self.outcome.clone()
        }
    }

    /// Holds each call open until released
    struct GatedProvider {
        gate: Notify,
    }

    #[async_trait]
    impl CompletionProvider for GatedProvider {
        async fn complete(&self, message: &str) -> Result<String, ProviderError> {
            self.gate.notified().await;
            Ok(format!("re: {}", message))
        }
    }

    struct PanickingProvider;

    #[async_trait]
    impl CompletionProvider for PanickingProvider {
        async fn complete(&self, _message: &str) -> Result<String, ProviderError> {
            panic!("provider blew up");
        }
    }

    fn texts(snapshot: &Snapshot) -> Vec<(&str, Sender)> {
        snapshot
            .transcript
            .iter()
            .map(|m| (m.text(), m.sender()))
            .collect()
    }

    #[tokio::test]
    async fn test_successful_reply_is_appended() {
        let controller = ConversationController::new(ScriptedProvider::new(Ok("Hi there!".into())));

        controller.submit("Hello").unwrap().resolved().await;

        let snapshot = controller.snapshot();
        assert_eq!(
            texts(&snapshot),
            vec![("Hello", Sender::User), ("Hi there!", Sender::Bot)]
        );
        assert!(!snapshot.busy);
    }

    #[tokio::test]
    async fn test_blank_input_is_a_no_op() {
        let provider = ScriptedProvider::new(Ok("unused".into()));
        let controller = ConversationController::new(provider.clone());

        for input in ["", "   ", "\n\t  \n"] {
            assert!(controller.submit(input).is_none());
        }

        assert_eq!(controller.snapshot(), Snapshot::default());
        assert!(provider.received().is_empty());
    }

    #[tokio::test]
    async fn test_provider_receives_trimmed_text_only() {
        let provider = ScriptedProvider::new(Ok("ok".into()));
        let controller = ConversationController::new(provider.clone());

        controller.submit("  first  ").unwrap().resolved().await;
        controller.submit("second\n").unwrap().resolved().await;

        assert_eq!(provider.received(), vec!["first", "second"]);
        // Transcript keeps the input as typed
        assert_eq!(controller.snapshot().transcript[0].text(), "  first  ");
    }

    #[tokio::test]
    async fn test_busy_only_while_call_is_in_flight() {
        let provider = Arc::new(GatedProvider { gate: Notify::new() });
        let controller = ConversationController::new(provider.clone());
        assert!(!controller.is_busy());

        let pending = controller.submit("Hello").unwrap();
        let during = controller.snapshot();
        assert!(during.busy);
        assert_eq!(texts(&during), vec![("Hello", Sender::User)]);

        provider.gate.notify_one();
        let reply = pending.resolved().await;

        assert_eq!(reply.text(), "re: Hello");
        assert!(!controller.is_busy());
        assert_eq!(controller.len(), 2);
    }

    #[tokio::test]
    async fn test_submit_while_busy_is_ignored() {
        let provider = Arc::new(GatedProvider { gate: Notify::new() });
        let controller = ConversationController::new(provider.clone());

        let pending = controller.submit("first").unwrap();
        assert!(controller.submit("second").is_none());
        assert_eq!(controller.len(), 1);

        provider.gate.notify_one();
        pending.resolved().await;

        assert_eq!(
            texts(&controller.snapshot()),
            vec![("first", Sender::User), ("re: first", Sender::Bot)]
        );
    }

    #[tokio::test]
    async fn test_every_failure_kind_yields_one_bot_message() {
        let cases = [
            (ProviderError::Network("refused".into()), GENERIC_ERROR_TEXT),
            (ProviderError::Status(502), GENERIC_ERROR_TEXT),
            (ProviderError::Undecodable("eof".into()), GENERIC_ERROR_TEXT),
            (ProviderError::MissingResult, UNPROCESSABLE_TEXT),
        ];

        for (err, expected) in cases {
            let controller = ConversationController::new(ScriptedProvider::new(Err(err)));
            controller.submit("Hello").unwrap().resolved().await;

            let snapshot = controller.snapshot();
            assert_eq!(
                texts(&snapshot),
                vec![("Hello", Sender::User), (expected, Sender::Bot)]
            );
            assert!(!snapshot.busy);
        }
    }

    #[tokio::test]
    async fn test_repeated_network_failures_give_identical_text() {
        let controller = ConversationController::new(ScriptedProvider::new(Err(
            ProviderError::Network("dns".into()),
        )));

        for i in 0..5 {
            controller.submit(&format!("try {}", i)).unwrap().resolved().await;
        }

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.len(), 10);
        for bot in snapshot.transcript.iter().skip(1).step_by(2) {
            assert_eq!(bot.sender(), Sender::Bot);
            assert_eq!(bot.text(), GENERIC_ERROR_TEXT);
        }
    }

    #[tokio::test]
    async fn test_panicking_provider_still_resolves() {
        let controller = ConversationController::new(Arc::new(PanickingProvider));

        let reply = controller.submit("Hello").unwrap().resolved().await;

        assert_eq!(reply.text(), GENERIC_ERROR_TEXT);
        let snapshot = controller.snapshot();
        assert_eq!(
            texts(&snapshot),
            vec![("Hello", Sender::User), (GENERIC_ERROR_TEXT, Sender::Bot)]
        );
        assert!(!snapshot.busy);

        // Controller is usable again afterwards
        assert!(controller.submit("again").is_some());
    }

    #[tokio::test]
    async fn test_sequential_submissions_alternate() {
        let controller = ConversationController::new(ScriptedProvider::new(Ok("ack".into())));

        controller.submit("one").unwrap().resolved().await;
        controller.submit("two").unwrap().resolved().await;

        assert_eq!(
            texts(&controller.snapshot()),
            vec![
                ("one", Sender::User),
                ("ack", Sender::Bot),
                ("two", Sender::User),
                ("ack", Sender::Bot),
            ]
        );
    }

    #[tokio::test]
    async fn test_subscribers_see_each_state_change() {
        let controller = ConversationController::new(ScriptedProvider::new(Ok("ack".into())));
        let mut changes = controller.subscribe();
        let start = *changes.borrow_and_update();

        assert!(controller.submit("   ").is_none());
        assert!(!changes.has_changed().unwrap());

        controller.submit("Hello").unwrap().resolved().await;
        assert!(changes.has_changed().unwrap());
        // One bump for acceptance, one for the reply
        assert_eq!(*changes.borrow_and_update(), start + 2);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let controller = ConversationController::new(ScriptedProvider::new(Ok("ack".into())));
        let ui_handle = controller.clone();

        controller.submit("Hello").unwrap().resolved().await;

        assert_eq!(ui_handle.len(), 2);
        assert!(!ui_handle.is_empty());
    }

    #[tokio::test]
    async fn test_over_http_success() {
        let router = Router::new().route(
            "/responses",
            post(|| async { Json(json!({ "result": "Hi there!" })) }),
        );
        let base = serve(router).await;
        let client = HttpCompletionClient::new(&format!("{}/responses", base));
        let controller = ConversationController::new(Arc::new(client));

        controller.submit("Hello").unwrap().resolved().await;

        assert_eq!(
            texts(&controller.snapshot()),
            vec![("Hello", Sender::User), ("Hi there!", Sender::Bot)]
        );
    }

    #[tokio::test]
    async fn test_over_http_server_error() {
        let router = Router::new().route(
            "/responses",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = serve(router).await;
        let client = HttpCompletionClient::new(&format!("{}/responses", base));
        let controller = ConversationController::new(Arc::new(client));

        controller.submit("Hello").unwrap().resolved().await;

        assert_eq!(
            texts(&controller.snapshot()),
            vec![("Hello", Sender::User), (GENERIC_ERROR_TEXT, Sender::Bot)]
        );
    }

    #[tokio::test]
    async fn test_over_http_empty_object() {
        let router = Router::new().route("/responses", post(|| async { Json(json!({})) }));
        let base = serve(router).await;
        let client = HttpCompletionClient::new(&format!("{}/responses", base));
        let controller = ConversationController::new(Arc::new(client));

        let reply = controller.submit("Hello").unwrap().resolved().await;

        assert_eq!(reply.text(), UNPROCESSABLE_TEXT);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_over_http_unreachable_endpoint() {
        let client = HttpCompletionClient::new(&unused_endpoint().await);
        let controller = ConversationController::new(Arc::new(client));

        let reply = controller.submit("Hello").unwrap().resolved().await;

        assert_eq!(reply.text(), GENERIC_ERROR_TEXT);
        assert_eq!(controller.len(), 2);
    }
}
