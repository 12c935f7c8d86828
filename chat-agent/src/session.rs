//! One chat session: transcript, per-turn context, and view events.

use std::sync::{Arc, Mutex};

use billing_context::{ContextBuilder, ContextSnapshot, ContractSource, today};
use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    completion_client::{Completion, CompletionClient},
    error_handler::ChatError,
};

/// Buffered events per subscriber before lagging ones start dropping.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    /// Notices and errors produced locally.
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    /// Model that produced an assistant message.
    pub model: Option<String>,
    pub at: DateTime<Local>,
}

impl ChatMessage {
    fn new(role: Role, text: impl Into<String>, model: Option<String>) -> Self {
        Self {
            role,
            text: text.into(),
            model,
            at: Local::now(),
        }
    }
}

/// State changes the view layer renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    UserMessage(String),
    /// A request is in flight.
    Thinking,
    AssistantMessage { text: String, model: String },
    ModelPromoted { from: String, to: String },
    SystemNotice { text: String, is_error: bool },
}

/// Chat thread over a [`CompletionClient`].
///
/// The transcript lives in memory only. At most one question is answered at
/// a time; a concurrent [`ChatSession::send`] fails with [`ChatError::Busy`].
pub struct ChatSession {
    client: Arc<CompletionClient>,
    builder: ContextBuilder,
    source: Arc<dyn ContractSource>,
    transcript: Mutex<Vec<ChatMessage>>,
    events: broadcast::Sender<ChatEvent>,
    in_flight: tokio::sync::Mutex<()>,
}

impl ChatSession {
    pub fn new(
        client: Arc<CompletionClient>,
        builder: ContextBuilder,
        source: Arc<dyn ContractSource>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            builder,
            source,
            transcript: Mutex::new(Vec::new()),
            events,
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn client(&self) -> &CompletionClient {
        &self.client
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript
            .lock()
            .map(|t| t.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Fresh snapshot of the host data as of today.
    pub fn context(&self) -> ContextSnapshot {
        self.builder.snapshot(self.source.as_ref(), today())
    }

    /// Posts a local notice to the thread (settings results, hints).
    pub fn notice(&self, text: impl Into<String>, is_error: bool) {
        let text = text.into();
        self.record(ChatMessage::new(Role::System, text.clone(), None));
        self.emit(ChatEvent::SystemNotice { text, is_error });
    }

    /// Sends one question.
    ///
    /// Blank input is ignored (`Ok(None)`). Failures are also posted to the
    /// thread as error notices, so the session stays usable after any of them.
    pub async fn send(&self, text: &str) -> Result<Option<Completion>, ChatError> {
        let question = text.trim();
        if question.is_empty() {
            return Ok(None);
        }
        let _turn = self.in_flight.try_lock().map_err(|_| {
            debug!("send rejected: previous request still in flight");
            ChatError::Busy
        })?;

        // Nothing is recorded for a question that cannot be sent.
        if !self.client.has_credential()? {
            let err = ChatError::ConfigurationRequired;
            self.notice(err.user_message(), true);
            return Err(err);
        }

        self.record(ChatMessage::new(Role::User, question, None));
        self.emit(ChatEvent::UserMessage(question.to_string()));
        self.emit(ChatEvent::Thinking);

        let context = self.context().render();
        let previous = self.client.current_model();

        match self.client.complete(question, &context).await {
            Ok(done) => {
                if done.promoted {
                    self.emit(ChatEvent::ModelPromoted {
                        from: previous,
                        to: done.model.clone(),
                    });
                }
                self.record(ChatMessage::new(
                    Role::Assistant,
                    done.answer.clone(),
                    Some(done.model.clone()),
                ));
                self.emit(ChatEvent::AssistantMessage {
                    text: done.answer.clone(),
                    model: done.model.clone(),
                });
                Ok(Some(done))
            }
            Err(err) => {
                warn!(error = %err, "turn failed");
                self.notice(err.user_message(), true);
                Err(err)
            }
        }
    }

    fn record(&self, msg: ChatMessage) {
        match self.transcript.lock() {
            Ok(mut t) => t.push(msg),
            Err(poisoned) => poisoned.into_inner().push(msg),
        }
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine (headless use).
        let _ = self.events.send(event);
    }
}
