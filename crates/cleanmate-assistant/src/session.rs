//! One chat exchange: persist, ask the advisor, vet its action.

use std::time::Duration;

use crate::action::{ActionInterpreter, ReadyAction};
use crate::advisor::{Advisor, AdvisorReply};
use crate::context::AssistantContext;
use crate::store::{ChatEntry, HistoryStore, LoadSnapshot, StoreError};

/// How long an advisor may take before the reply is replaced.
pub const ADVISOR_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of sending one message.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// The stored assistant entry.
    pub reply: ChatEntry,
    /// The suggested action, if it passed the interpreter.
    pub ready: Option<ReadyAction>,
    /// Why a suggested action was refused.
    pub rejected: Option<String>,
}

/// Ties an advisor to the history store and the action interpreter.
pub struct ChatSession<A> {
    advisor: A,
    history: HistoryStore,
    interpreter: ActionInterpreter,
    timeout: Duration,
}

impl<A: Advisor> ChatSession<A> {
    /// Create a session with the default timeout.
    pub fn new(advisor: A, history: HistoryStore, interpreter: ActionInterpreter) -> Self {
        Self {
            advisor,
            history,
            interpreter,
            timeout: ADVISOR_TIMEOUT,
        }
    }

    /// Override the advisor timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The history store messages are written to.
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Record the message, get a reply and record it too.
    pub async fn send(&self, message: &str, ctx: &AssistantContext) -> Result<ChatTurn, StoreError> {
        let load = LoadSnapshot {
            cpu: ctx.metrics.cpu_load,
            ram: ctx.metrics.ram_used,
        };
        self.history.append(ChatEntry::user(message, load)).await?;

        let reply = match tokio::time::timeout(self.timeout, self.advisor.reply(message, ctx)).await {
            Ok(reply) => reply,
            Err(_) => {
                tracing::warn!(advisor = self.advisor.name(), "advisor timed out");
                AdvisorReply::unavailable()
            }
        };

        let (ready, rejected) = match &reply.action {
            Some(action) => match self.interpreter.interpret(action) {
                Ok(ready) => (Some(ready), None),
                Err(reason) => (None, Some(reason.to_string())),
            },
            None => (None, None),
        };

        let entry = ChatEntry::assistant(reply.text, reply.action);
        self.history.append(entry.clone()).await?;
        tracing::debug!(advisor = self.advisor.name(), has_action = ready.is_some(), "chat turn stored");

        Ok(ChatTurn {
            reply: entry,
            ready,
            rejected,
        })
    }
}
