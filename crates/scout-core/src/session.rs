//! Per-session state.
//!
//! `SessionState` is owned by one coordinator. The retrieve loop never
//! mutates it directly: each cycle yields a [`TurnPatch`] that the owner
//! applies, so a run can be replayed patch by patch.

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;
use crate::messages::Message;
use crate::operations::{OperationCall, OperationResult};

/// Retrieve-loop position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoopState {
    #[default]
    AwaitModel,
    ExecuteOperations { calls: Vec<OperationCall> },
    Done,
}

impl LoopState {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Output of one controller cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnPatch {
    pub turn: u32,
    pub appended: Vec<Message>,
    pub next: LoopState,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("objective already set")]
    ObjectiveAlreadySet,
    #[error("objective not set")]
    ObjectiveMissing,
    #[error("answer already set")]
    AnswerAlreadySet,
    #[error("retrieve loop already finished")]
    LoopFinished,
    #[error("retrieve loop still running")]
    LoopRunning,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionState {
    id: SessionId,
    conversation: Vec<Message>,
    objective: Option<String>,
    retrieval: Vec<Message>,
    loop_state: LoopState,
    turn: u32,
    answer: Option<String>,
}

impl SessionState {
    pub fn new(id: SessionId, conversation: Vec<Message>) -> Self {
        Self {
            id,
            conversation,
            objective: None,
            retrieval: Vec::new(),
            loop_state: LoopState::AwaitModel,
            turn: 0,
            answer: None,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// User-visible history (user and assistant text only).
    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    pub fn push_conversation(&mut self, message: Message) {
        self.conversation.push(message);
    }

    pub fn objective(&self) -> Option<&str> {
        self.objective.as_deref()
    }

    /// Set the objective and seed retrieval history with it. Only once.
    pub fn set_objective(&mut self, objective: impl Into<String>) -> Result<(), SessionError> {
        if self.objective.is_some() {
            return Err(SessionError::ObjectiveAlreadySet);
        }
        let objective = objective.into();
        self.retrieval
            .push(Message::user(format!("Research Brief: {objective}")));
        self.objective = Some(objective);
        Ok(())
    }

    /// Retrieve-loop history, objective first.
    pub fn retrieval(&self) -> &[Message] {
        &self.retrieval
    }

    pub fn results(&self) -> impl Iterator<Item = &OperationResult> {
        self.retrieval.iter().filter_map(Message::as_result)
    }

    pub fn loop_state(&self) -> &LoopState {
        &self.loop_state
    }

    /// Number of model calls made by the retrieve loop so far.
    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn apply(&mut self, patch: TurnPatch) -> Result<(), SessionError> {
        if self.objective.is_none() {
            return Err(SessionError::ObjectiveMissing);
        }
        if self.loop_state.is_done() {
            return Err(SessionError::LoopFinished);
        }
        self.retrieval.extend(patch.appended);
        self.turn = patch.turn;
        self.loop_state = patch.next;
        Ok(())
    }

    /// End the loop from outside the controller (budget exhaustion).
    pub fn finish_loop(&mut self) {
        self.loop_state = LoopState::Done;
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) -> Result<(), SessionError> {
        if !self.loop_state.is_done() {
            return Err(SessionError::LoopRunning);
        }
        if self.answer.is_some() {
            return Err(SessionError::AnswerAlreadySet);
        }
        self.answer = Some(answer.into());
        Ok(())
    }
}
