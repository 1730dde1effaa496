use serde::{Deserialize, Serialize};

use crate::ids::{CallId, SessionId};

/// Why the retrieve loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopEndReason {
    /// The model proposed no further operations.
    Completed,
    /// Turn or wall-clock budget ran out.
    BudgetExhausted,
}

/// Session lifecycle events emitted while a session runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    #[serde(rename = "clarification_requested")]
    ClarificationRequested {
        session_id: SessionId,
        question: String,
    },

    #[serde(rename = "objective_set")]
    ObjectiveSet {
        session_id: SessionId,
        objective: String,
    },

    #[serde(rename = "turn_start")]
    TurnStart { session_id: SessionId, turn: u32 },

    #[serde(rename = "operation_start")]
    OperationStart {
        session_id: SessionId,
        call_id: CallId,
        operation: String,
    },

    #[serde(rename = "operation_end")]
    OperationEnd {
        session_id: SessionId,
        call_id: CallId,
        operation: String,
        ok: bool,
        duration_ms: u64,
        result_preview: String,
    },

    #[serde(rename = "batch_complete")]
    BatchComplete {
        session_id: SessionId,
        size: usize,
        failed: usize,
        duration_ms: u64,
    },

    #[serde(rename = "turn_complete")]
    TurnComplete {
        session_id: SessionId,
        turn: u32,
        operations_requested: usize,
    },

    #[serde(rename = "loop_finished")]
    LoopFinished {
        session_id: SessionId,
        turns: u32,
        reason: LoopEndReason,
    },

    #[serde(rename = "answer_ready")]
    AnswerReady {
        session_id: SessionId,
        answer: String,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::ClarificationRequested { session_id, .. }
            | Self::ObjectiveSet { session_id, .. }
            | Self::TurnStart { session_id, .. }
            | Self::OperationStart { session_id, .. }
            | Self::OperationEnd { session_id, .. }
            | Self::BatchComplete { session_id, .. }
            | Self::TurnComplete { session_id, .. }
            | Self::LoopFinished { session_id, .. }
            | Self::AnswerReady { session_id, .. } => session_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ClarificationRequested { .. } => "clarification_requested",
            Self::ObjectiveSet { .. } => "objective_set",
            Self::TurnStart { .. } => "turn_start",
            Self::OperationStart { .. } => "operation_start",
            Self::OperationEnd { .. } => "operation_end",
            Self::BatchComplete { .. } => "batch_complete",
            Self::TurnComplete { .. } => "turn_complete",
            Self::LoopFinished { .. } => "loop_finished",
            Self::AnswerReady { .. } => "answer_ready",
        }
    }
}
