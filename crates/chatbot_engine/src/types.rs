use chatbot_core::{PollTermination, ProgressState, SubmissionResult, TurnId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("rate limited by server (http status {status})")]
    RateLimited { status: u16 },
    #[error("server rejected request (http status {status})")]
    ServerRejected { status: u16 },
    #[error("progress query failed: {0}")]
    PollFailure(String),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::Transport(format!("timeout: {err}"));
    }
    if err.is_decode() {
        return ClientError::Decode(err.to_string());
    }
    ClientError::Transport(err.to_string())
}

/// Events reported by the engine back to the application loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SubmissionResolved {
        turn: TurnId,
        result: SubmissionResult,
    },
    ProgressObserved {
        turn: TurnId,
        state: ProgressState,
    },
    PollTerminated {
        turn: TurnId,
        reason: PollTermination,
    },
    MessageDue {
        turn: TurnId,
        text: String,
    },
    StatusResetDue {
        turn: TurnId,
    },
}
