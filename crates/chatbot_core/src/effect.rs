use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send the question to the backend. Exactly one per accepted submission.
    Submit {
        turn: crate::TurnId,
        query: crate::Query,
    },
    StartPolling {
        turn: crate::TurnId,
        handle: crate::ProgressHandle,
    },
    CancelPolling { turn: crate::TurnId },
    /// Deliver an assistant message after a cosmetic delay.
    DeliverLater {
        turn: crate::TurnId,
        text: String,
        delay: Duration,
    },
    ResetStatusLater {
        turn: crate::TurnId,
        delay: Duration,
    },
    /// Record that the welcome message has been shown.
    MarkVisited,
}
