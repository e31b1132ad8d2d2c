#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the question input.
    InputChanged(String),
    /// User asked to send the current input.
    QuerySubmitted,
    /// The send endpoint answered (or failed) for a turn.
    SubmissionResolved {
        turn: crate::TurnId,
        result: crate::SubmissionResult,
    },
    /// A poll loop observed a progress label.
    ProgressObserved {
        turn: crate::TurnId,
        state: crate::ProgressState,
    },
    /// A poll loop stopped on its own or was cancelled.
    PollTerminated {
        turn: crate::TurnId,
        reason: crate::PollTermination,
    },
    /// The cosmetic typing delay for an assistant message elapsed.
    DelayedMessageDue { turn: crate::TurnId, text: String },
    /// The grace period after `done` elapsed.
    StatusResetDue { turn: crate::TurnId },
    /// First launch on this machine.
    FirstVisit,
    /// No more input will arrive.
    InputClosed,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}

