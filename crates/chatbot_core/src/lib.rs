//! Chatbot core: pure conversation state machine and view-model helpers.
mod effect;
mod msg;
mod progress;
mod query;
mod state;
mod submission;
pub mod texts;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use progress::{Phase, PhaseDisplay, PollTermination, ProgressState, StepMark};
pub use query::{Query, QueryError};
pub use state::{
    ChatEntry, ConcurrentPollPolicy, ConversationConfig, ConversationState, Notice,
    ProgressDisplayState, QuotaDisplay, Role, StatusBadge, TurnId,
};
pub use submission::{ProgressHandle, QuotaLimits, QuotaValue, SubmissionResult, SubmissionStatus};
pub use update::update;
pub use view_model::{ConversationView, StepView};
