use crate::{
    texts, ConversationState, Effect, Msg, Notice, Phase, PollTermination, ProgressState, Query,
    Role, SubmissionResult, SubmissionStatus, TurnId,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: ConversationState, msg: Msg) -> (ConversationState, Vec<Effect>) {
    let effects = match msg {
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::QuerySubmitted => {
            // Blank input is never sent and leaves the input untouched.
            let Ok(query) = Query::parse(state.input()) else {
                return (state, Vec::new());
            };
            let turn = state.begin_turn(query.as_str());
            vec![Effect::Submit { turn, query }]
        }
        Msg::SubmissionResolved { turn, result } => {
            if !state.finish_submission(turn) {
                return (state, Vec::new());
            }
            apply_submission(&mut state, turn, result)
        }
        Msg::ProgressObserved { turn, state: observed } => {
            if !state.is_polling(turn) {
                return (state, Vec::new());
            }
            state.observe_progress(&observed);
            if observed == ProgressState::Canonical(Phase::Done) {
                vec![Effect::ResetStatusLater {
                    turn,
                    delay: state.config().status_reset_grace,
                }]
            } else {
                Vec::new()
            }
        }
        Msg::PollTerminated { turn, reason } => {
            if state.end_poll(turn) && reason != PollTermination::Done {
                state.settle_if_idle();
            }
            Vec::new()
        }
        Msg::DelayedMessageDue { turn, text } => {
            if state.take_delivery(turn) {
                state.push_message(Role::Assistant, text);
            }
            Vec::new()
        }
        Msg::StatusResetDue { .. } => {
            state.reset_status_if_idle();
            Vec::new()
        }
        Msg::FirstVisit => {
            state.push_message(Role::Assistant, texts::WELCOME);
            vec![Effect::MarkVisited]
        }
        Msg::InputClosed => {
            state.close_input();
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn apply_submission(
    state: &mut ConversationState,
    turn: TurnId,
    result: SubmissionResult,
) -> Vec<Effect> {
    if result.has_payload() {
        state.apply_quota(result.limits.as_ref());
    }

    let mut effects = Vec::new();
    match result.status {
        SubmissionStatus::RateLimited => {
            state.push_message(Role::Assistant, result.message);
            state.push_notice(Notice::RateLimitReached);
        }
        SubmissionStatus::Error | SubmissionStatus::TransportFailure => {
            state.push_message(Role::Assistant, result.message);
        }
        SubmissionStatus::Ok => {
            if let Some(handle) = result.progress_key {
                for displaced in state.start_poll(turn) {
                    effects.push(Effect::CancelPolling { turn: displaced });
                }
                effects.push(Effect::StartPolling { turn, handle });
            }
            match state.config().render_delay(&result.message) {
                Some(delay) => {
                    state.defer_delivery(turn);
                    effects.push(Effect::DeliverLater {
                        turn,
                        text: result.message,
                        delay,
                    });
                }
                None => state.push_message(Role::Assistant, result.message),
            }
        }
    }

    state.settle_if_idle();
    effects
}
