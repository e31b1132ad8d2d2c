use std::time::Duration;

use chatbot_core::{
    update, ConcurrentPollPolicy, ConversationConfig, ConversationState, Effect, Msg, Phase,
    PollTermination, ProgressHandle, ProgressState, StatusBadge, StepMark, SubmissionResult,
    SubmissionStatus, TurnId,
};

fn init_logging() {
    chatbot_logging::initialize_for_tests();
}

/// Submits a question and resolves it with a progress key, leaving one poll loop active.
fn polling_turn(state: ConversationState, key: &str) -> (ConversationState, TurnId, Vec<Effect>) {
    let (state, _) = update(state, Msg::InputChanged("¿Qué es una demanda?".to_string()));
    let (state, effects) = update(state, Msg::QuerySubmitted);
    let turn = match effects.as_slice() {
        [Effect::Submit { turn, .. }] => *turn,
        other => panic!("unexpected effects {other:?}"),
    };
    let (state, effects) = update(
        state,
        Msg::SubmissionResolved {
            turn,
            result: SubmissionResult {
                status: SubmissionStatus::Ok,
                message: "ok".to_string(),
                progress_key: Some(ProgressHandle::new(key)),
                limits: None,
            },
        },
    );
    (state, turn, effects)
}

fn observe(state: ConversationState, turn: TurnId, label: &str) -> (ConversationState, Vec<Effect>) {
    update(
        state,
        Msg::ProgressObserved {
            turn,
            state: ProgressState::from_label(label),
        },
    )
}

#[test]
fn canonical_sequence_completes_steps_monotonically() {
    init_logging();
    let (mut state, turn, _) = polling_turn(ConversationState::new(), "abc123");
    let mut previous = state.view().steps;

    for label in ["queued", "gathering_context", "calling_llm", "streaming_answer"] {
        let (next, effects) = observe(state, turn, label);
        assert!(effects.is_empty());
        let view = next.view();
        let observed = Phase::from_label(label).unwrap();
        assert_eq!(view.step(observed), StepMark::Active);
        for phase in Phase::ALL.into_iter().filter(|p| *p < observed) {
            assert_eq!(view.step(phase), StepMark::Complete);
        }
        for (before, after) in previous.iter().zip(&view.steps) {
            assert!(after.mark >= before.mark);
        }
        previous = view.steps;
        state = next;
    }

    let (state, effects) = observe(state, turn, "done");
    assert!(state.view().all_steps_complete());
    assert_eq!(
        effects,
        vec![Effect::ResetStatusLater {
            turn,
            delay: Duration::from_millis(1200),
        }]
    );
}

#[test]
fn calling_llm_then_done_reaches_full_completion() {
    init_logging();
    let (state, turn, _) = polling_turn(ConversationState::new(), "abc123");
    let (state, _) = observe(state, turn, "calling_llm");
    assert_eq!(state.view().step(Phase::GatheringContext), StepMark::Complete);
    assert_eq!(state.view().step(Phase::Done), StepMark::Untouched);

    let (state, _) = observe(state, turn, "done");
    assert!(state.view().all_steps_complete());
}

#[test]
fn done_resets_status_after_grace() {
    init_logging();
    let (state, turn, _) = polling_turn(ConversationState::new(), "k");
    let (state, _) = observe(state, turn, "done");
    let (state, _) = update(
        state,
        Msg::PollTerminated {
            turn,
            reason: PollTermination::Done,
        },
    );
    // Still showing the final phase until the grace period elapses.
    assert_eq!(state.view().badge, StatusBadge::Processing);
    assert_eq!(state.view().phase.unwrap().title, "Listo");

    let (state, effects) = update(state, Msg::StatusResetDue { turn });
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.badge, StatusBadge::Idle);
    assert!(!view.indicator_visible);
    assert_eq!(view.phase, None);
    assert!(view.all_steps_complete());
}

#[test]
fn error_state_shows_failure_and_settles() {
    init_logging();
    let (state, turn, _) = polling_turn(ConversationState::new(), "k");
    let (state, _) = observe(state, turn, "gathering_context");
    let (state, effects) = observe(state, turn, "error");
    assert!(effects.is_empty());
    let phase = state.view().phase.unwrap();
    assert!(phase.failed);
    // Steps keep what was reached before the failure.
    assert_eq!(state.view().step(Phase::Queued), StepMark::Complete);
    assert_eq!(state.view().step(Phase::GatheringContext), StepMark::Active);

    let (state, _) = update(
        state,
        Msg::PollTerminated {
            turn,
            reason: PollTermination::Error,
        },
    );
    assert_eq!(state.view().badge, StatusBadge::Idle);
    assert_eq!(state.view().active_polls, 0);
}

#[test]
fn poll_failure_is_silent() {
    init_logging();
    let (state, turn, _) = polling_turn(ConversationState::new(), "k");
    let transcript_before = state.view().transcript;
    let (state, effects) = update(
        state,
        Msg::PollTerminated {
            turn,
            reason: PollTermination::RequestFailed,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().transcript, transcript_before);
    assert_eq!(state.view().badge, StatusBadge::Idle);
}

#[test]
fn extended_label_uses_fallback_without_completing_steps() {
    init_logging();
    let (state, turn, _) = polling_turn(ConversationState::new(), "k");
    let (state, effects) = observe(state, turn, "obteniendo_demanda");
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.phase.as_ref().unwrap().title, "Obteniendo demanda");
    assert_eq!(view.step(Phase::Queued), StepMark::Active);
    assert!(view.steps.iter().all(|s| s.mark != StepMark::Complete));
}

#[test]
fn observations_from_unknown_loops_are_ignored() {
    init_logging();
    let (state, _turn, _) = polling_turn(ConversationState::new(), "k");
    let before = state.view();
    let (state, effects) = observe(state, 99, "calling_llm");
    assert!(effects.is_empty());
    assert_eq!(state.view().steps, before.steps);
}

#[test]
fn keep_all_policy_runs_loops_side_by_side() {
    init_logging();
    let (state, first, effects) = polling_turn(ConversationState::new(), "first");
    assert_eq!(effects.len(), 1);
    let (state, second, effects) = polling_turn(state, "second");
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            turn: second,
            handle: ProgressHandle::new("second"),
        }]
    );
    assert_eq!(state.view().active_polls, 2);

    // Last write wins on the shared display; marks never regress.
    let (state, _) = observe(state, second, "calling_llm");
    let (state, _) = observe(state, first, "gathering_context");
    assert_eq!(state.view().step(Phase::CallingLlm), StepMark::Active);
    assert_eq!(state.view().phase.unwrap().title, "Recopilando contexto");

    // One loop failing does not settle the badge while the other still runs.
    let (state, _) = update(
        state,
        Msg::PollTerminated {
            turn: first,
            reason: PollTermination::RequestFailed,
        },
    );
    assert_eq!(state.view().badge, StatusBadge::Processing);
}

#[test]
fn cancel_previous_policy_cancels_running_loop() {
    init_logging();
    let config = ConversationConfig {
        concurrent_polls: ConcurrentPollPolicy::CancelPrevious,
        ..ConversationConfig::default()
    };
    let (state, first, _) = polling_turn(ConversationState::with_config(config), "first");
    let (state, second, effects) = polling_turn(state, "second");
    assert_eq!(
        effects,
        vec![
            Effect::CancelPolling { turn: first },
            Effect::StartPolling {
                turn: second,
                handle: ProgressHandle::new("second"),
            },
        ]
    );
    assert_eq!(state.view().active_polls, 1);

    // A late observation from the cancelled loop no longer touches the display.
    let before = state.view();
    let (state, _) = observe(state, first, "streaming_answer");
    assert_eq!(state.view().steps, before.steps);
}

#[test]
fn new_submission_resets_steps() {
    init_logging();
    let (state, turn, _) = polling_turn(ConversationState::new(), "k");
    let (state, _) = observe(state, turn, "done");
    assert!(state.view().all_steps_complete());

    let (state, _) = update(state, Msg::InputChanged("otra".to_string()));
    let (state, _) = update(state, Msg::QuerySubmitted);
    assert!(state
        .view()
        .steps
        .iter()
        .all(|s| s.mark == StepMark::Untouched));
}

#[test]
fn failed_poll_clears_the_phase_it_left_behind() {
    init_logging();
    let (state, turn, _) = polling_turn(ConversationState::new(), "k");
    let (state, _) = observe(state, turn, "calling_llm");
    assert_eq!(state.view().phase.unwrap().title, "Consultando al modelo");

    let (state, _) = update(
        state,
        Msg::PollTerminated {
            turn,
            reason: PollTermination::RequestFailed,
        },
    );
    let view = state.view();
    assert_eq!(view.badge, StatusBadge::Idle);
    assert!(!view.indicator_visible);
    assert_eq!(view.phase, None);
}

#[test]
fn skipped_grace_reset_is_caught_up_when_the_other_turn_settles() {
    init_logging();
    let (state, _) = update(ConversationState::new(), Msg::InputChanged("primera".to_string()));
    let (state, effects) = update(state, Msg::QuerySubmitted);
    let waiting = match effects.as_slice() {
        [Effect::Submit { turn, .. }] => *turn,
        other => panic!("unexpected effects {other:?}"),
    };
    let (state, turn, _) = polling_turn(state, "k");
    let (state, _) = observe(state, turn, "done");
    let (state, _) = update(
        state,
        Msg::PollTerminated {
            turn,
            reason: PollTermination::Done,
        },
    );
    let (state, _) = update(state, Msg::StatusResetDue { turn });
    // The first question is still in flight, so the reset does nothing yet.
    assert_eq!(state.view().badge, StatusBadge::Processing);
    assert_eq!(state.view().phase.unwrap().title, "Listo");

    let (state, _) = update(
        state,
        Msg::SubmissionResolved {
            turn: waiting,
            result: SubmissionResult {
                status: SubmissionStatus::Ok,
                message: "respuesta".to_string(),
                progress_key: None,
                limits: None,
            },
        },
    );
    let view = state.view();
    assert_eq!(view.badge, StatusBadge::Idle);
    assert_eq!(view.phase, None);
}

#[test]
fn error_waits_for_other_turns_before_settling_but_keeps_failure_shown() {
    init_logging();
    let (state, turn, _) = polling_turn(ConversationState::new(), "k");
    let (state, _) = update(state, Msg::InputChanged("segunda".to_string()));
    let (state, effects) = update(state, Msg::QuerySubmitted);
    let waiting = match effects.as_slice() {
        [Effect::Submit { turn, .. }] => *turn,
        other => panic!("unexpected effects {other:?}"),
    };

    let (state, _) = observe(state, turn, "error");
    let (state, _) = update(
        state,
        Msg::PollTerminated {
            turn,
            reason: PollTermination::Error,
        },
    );
    assert_eq!(state.view().badge, StatusBadge::Processing);

    let (state, _) = update(
        state,
        Msg::SubmissionResolved {
            turn: waiting,
            result: SubmissionResult {
                status: SubmissionStatus::Ok,
                message: "respuesta".to_string(),
                progress_key: None,
                limits: None,
            },
        },
    );
    let view = state.view();
    assert_eq!(view.badge, StatusBadge::Idle);
    assert!(view.phase.unwrap().failed);
}
