use std::collections::BTreeSet;
use std::time::Duration;

use crate::progress::{Phase, PhaseDisplay, ProgressState, StepMark};
use crate::submission::{QuotaLimits, QuotaValue};
use crate::texts;
use crate::view_model::{ConversationView, StepView};

/// Monotonic id for one submitted question and everything that follows from it.
pub type TurnId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrentPollPolicy {
    /// Every submission keeps its own poll loop; the display is last-write-wins.
    #[default]
    KeepAll,
    /// A new poll loop cancels any loop still running.
    CancelPrevious,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationConfig {
    pub typing_threshold_chars: usize,
    pub typing_ms_per_char: u64,
    pub typing_delay_cap: Duration,
    pub status_reset_grace: Duration,
    pub concurrent_polls: ConcurrentPollPolicy,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            typing_threshold_chars: 100,
            typing_ms_per_char: 2,
            typing_delay_cap: Duration::from_millis(800),
            status_reset_grace: Duration::from_millis(1200),
            concurrent_polls: ConcurrentPollPolicy::KeepAll,
        }
    }
}

impl ConversationConfig {
    /// Cosmetic delay before an assistant message is shown, if any.
    pub fn render_delay(&self, text: &str) -> Option<Duration> {
        let chars = text.chars().count();
        if chars <= self.typing_threshold_chars {
            return None;
        }
        let proportional = Duration::from_millis(chars as u64 * self.typing_ms_per_char);
        Some(proportional.min(self.typing_delay_cap))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    RateLimitReached,
}

impl Notice {
    pub fn text(self) -> &'static str {
        match self {
            Notice::RateLimitReached => texts::RATE_LIMIT_NOTICE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEntry {
    Message { role: Role, text: String },
    Notice(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusBadge {
    #[default]
    Idle,
    Processing,
}

impl StatusBadge {
    pub fn text(self) -> &'static str {
        match self {
            StatusBadge::Idle => texts::BADGE_IDLE,
            StatusBadge::Processing => texts::BADGE_PROCESSING,
        }
    }
}

/// Everything the status badge and step list show. Both the submit and the
/// poll paths change it only through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressDisplayState {
    pub badge: StatusBadge,
    pub indicator_visible: bool,
    pub phase: Option<PhaseDisplay>,
    pub steps: [StepMark; 5],
}

impl ProgressDisplayState {
    fn begin_turn(&mut self) {
        self.steps = [StepMark::Untouched; 5];
        self.phase = None;
        self.badge = StatusBadge::Processing;
        self.indicator_visible = true;
    }

    fn observe(&mut self, state: &ProgressState) {
        self.phase = Some(state.display());
        if let Some(marks) = state.step_marks() {
            for (current, observed) in self.steps.iter_mut().zip(marks) {
                *current = (*current).max(observed);
            }
        }
        if !matches!(state, ProgressState::Error) {
            self.badge = StatusBadge::Processing;
            self.indicator_visible = true;
        }
    }

    /// A failed phase stays visible until the next question; any other phase is cleared.
    fn settle(&mut self) {
        self.badge = StatusBadge::Idle;
        self.indicator_visible = false;
        if !self.phase.as_ref().is_some_and(|phase| phase.failed) {
            self.phase = None;
        }
    }

    fn reset_to_baseline(&mut self) {
        self.settle();
        self.phase = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuotaDisplay {
    pub minute: Option<QuotaValue>,
    pub day: Option<QuotaValue>,
}

impl QuotaDisplay {
    fn apply(&mut self, limits: Option<&QuotaLimits>) {
        self.minute = limits.and_then(|l| l.minute_left.clone());
        self.day = limits.and_then(|l| l.day_left.clone());
    }

    pub fn minute_text(&self) -> String {
        format!("Por minuto: {}", display_or_placeholder(self.minute.as_ref()))
    }

    pub fn day_text(&self) -> String {
        format!("Por día: {}", display_or_placeholder(self.day.as_ref()))
    }
}

fn display_or_placeholder(value: Option<&QuotaValue>) -> String {
    value.map_or_else(|| texts::QUOTA_PLACEHOLDER.to_string(), ToString::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationState {
    config: ConversationConfig,
    input: String,
    transcript: Vec<ChatEntry>,
    display: ProgressDisplayState,
    quota: QuotaDisplay,
    last_turn: TurnId,
    in_flight: BTreeSet<TurnId>,
    active_polls: BTreeSet<TurnId>,
    pending_deliveries: BTreeSet<TurnId>,
    input_closed: bool,
    dirty: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ConversationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    pub fn view(&self) -> ConversationView {
        ConversationView {
            transcript: self.transcript.clone(),
            badge: self.display.badge,
            indicator_visible: self.display.indicator_visible,
            phase: self.display.phase.clone(),
            steps: Phase::ALL
                .into_iter()
                .zip(self.display.steps)
                .map(|(phase, mark)| StepView { phase, mark })
                .collect(),
            quota_minute: self.quota.minute_text(),
            quota_day: self.quota.day_text(),
            input: self.input.clone(),
            active_polls: self.active_polls.len(),
            input_closed: self.input_closed,
            settled: self.is_settled(),
            dirty: self.dirty,
        }
    }

    pub fn display(&self) -> &ProgressDisplayState {
        &self.display
    }

    pub fn transcript(&self) -> &[ChatEntry] {
        &self.transcript
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_input_closed(&self) -> bool {
        self.input_closed
    }

    /// No submission awaiting a response and no assistant message still pending.
    /// Poll loops do not count: they only drive the progress indicator.
    pub fn is_settled(&self) -> bool {
        self.in_flight.is_empty() && self.pending_deliveries.is_empty()
    }

    pub(crate) fn input(&self) -> &str {
        &self.input
    }

    pub(crate) fn set_input(&mut self, text: String) {
        if self.input != text {
            self.input = text;
            self.mark_dirty();
        }
    }

    pub(crate) fn close_input(&mut self) {
        self.input_closed = true;
        self.mark_dirty();
    }

    pub(crate) fn push_message(&mut self, role: Role, text: impl Into<String>) {
        self.transcript.push(ChatEntry::Message {
            role,
            text: text.into(),
        });
        self.mark_dirty();
    }

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        self.transcript.push(ChatEntry::Notice(notice));
        self.mark_dirty();
    }

    /// Echoes the question, resets the step list and marks the turn in flight.
    pub(crate) fn begin_turn(&mut self, question: &str) -> TurnId {
        self.last_turn += 1;
        let turn = self.last_turn;
        self.input.clear();
        self.push_message(Role::User, question);
        self.display.begin_turn();
        self.in_flight.insert(turn);
        turn
    }

    /// Returns false if the turn was not awaiting a response.
    pub(crate) fn finish_submission(&mut self, turn: TurnId) -> bool {
        self.in_flight.remove(&turn)
    }

    pub(crate) fn apply_quota(&mut self, limits: Option<&QuotaLimits>) {
        self.quota.apply(limits);
        self.mark_dirty();
    }

    /// Registers a new poll loop, returning the loops it displaces.
    pub(crate) fn start_poll(&mut self, turn: TurnId) -> Vec<TurnId> {
        let displaced = match self.config.concurrent_polls {
            ConcurrentPollPolicy::KeepAll => Vec::new(),
            ConcurrentPollPolicy::CancelPrevious => {
                std::mem::take(&mut self.active_polls).into_iter().collect()
            }
        };
        self.active_polls.insert(turn);
        displaced
    }

    pub(crate) fn is_polling(&self, turn: TurnId) -> bool {
        self.active_polls.contains(&turn)
    }

    pub(crate) fn end_poll(&mut self, turn: TurnId) -> bool {
        self.active_polls.remove(&turn)
    }

    pub(crate) fn defer_delivery(&mut self, turn: TurnId) {
        self.pending_deliveries.insert(turn);
    }

    pub(crate) fn take_delivery(&mut self, turn: TurnId) -> bool {
        self.pending_deliveries.remove(&turn)
    }

    pub(crate) fn observe_progress(&mut self, state: &ProgressState) {
        self.display.observe(state);
        self.mark_dirty();
    }

    /// Returns the badge to idle when no submission or poll loop is running.
    pub(crate) fn settle_if_idle(&mut self) {
        if self.in_flight.is_empty() && self.active_polls.is_empty() {
            self.display.settle();
            self.mark_dirty();
        }
    }

    pub(crate) fn reset_status_if_idle(&mut self) {
        if self.in_flight.is_empty() && self.active_polls.is_empty() {
            self.display.reset_to_baseline();
            self.mark_dirty();
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
