use crate::{ChatEntry, Phase, PhaseDisplay, StatusBadge, StepMark};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationView {
    pub transcript: Vec<ChatEntry>,
    pub badge: StatusBadge,
    pub indicator_visible: bool,
    pub phase: Option<PhaseDisplay>,
    pub steps: Vec<StepView>,
    pub quota_minute: String,
    pub quota_day: String,
    pub input: String,
    pub active_polls: usize,
    pub input_closed: bool,
    pub settled: bool,
    pub dirty: bool,
}

impl ConversationView {
    pub fn step(&self, phase: Phase) -> StepMark {
        self.steps
            .iter()
            .find(|step| step.phase == phase)
            .map_or(StepMark::Untouched, |step| step.mark)
    }

    pub fn all_steps_complete(&self) -> bool {
        self.steps.iter().all(|step| step.mark == StepMark::Complete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepView {
    pub phase: Phase,
    pub mark: StepMark,
}
