use std::fmt;

/// Canonical coarse-grained phases, in step-indicator order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Queued,
    GatheringContext,
    CallingLlm,
    StreamingAnswer,
    Done,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Queued,
        Phase::GatheringContext,
        Phase::CallingLlm,
        Phase::StreamingAnswer,
        Phase::Done,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire label used by the progress endpoint.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Queued => "queued",
            Phase::GatheringContext => "gathering_context",
            Phase::CallingLlm => "calling_llm",
            Phase::StreamingAnswer => "streaming_answer",
            Phase::Done => "done",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Phase::ALL.into_iter().find(|phase| phase.label() == label)
    }

    pub fn title(self) -> &'static str {
        match self {
            Phase::Queued => "En cola",
            Phase::GatheringContext => "Recopilando contexto",
            Phase::CallingLlm => "Consultando al modelo",
            Phase::StreamingAnswer => "Generando respuesta",
            Phase::Done => "Listo",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Phase::Queued => "bi-hourglass-split",
            Phase::GatheringContext => "bi-search",
            Phase::CallingLlm => "bi-cpu",
            Phase::StreamingAnswer => "bi-chat-dots",
            Phase::Done => "bi-check-circle",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Extended labels the server is known to emit, with their display titles.
const KNOWN_EXTENDED: [(&str, &str); 2] = [
    ("obteniendo_demanda", "Obteniendo demanda"),
    ("no_pjud_info_available_yet", "Sin información del PJUD aún"),
];

const ERROR_LABEL: &str = "error";
const ERROR_ICON: &str = "bi-exclamation-octagon";

/// A state label observed on the progress endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressState {
    Canonical(Phase),
    Error,
    /// Any server label outside the canonical set and `error`.
    Extended(String),
}

impl ProgressState {
    /// Maps a raw label. The status source rejects replies without a label before
    /// they get here, so an empty string only falls back to `queued` for direct callers.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() {
            return ProgressState::Canonical(Phase::Queued);
        }
        if label == ERROR_LABEL {
            return ProgressState::Error;
        }
        match Phase::from_label(label) {
            Some(phase) => ProgressState::Canonical(phase),
            None => ProgressState::Extended(label.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ProgressState::Canonical(phase) => phase.label(),
            ProgressState::Error => ERROR_LABEL,
            ProgressState::Extended(label) => label,
        }
    }

    /// `done` and `error` are the only states that end a poll loop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressState::Canonical(Phase::Done) | ProgressState::Error
        )
    }

    pub fn canonical_index(&self) -> Option<usize> {
        match self {
            ProgressState::Canonical(phase) => Some(phase.index()),
            _ => None,
        }
    }

    pub fn display(&self) -> PhaseDisplay {
        match self {
            ProgressState::Canonical(phase) => PhaseDisplay {
                title: phase.title().to_string(),
                icon: phase.icon(),
                failed: false,
            },
            ProgressState::Error => PhaseDisplay {
                title: "Error".to_string(),
                icon: ERROR_ICON,
                failed: true,
            },
            ProgressState::Extended(label) => {
                let title = KNOWN_EXTENDED
                    .iter()
                    .find(|(known, _)| *known == label)
                    .map_or_else(|| label.clone(), |(_, title)| (*title).to_string());
                PhaseDisplay {
                    title,
                    icon: Phase::Queued.icon(),
                    failed: false,
                }
            }
        }
    }

    /// Step marks implied by this state, or `None` when the steps should be
    /// left as they are.
    pub fn step_marks(&self) -> Option<[StepMark; 5]> {
        let mut marks = [StepMark::Untouched; 5];
        match self {
            ProgressState::Canonical(Phase::Done) => {
                marks = [StepMark::Complete; 5];
            }
            ProgressState::Canonical(phase) => {
                let current = phase.index();
                for (index, mark) in marks.iter_mut().enumerate() {
                    if index < current {
                        *mark = StepMark::Complete;
                    } else if index == current {
                        *mark = StepMark::Active;
                    }
                }
            }
            ProgressState::Extended(_) => {
                marks[Phase::Queued.index()] = StepMark::Active;
            }
            ProgressState::Error => return None,
        }
        Some(marks)
    }
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseDisplay {
    pub title: String,
    pub icon: &'static str,
    pub failed: bool,
}

/// Per-step indicator mark. Ordered so that merging takes the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum StepMark {
    #[default]
    Untouched,
    Active,
    Complete,
}

/// Why a poll loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTermination {
    Done,
    Error,
    RequestFailed,
    Cancelled,
    /// The configured attempt cap was reached before a terminal state.
    Exhausted,
}

impl fmt::Display for PollTermination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PollTermination::Done => "done",
            PollTermination::Error => "error",
            PollTermination::RequestFailed => "request_failed",
            PollTermination::Cancelled => "cancelled",
            PollTermination::Exhausted => "exhausted",
        };
        f.write_str(text)
    }
}
