pub const USER_LABEL: &str = "Tú";
pub const ASSISTANT_LABEL: &str = "Abogado Virtual";
pub const NOTICE_PREFIX: &str = "⚠";

pub const STEP_UNTOUCHED: &str = "○";
pub const STEP_ACTIVE: &str = "◐";
pub const STEP_COMPLETE: &str = "●";
