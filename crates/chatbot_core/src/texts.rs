//! Localized user-facing texts.

pub const WELCOME: &str = "👋 Hola, soy tu Abogado Virtual. ¿En qué puedo ayudarte hoy?";
pub const RATE_LIMITED_DEFAULT: &str =
    "Has alcanzado el límite de consultas. Por favor, espera un momento.";
pub const RATE_LIMIT_NOTICE: &str = "Límite de consultas alcanzado";
pub const ERROR_DEFAULT: &str = "Lo siento, ha ocurrido un error. Por favor, intenta nuevamente.";
pub const EMPTY_ANSWER: &str = "No pude procesar tu consulta. Por favor, intenta nuevamente.";
pub const TRANSPORT_FAILURE: &str =
    "Error de conexión. Por favor, verifica tu conexión a internet e intenta nuevamente.";
pub const QUOTA_PLACEHOLDER: &str = "—";
pub const BADGE_IDLE: &str = "Activo";
pub const BADGE_PROCESSING: &str = "Procesando";
