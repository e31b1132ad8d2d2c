use chatbot_logging::{chat_debug, chat_warn};
use reqwest::header::SET_COOKIE;
use tokio::sync::OnceCell;

use crate::settings::ClientSettings;
use crate::types::map_reqwest_error;
use crate::ClientError;

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Extracts the CSRF token from a single `Set-Cookie` header value.
pub fn csrf_from_set_cookie(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    if name.trim() != CSRF_COOKIE {
        return None;
    }
    let value = value.trim().trim_matches('"');
    (!value.is_empty()).then(|| value.to_string())
}

/// Supplies the CSRF token, fetching it from the chat page at most once per session.
pub struct CsrfProvider {
    client: reqwest::Client,
    settings: ClientSettings,
    token: OnceCell<String>,
}

impl CsrfProvider {
    pub fn new(client: reqwest::Client, settings: ClientSettings) -> Self {
        let token = match settings.csrf_token.clone() {
            Some(configured) => OnceCell::new_with(Some(configured)),
            None => OnceCell::new(),
        };
        Self {
            client,
            settings,
            token,
        }
    }

    /// Returns the token, or an empty string if none could be obtained.
    pub async fn token(&self) -> String {
        if let Some(token) = self.token.get() {
            return token.clone();
        }
        match self.bootstrap().await {
            Ok(token) => self.token.get_or_init(move || async move { token }).await.clone(),
            Err(err) => {
                // Not cached: the next submit tries again.
                chat_warn!("csrf bootstrap failed: {}", err);
                String::new()
            }
        }
    }

    async fn bootstrap(&self) -> Result<String, ClientError> {
        let url = self.settings.csrf_bootstrap_url()?;
        chat_debug!("fetching csrf cookie from {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(csrf_from_set_cookie)
            .ok_or_else(|| ClientError::Decode("no csrftoken cookie in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_django_cookie() {
        let header = "csrftoken=AbC123; expires=Thu, 15 Oct 2027 10:00:00 GMT; Max-Age=31449600; Path=/; SameSite=Lax";
        assert_eq!(csrf_from_set_cookie(header), Some("AbC123".to_string()));
    }

    #[test]
    fn ignores_other_cookies() {
        assert_eq!(csrf_from_set_cookie("sessionid=xyz; Path=/"), None);
        assert_eq!(csrf_from_set_cookie("csrftoken=; Path=/"), None);
        assert_eq!(csrf_from_set_cookie("garbage"), None);
    }
}
