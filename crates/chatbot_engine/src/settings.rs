use std::time::Duration;

use url::Url;

use crate::ClientError;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub send_path: String,
    pub progress_path: String,
    pub csrf_bootstrap_path: String,
    /// Explicit CSRF token; when unset the token is read from the bootstrap page cookie.
    pub csrf_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    /// `None` polls until a terminal state or a failed query.
    pub max_poll_attempts: Option<u32>,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            send_path: "/chatbot/api/send/".to_string(),
            progress_path: "/chatbot/api/progress/".to_string(),
            csrf_bootstrap_path: "/chatbot/chat/".to_string(),
            csrf_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(800),
            max_poll_attempts: None,
            user_agent: format!("chatbot-cli/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientSettings {
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let base = Url::parse(&self.base_url)
            .map_err(|err| ClientError::InvalidUrl(format!("{}: {err}", self.base_url)))?;
        base.join(path)
            .map_err(|err| ClientError::InvalidUrl(format!("{path}: {err}")))
    }

    pub fn send_url(&self) -> Result<Url, ClientError> {
        self.endpoint(&self.send_path)
    }

    pub fn progress_url(&self, key: &str) -> Result<Url, ClientError> {
        let mut url = self.endpoint(&self.progress_path)?;
        url.query_pairs_mut().append_pair("key", key);
        Ok(url)
    }

    pub fn csrf_bootstrap_url(&self) -> Result<Url, ClientError> {
        self.endpoint(&self.csrf_bootstrap_path)
    }
}

pub fn build_client(settings: &ClientSettings) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .user_agent(settings.user_agent.clone())
        .build()
        .map_err(|err| ClientError::Transport(err.to_string()))
}
