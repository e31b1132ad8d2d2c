use chatbot_core::{
    texts, ProgressHandle, Query, QuotaLimits, QuotaValue, SubmissionResult, SubmissionStatus,
};
use chatbot_logging::{chat_info, chat_warn};
use reqwest::header::COOKIE;
use serde::{Deserialize, Serialize};

use crate::csrf::{CsrfProvider, CSRF_COOKIE, CSRF_HEADER};
use crate::settings::ClientSettings;
use crate::types::map_reqwest_error;
use crate::ClientError;

const HTTP_TOO_MANY_REQUESTS: u16 = 429;

#[async_trait::async_trait]
pub trait RequestSubmitter: Send + Sync {
    /// Issues exactly one send request. Every failure is folded into the result.
    async fn submit(&self, query: &Query) -> SubmissionResult;
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    question: &'a str,
}

/// Body of the send endpoint response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub progress_key: Option<String>,
    #[serde(default)]
    pub limits: Option<WireLimits>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireLimits {
    #[serde(default)]
    pub minute_left: Option<serde_json::Value>,
    #[serde(default)]
    pub day_left: Option<serde_json::Value>,
}

impl From<WireLimits> for QuotaLimits {
    fn from(wire: WireLimits) -> Self {
        Self {
            minute_left: wire.minute_left.and_then(quota_value),
            day_left: wire.day_left.and_then(quota_value),
        }
    }
}

fn quota_value(value: serde_json::Value) -> Option<QuotaValue> {
    match value {
        serde_json::Value::Number(n) => Some(
            n.as_i64()
                .map_or_else(|| QuotaValue::Text(n.to_string()), QuotaValue::Count),
        ),
        serde_json::Value::String(s) => Some(QuotaValue::Text(s)),
        _ => None,
    }
}

/// Classifies a send response. `payload` is `None` when the body was not valid JSON.
///
/// HTTP 429 means rate limited whatever the body says. Any other unreadable body
/// counts as a transport failure.
pub fn classify_response(http_status: u16, payload: Option<SendPayload>) -> SubmissionResult {
    let Some(payload) = payload else {
        if http_status == HTTP_TOO_MANY_REQUESTS {
            return SubmissionResult {
                status: SubmissionStatus::RateLimited,
                message: texts::RATE_LIMITED_DEFAULT.to_string(),
                progress_key: None,
                limits: None,
            };
        }
        return SubmissionResult::transport_failure();
    };

    let limits = payload.limits.map(QuotaLimits::from);
    let message = payload.message.filter(|m| !m.is_empty());
    let body_status = payload.status.as_deref().unwrap_or_default();
    let http_ok = (200..300).contains(&http_status);

    if http_status == HTTP_TOO_MANY_REQUESTS || body_status == "rate_limited" {
        return SubmissionResult {
            status: SubmissionStatus::RateLimited,
            message: message.unwrap_or_else(|| texts::RATE_LIMITED_DEFAULT.to_string()),
            progress_key: None,
            limits,
        };
    }
    if !http_ok || body_status != "ok" {
        return SubmissionResult {
            status: SubmissionStatus::Error,
            message: message.unwrap_or_else(|| texts::ERROR_DEFAULT.to_string()),
            progress_key: None,
            limits,
        };
    }
    SubmissionResult {
        status: SubmissionStatus::Ok,
        message: message.unwrap_or_else(|| texts::EMPTY_ANSWER.to_string()),
        progress_key: payload
            .progress_key
            .filter(|key| !key.is_empty())
            .map(ProgressHandle::new),
        limits,
    }
}

/// The error kind a non-ok result corresponds to, for logging.
fn outcome_error(http_status: u16, result: &SubmissionResult) -> Option<ClientError> {
    match result.status {
        SubmissionStatus::Ok => None,
        SubmissionStatus::RateLimited => Some(ClientError::RateLimited {
            status: http_status,
        }),
        SubmissionStatus::Error => Some(ClientError::ServerRejected {
            status: http_status,
        }),
        SubmissionStatus::TransportFailure => Some(ClientError::Decode(format!(
            "unreadable body with http status {http_status}"
        ))),
    }
}

pub struct ReqwestSubmitter {
    client: reqwest::Client,
    settings: ClientSettings,
    csrf: CsrfProvider,
}

impl ReqwestSubmitter {
    pub fn new(client: reqwest::Client, settings: ClientSettings) -> Self {
        let csrf = CsrfProvider::new(client.clone(), settings.clone());
        Self {
            client,
            settings,
            csrf,
        }
    }

    async fn send(&self, query: &Query) -> Result<(u16, Option<SendPayload>), ClientError> {
        let url = self.settings.send_url()?;
        let token = self.csrf.token().await;

        let mut request = self
            .client
            .post(url)
            .header(CSRF_HEADER, token.as_str())
            .json(&SendRequest {
                question: query.as_str(),
            });
        if !token.is_empty() {
            request = request.header(COOKIE, format!("{CSRF_COOKIE}={token}"));
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let payload = serde_json::from_slice::<SendPayload>(&body).ok();
        Ok((status, payload))
    }
}

#[async_trait::async_trait]
impl RequestSubmitter for ReqwestSubmitter {
    async fn submit(&self, query: &Query) -> SubmissionResult {
        chat_info!("submitting question ({} chars)", query.as_str().chars().count());
        let (http_status, payload) = match self.send(query).await {
            Ok(response) => response,
            Err(err) => {
                chat_warn!("submit failed: {}", err);
                return SubmissionResult::transport_failure();
            }
        };

        let result = classify_response(http_status, payload);
        match outcome_error(http_status, &result) {
            Some(err) => chat_warn!("submit finished with {:?}: {}", result.status, err),
            None => chat_info!(
                "submit accepted (progress key: {})",
                result.progress_key.is_some()
            ),
        }
        result
    }
}
