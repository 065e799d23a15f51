use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::{PanelError, PanelResult};
use crate::models::{Meeting, Message};

use super::PartnershipApi;

/// reqwest-backed client for the Remote Partnership Service.
pub struct HttpPartnershipApi {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpPartnershipApi {
    pub fn new(config: &ApiConfig) -> PanelResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.post(self.url(path)))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateMeetingRequest {
    scheduled_time: DateTime<Utc>,
}

/// Triage a response the way the panel taxonomy expects: 401/403 are auth
/// failures, 409 is a state conflict (someone else already acted), 5xx is the
/// service being unavailable.
async fn parse_response<T: serde::de::DeserializeOwned>(response: Response) -> PanelResult<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| PanelError::ApiParseError(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PanelError::ApiAuthenticationFailed(detail)
        }
        StatusCode::CONFLICT => PanelError::MeetingConflict(detail),
        s if s.is_server_error() => PanelError::ApiServiceUnavailable(detail),
        _ => PanelError::ApiRequestFailed(detail),
    })
}

#[async_trait]
impl PartnershipApi for HttpPartnershipApi {
    async fn list_messages(
        &self,
        partnership_id: Uuid,
        limit: usize,
    ) -> PanelResult<Vec<Message>> {
        debug!(%partnership_id, limit, "fetching messages");
        let response = self
            .get(&format!("/partnerships/{}/messages", partnership_id))
            .query(&[("limit", limit)])
            .send()
            .await?;
        parse_response(response).await
    }

    async fn send_message(&self, partnership_id: Uuid, text: &str) -> PanelResult<Message> {
        let response = self
            .post(&format!("/partnerships/{}/messages", partnership_id))
            .json(&SendMessageRequest { text })
            .send()
            .await?;
        parse_response(response).await
    }

    async fn list_meetings(&self, partnership_id: Uuid) -> PanelResult<Vec<Meeting>> {
        debug!(%partnership_id, "fetching meetings");
        let response = self
            .get(&format!("/partnerships/{}/meetings", partnership_id))
            .send()
            .await?;
        parse_response(response).await
    }

    async fn create_meeting(
        &self,
        partnership_id: Uuid,
        scheduled_time: DateTime<Utc>,
    ) -> PanelResult<Meeting> {
        let response = self
            .post(&format!("/partnerships/{}/meetings", partnership_id))
            .json(&CreateMeetingRequest { scheduled_time })
            .send()
            .await?;
        parse_response(response).await
    }

    async fn accept_meeting(
        &self,
        partnership_id: Uuid,
        meeting_id: Uuid,
    ) -> PanelResult<Meeting> {
        let response = self
            .post(&format!(
                "/partnerships/{}/meetings/{}/accept",
                partnership_id, meeting_id
            ))
            .send()
            .await?;
        parse_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let config = ApiConfig {
            base_url: "http://localhost:9000/api/".to_string(),
            ..ApiConfig::default()
        };
        let api = HttpPartnershipApi::new(&config).unwrap();
        assert_eq!(api.url("/partnerships"), "http://localhost:9000/api/partnerships");
    }

    #[test]
    fn test_with_auth_token() {
        let api = HttpPartnershipApi::new(&ApiConfig::default())
            .unwrap()
            .with_auth_token("secret");
        assert_eq!(api.auth_token.as_deref(), Some("secret"));
    }
}
