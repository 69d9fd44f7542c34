//! REST client for the quest backend.
//!
//! Calls are fire-and-await: no request timeout, no retry, no de-duplication
//! beyond the session's submitting-phase guard. Domain rejections arrive as
//! HTTP 200 bodies with `ok: false`; non-2xx statuses are transport-class.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::deadline::DeadlineInfo;
use crate::resolution::PaymentKind;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status: {0}")]
    Status(StatusCode),
    #[error("invalid base url: {0}")]
    BaseUrl(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub xp_reward: i64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestsResponse {
    #[serde(default)]
    pub quests: Vec<QuestSummary>,
    pub module_index: Option<u32>,
    pub module_title: Option<String>,
    pub deadline_info: Option<DeadlineInfo>,
    #[serde(default)]
    pub deadline_expired: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub user_id: i64,
    pub module_index: u32,
    pub payment_type: PaymentKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResponse {
    #[serde(default)]
    pub ok: bool,
    pub deadline_info: Option<DeadlineInfo>,
    pub new_deadline_iso: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestActionRequest {
    pub user_id: i64,
    pub quest_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestActionResponse {
    #[serde(default)]
    pub ok: bool,
    pub error: Option<String>,
    pub message: Option<String>,
    pub xp_gained: Option<i64>,
}

impl QuestActionResponse {
    /// `deadline_expired` rejections route to the resolution flow instead of
    /// a generic error notice.
    pub fn is_deadline_rejection(&self) -> bool {
        !self.ok && self.error.as_deref() == Some("deadline_expired")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: Option<String>,
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub level: u32,
    pub rank: Option<String>,
    #[serde(default)]
    pub module_index: u32,
    #[serde(default)]
    pub streak: u32,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        // A trailing slash keeps Url::join from eating the last path segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(&normalized)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn quests(&self, user_id: i64) -> Result<QuestsResponse, ApiError> {
        self.get_json(&format!("api/quests/{user_id}")).await
    }

    pub async fn user(&self, user_id: i64) -> Result<UserProfile, ApiError> {
        self.get_json(&format!("api/user/{user_id}")).await
    }

    pub async fn deadline_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentResponse, ApiError> {
        self.post_json("api/deadline/penalty", request).await
    }

    pub async fn start_quest(
        &self,
        request: &QuestActionRequest,
    ) -> Result<QuestActionResponse, ApiError> {
        self.post_json("api/quest/start", request).await
    }

    pub async fn submit_quest(
        &self,
        request: &QuestActionRequest,
    ) -> Result<QuestActionResponse, ApiError> {
        self.post_json("api/quest/submit", request).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.base_url.join(path)?;
        debug!(event = "api.get", %url);
        let response = self.http.get(url).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.base_url.join(path)?;
        debug!(event = "api.post", %url);
        let response = self.http.post(url).json(body).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_join_keeps_api_prefix() {
        let client = ApiClient::new("http://127.0.0.1:8000").unwrap();
        let url = client.base_url().join("api/quests/42").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/quests/42");

        let client = ApiClient::new("http://127.0.0.1:8000/miniapp/").unwrap();
        let url = client.base_url().join("api/deadline/penalty").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/miniapp/api/deadline/penalty"
        );
    }

    #[test]
    fn payment_request_serializes_wire_payment_type() {
        let request = PaymentRequest {
            user_id: 42,
            module_index: 1,
            payment_type: PaymentKind::Repurchase,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["user_id"], 42);
        assert_eq!(json["module_index"], 1);
        assert_eq!(json["payment_type"], "repurchase");
    }

    #[test]
    fn quests_response_tolerates_missing_optional_fields() {
        let parsed: QuestsResponse = serde_json::from_str(
            r#"{"quests": [{"id": "m1_intro", "title": "Intro"}], "module_index": 0}"#,
        )
        .unwrap();
        assert_eq!(parsed.quests.len(), 1);
        assert_eq!(parsed.quests[0].xp_reward, 0);
        assert!(parsed.deadline_info.is_none());
        assert!(!parsed.deadline_expired);
    }

    #[test]
    fn deadline_rejection_is_detected_only_for_the_expired_error() {
        let rejected: QuestActionResponse = serde_json::from_str(
            r#"{"ok": false, "error": "deadline_expired", "message": "expired"}"#,
        )
        .unwrap();
        assert!(rejected.is_deadline_rejection());

        let other: QuestActionResponse =
            serde_json::from_str(r#"{"ok": false, "error": "already_completed"}"#).unwrap();
        assert!(!other.is_deadline_rejection());

        let success: QuestActionResponse = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(!success.is_deadline_rejection());
    }
}
