//! # HTTP Document Store
//!
//! REST API(`/api/v1/sessions`)를 향한 `DocumentStore` 구현입니다.
//! 코디네이터는 이 구현을 `Arc<dyn DocumentStore>`로 받아 쓰므로
//! 전송 방식이 바뀌어도 타이밍 정책은 그대로입니다.
//!
//! 에러 해석: HTTP 400 → Validation, 401/403/404 → Authorization,
//! 그 외(전송 실패 포함) → Transport. 타임아웃 등 세부 전송 정책은
//! reqwest 클라이언트에 위임합니다.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::store::{CreateAck, DocumentStore, SaveAck, StoreError};
use crate::models::{AutoSaveRequest, AutoSaveResponse, CreateSessionRequest};

/// REST API를 향한 Document Store 클라이언트
pub struct HttpDocumentStore {
    client: reqwest::Client,
    /// 예: "http://localhost:5000/api/v1"
    base_url: String,
    /// Bearer 토큰 — 발급은 외부 인증 서비스의 몫
    token: String,
}

impl HttpDocumentStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

/// `POST /sessions` 성공 응답에서 필요한 부분만 추립니다.
#[derive(Debug, Deserialize)]
struct CreateResponse {
    session: CreatedSession,
}

#[derive(Debug, Deserialize)]
struct CreatedSession {
    id: String,
    last_saved: String,
}

/// 서버의 에러 봉투: `{ "error": { "code": ..., "message": ... } }`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// 실패 응답을 코디네이터의 에러 분류로 해석합니다.
async fn interpret_failure(response: reqwest::Response) -> StoreError {
    let status = response.status();
    let message = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.error.message)
        .unwrap_or_else(|_| format!("HTTP {}", status));

    match status {
        StatusCode::BAD_REQUEST => StoreError::Validation(message),
        // 404와 401/403을 묶습니다: "없거나 내 것이 아님"
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
            StoreError::Authorization
        }
        _ => StoreError::Transport(message),
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn create(&self, payload: &CreateSessionRequest) -> Result<CreateAck, StoreError> {
        tracing::debug!("Creating session draft: {}", payload.title);

        let response = self
            .client
            .post(format!("{}/sessions", self.base_url))
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(interpret_failure(response).await);
        }

        let body: CreateResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(CreateAck {
            id: body.session.id,
            last_saved: body.session.last_saved,
        })
    }

    async fn autosave(&self, id: &str, patch: &AutoSaveRequest) -> Result<SaveAck, StoreError> {
        tracing::debug!("Auto-saving session {}", id);

        let response = self
            .client
            .patch(format!("{}/sessions/{}/autosave", self.base_url, id))
            .bearer_auth(&self.token)
            .json(patch)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(interpret_failure(response).await);
        }

        let body: AutoSaveResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(SaveAck {
            last_saved: body.last_saved,
        })
    }
}
