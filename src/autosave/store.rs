//! # Document Store 계약
//!
//! 코디네이터가 소비하는 저장소 인터페이스입니다. 전송 방식에 무관한
//! 추상 계약이며, 실제 구현은 `http.rs`(REST) 또는 테스트의 목(mock)입니다.
//!
//! 코디네이터가 필요로 하는 연산은 두 가지뿐입니다:
//! - `create`: 최초 저장 — 서버가 id를 부여합니다
//! - `autosave`: 부분 업데이트 — 자동 저장 채널이 허용된 필드만 전달

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AutoSaveRequest, CreateSessionRequest};

/// 코디네이터 관점의 에러 분류
///
/// 전송 계층이 무엇이든 코디네이터는 이 세 종류로만 구분합니다:
/// - `Validation`: 저장을 건너뛰고 메시지를 표시. 대기 중인 편집은 유지
/// - `Authorization`: 이 편집 세션에서는 치명적 — 재시도하지 않음
///   (작성자가 아니거나 문서가 사라짐; 404와 401/403을 묶어서 취급)
/// - `Transport`: 일시적 — 쿨다운 후 다음 트리거에서 재시도
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),
    #[error("Session not found or not authorized")]
    Authorization,
    #[error("Auto-save failed: {0}")]
    Transport(String),
}

/// `create` 성공 응답 — 서버가 부여한 id와 저장 시각
#[derive(Debug, Clone)]
pub struct CreateAck {
    pub id: String,
    pub last_saved: String,
}

/// `autosave` 성공 응답 — 서버가 기록한 저장 시각
#[derive(Debug, Clone)]
pub struct SaveAck {
    pub last_saved: String,
}

/// 코디네이터가 소비하는 Document Store 인터페이스
///
/// `Arc<dyn DocumentStore>`로 공유됩니다. 이탈 시 fire-and-forget
/// 태스크도 같은 Arc를 복제해 들고 갑니다.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 새 세션을 생성하고 서버가 부여한 id를 반환합니다.
    async fn create(&self, payload: &CreateSessionRequest) -> Result<CreateAck, StoreError>;

    /// 기존 세션에 자동 저장 패치를 적용합니다.
    async fn autosave(&self, id: &str, patch: &AutoSaveRequest) -> Result<SaveAck, StoreError>;
}
