//! # 세션 라우트 핸들러
//!
//! 웰니스 세션의 CRUD, 자동 저장, 발행을 처리하는 HTTP 핸들러 함수들입니다.
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 인증 |
//! |--------|------|--------|------|
//! | GET | /api/v1/sessions | `list_sessions` | 공개 |
//! | GET | /api/v1/sessions/my-sessions | `my_sessions` | 필요 |
//! | GET | /api/v1/sessions/:id | `get_session` | 초안은 작성자만 |
//! | POST | /api/v1/sessions | `create_session` | 필요 |
//! | PUT | /api/v1/sessions/:id | `update_session` | 필요 |
//! | PATCH | /api/v1/sessions/:id/autosave | `autosave_session` | 필요 |
//! | PATCH | /api/v1/sessions/:id/publish | `publish_session` | 필요 |
//! | DELETE | /api/v1/sessions/:id | `delete_session` | 필요 |
//!
//! ## Axum 핸들러 패턴
//! 핸들러는 Extractor를 매개변수로 받습니다:
//! - `State(state)`: 앱 전역 상태 (DB 풀, JWT 비밀키)
//! - `auth_user: AuthUser`: Bearer 토큰에서 추출한 작성자 (검증 실패 시 401)
//! - `Path(id)`, `Query(query)`, `Json(body)`: 요청에서 데이터 추출
//!
//! 반환 타입이 `Result<T, AppError>`이면 Axum이 자동으로
//! Ok → HTTP 응답, Err → 에러 JSON 응답으로 변환합니다.

use crate::{
    db,
    error::AppError,
    middleware::auth::{verify_access_token, AuthUser},
    models::*,
};
use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// SqlitePool은 내부적으로 Arc를 사용하므로 clone해도 풀이 복제되지 않습니다.
#[derive(Clone)]
pub struct AppState {
    /// SQLite 연결 풀
    pub pool: SqlitePool,
    /// JWT 토큰 검증용 비밀키
    pub jwt_secret: String,
}

// ── 입력 검증 ──
// 닫힌 enum(status/category/difficulty)은 serde가 역직렬화 단계에서
// 거르므로, 여기서는 길이/형식 제약만 확인합니다.

/// 공통 필드 제약을 검사합니다. 위반 시 `AppError::Validation`.
fn validate_fields(
    title: Option<&str>,
    description: Option<&str>,
    json_url: Option<&str>,
    duration: Option<i64>,
) -> Result<(), AppError> {
    if let Some(title) = title {
        let len = title.trim().chars().count();
        if len == 0 || len > 100 {
            return Err(AppError::Validation(
                "Title must be between 1 and 100 characters".to_string(),
            ));
        }
    }
    if let Some(description) = description {
        if description.trim().chars().count() > 500 {
            return Err(AppError::Validation(
                "Description must be less than 500 characters".to_string(),
            ));
        }
    }
    if let Some(url) = json_url {
        let url = url.trim();
        // 빈 값은 "URL 없음"으로 허용, 값이 있으면 절대 URL이어야 함
        if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::Validation("Please enter a valid URL".to_string()));
        }
    }
    if let Some(duration) = duration {
        if duration < 0 {
            return Err(AppError::Validation(
                "Duration must be a non-negative number of minutes".to_string(),
            ));
        }
    }
    Ok(())
}

/// Authorization 헤더에서 요청자의 user id를 추출합니다 (없거나 무효이면 None).
///
/// 공개 엔드포인트에서 "로그인했다면 누구인지"만 알고 싶을 때 사용합니다.
/// 인증이 필수인 핸들러는 이 함수 대신 `AuthUser` Extractor를 씁니다.
fn viewer_id(headers: &HeaderMap, jwt_secret: &str) -> Option<String> {
    let token = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    verify_access_token(token, jwt_secret)
        .ok()
        .map(|claims| claims.sub)
}

/// `GET /sessions` — 발행된 세션 목록을 조회합니다 (공개).
///
/// 쿼리 파라미터: `page`, `limit`, `category`, `tags`(쉼표 구분, any-of),
/// `search`(제목/설명 부분 문자열, 대소문자 무시)
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<SessionPage>, AppError> {
    let page = db::list_published(&state.pool, &query).await?;
    Ok(Json(page))
}

/// `GET /sessions/my-sessions` — 내 세션 목록을 조회합니다 (초안 포함).
pub async fn my_sessions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<MySessionsQuery>,
) -> Result<Json<SessionPage>, AppError> {
    let page = db::list_by_author(&state.pool, &auth_user.user_id, &query).await?;
    Ok(Json(page))
}

/// `GET /sessions/:id` — 세션 하나를 조회합니다.
///
/// 발행된 세션은 누구나 볼 수 있습니다.
/// 초안은 작성자에게만 보이며, 다른 사용자에게는 404를 반환합니다
/// (존재 여부 자체를 노출하지 않기 위해 403이 아닌 404).
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Session>, AppError> {
    let session = db::get_session(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    if session.status != SessionStatus::Published {
        let viewer = viewer_id(&headers, &state.jwt_secret);
        if viewer.as_deref() != Some(session.author.id.as_str()) {
            return Err(AppError::NotFound);
        }
    }

    Ok(Json(session))
}

/// `POST /sessions` — 새 세션을 생성합니다.
///
/// title은 필수(1~100자)이며, 나머지 필드는 문서화된 기본값이 적용됩니다.
/// 작성자는 토큰의 사용자로 설정되고 이후 변경되지 않습니다.
pub async fn create_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    validate_fields(
        Some(&req.title),
        req.description.as_deref(),
        req.json_url.as_deref(),
        req.duration,
    )?;

    let session = db::create_session(&state.pool, &auth_user.user_id, &req).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Session created successfully",
            "session": session
        })),
    ))
}

/// `PUT /sessions/:id` — 세션을 전체 수정합니다 (작성자만).
///
/// 요청에 포함된 필드만 교체되며, published → draft 전환은 거부됩니다.
pub async fn update_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<Value>, AppError> {
    validate_fields(
        req.title.as_deref(),
        req.description.as_deref(),
        req.json_url.as_deref(),
        req.duration,
    )?;

    let session = db::update_session(&state.pool, &id, &auth_user.user_id, &req)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(json!({
        "message": "Session updated successfully",
        "session": session
    })))
}

/// `PATCH /sessions/:id/autosave` — 자동 저장 패치를 적용합니다 (작성자만).
///
/// 자동 저장 채널이 허용된 필드만 갱신하고, 서버가 기록한
/// `last_saved` 시각을 돌려줍니다. 코디네이터는 이 응답을 받아야만
/// 핑거프린트를 갱신합니다 (성공 전에는 절대 앞당기지 않음).
pub async fn autosave_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<AutoSaveRequest>,
) -> Result<Json<AutoSaveResponse>, AppError> {
    validate_fields(
        req.title.as_deref(),
        req.description.as_deref(),
        req.json_url.as_deref(),
        None,
    )?;

    let last_saved = db::autosave_session(&state.pool, &id, &auth_user.user_id, &req)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(AutoSaveResponse {
        message: "Session auto-saved".to_string(),
        last_saved,
    }))
}

/// `PATCH /sessions/:id/publish` — 세션을 발행합니다 (작성자만).
pub async fn publish_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session = db::publish_session(&state.pool, &id, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(json!({
        "message": "Session published successfully",
        "session": session
    })))
}

/// `DELETE /sessions/:id` — 세션을 삭제합니다 (작성자만).
///
/// 성공 시 HTTP 204 No Content를 반환합니다 (본문 없음).
pub async fn delete_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let deleted = db::delete_session(&state.pool, &id, &auth_user.user_id).await?;
    if !deleted {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}
