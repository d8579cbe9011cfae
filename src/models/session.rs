//! # 웰니스 세션 모델 정의
//!
//! 유일한 영속 엔티티인 세션(Session)과 그 요청/응답 타입들을 정의합니다.
//! 세션은 한 명의 작성자가 소유하는 명상/요가/호흡 콘텐츠 문서이며,
//! `draft`(작성자만 열람) 또는 `published`(공개) 상태를 가집니다.
//!
//! ## 닫힌 enum
//! status/category/difficulty는 자유 문자열이 아니라 닫힌 enum입니다.
//! serde가 역직렬화 단계에서 허용되지 않은 값을 거부하므로,
//! 문자열 검증 코드가 따로 필요 없습니다.
//! `sqlx::Type` derive로 DB의 TEXT 컬럼과도 같은 표기로 오갑니다.

use serde::{Deserialize, Serialize};

/// 세션의 발행 상태
///
/// 상태 전이는 `draft → published` 한 방향뿐입니다 (un-publish 없음).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SessionStatus {
    /// 초안 — 작성자에게만 보이며 자동 저장으로 변경 가능
    #[default]
    Draft,
    /// 발행됨 — 모든 독자에게 공개, 내용은 확정된 것으로 간주
    Published,
}

/// 콘텐츠 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Category {
    Yoga,
    Meditation,
    Breathing,
    Mindfulness,
    #[default]
    Other,
}

/// 난이도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// 세션 작성자 참조 — 응답에 포함되는 최소한의 작성자 정보
///
/// 작성자는 생성 시 한 번 설정되며 이후 절대 재할당되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: String,
    /// users 테이블 조인으로 채워지는 표시용 이름
    pub username: Option<String>,
}

/// 웰니스 세션 엔티티 — DB의 `sessions` 테이블 한 행에 대응합니다.
///
/// `tags`와 `content`는 DB에 JSON TEXT로 저장되며,
/// db 계층의 행 매퍼가 이 구조체로 변환하면서 파싱합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// 세션 고유 식별자 (UUIDv7) — 최초 생성 성공 시 서버가 부여
    pub id: String,
    /// 제목 (필수, 공백 제거 후 1~100자)
    pub title: String,
    /// 설명 (최대 500자)
    pub description: String,
    /// 태그 — 소문자 문자열의 순서 있는 목록
    pub tags: Vec<String>,
    /// 선택: 세션 데이터 파일의 절대 URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_url: Option<String>,
    /// 작성자 정의 구조의 본문 블롭 (서버는 내용을 해석하지 않음)
    pub content: serde_json::Value,
    pub status: SessionStatus,
    /// 소요 시간 (분 단위, 음수 불가)
    pub duration: i64,
    pub difficulty: Difficulty,
    pub category: Category,
    pub author: AuthorRef,
    /// 마지막으로 저장(자동/명시)이 성공한 시각 — 낙관적으로 앞당기지 않음
    pub last_saved: String,
    pub created_at: String,
    /// 모든 변경 시 갱신. 항상 created_at 이상
    pub updated_at: String,
}

/// 세션 생성 요청 — `POST /api/v1/sessions`의 요청 본문
///
/// title만 필수이며 나머지는 문서화된 기본값이 적용됩니다:
/// status=draft, category=other, difficulty=beginner, duration=0
///
/// 코디네이터의 최초 생성 경로도 이 타입을 직렬화하여 전송하므로
/// Serialize를 함께 derive합니다. 비어 있는 Option 필드는
/// 와이어에서 생략됩니다 (jsonUrl이 빈 값이면 보내지 않음).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

/// 세션 전체 수정 요청 — `PUT /api/v1/sessions/:id`의 요청 본문
///
/// 포함된 필드만 업데이트합니다. status에 draft를 넣어
/// 발행을 되돌리는 것은 허용되지 않습니다 (400 반환).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSessionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub json_url: Option<String>,
    pub content: Option<serde_json::Value>,
    pub status: Option<SessionStatus>,
    pub duration: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub category: Option<Category>,
}

/// 자동 저장 요청 — `PATCH /api/v1/sessions/:id/autosave`의 요청 본문
///
/// 자동 저장 채널이 건드릴 수 있는 필드만 허용합니다.
/// status/category/difficulty처럼 명시적 동작으로만 바뀌는 필드는
/// 여기 포함되지 않으므로 자동 저장이 덮어쓸 수 없습니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoSaveRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_url: Option<String>,
}

/// 공개 목록 조회 쿼리 — `GET /api/v1/sessions?...`
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<Category>,
    /// 쉼표로 구분된 태그 목록 — 하나라도 포함하면 매칭 (any-of)
    pub tags: Option<String>,
    /// 제목/설명에 대한 대소문자 무시 부분 문자열 검색
    pub search: Option<String>,
}

/// 내 세션 목록 조회 쿼리 — `GET /api/v1/sessions/my-sessions?...`
#[derive(Debug, Default, Deserialize)]
pub struct MySessionsQuery {
    pub status: Option<SessionStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// 페이지네이션된 목록 응답
///
/// 응답: `{ "sessions": [...], "total": 42, "page": 1, "total_pages": 5 }`
#[derive(Debug, Serialize)]
pub struct SessionPage {
    pub sessions: Vec<Session>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

/// 자동 저장 응답 — 서버가 기록한 last_saved 시각을 돌려줍니다.
///
/// 코디네이터는 이 시각을 받아야만 핑거프린트를 갱신합니다.
#[derive(Debug, Serialize, Deserialize)]
pub struct AutoSaveResponse {
    pub message: String,
    pub last_saved: String,
}

/// 태그 목록을 정규화합니다: 공백 제거 + 소문자화 + 빈 항목 제거.
///
/// 순서는 입력 순서를 유지합니다 (태그는 순서 있는 목록).
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_enums_reject_unknown_values() {
        // 닫힌 enum: 허용 목록 밖의 값은 역직렬화 단계에서 거부됩니다
        assert!(serde_json::from_str::<Category>("\"pilates\"").is_err());
        assert!(serde_json::from_str::<Difficulty>("\"expert\"").is_err());
        assert!(serde_json::from_str::<SessionStatus>("\"archived\"").is_err());

        let cat: Category = serde_json::from_str("\"yoga\"").unwrap();
        assert_eq!(cat, Category::Yoga);
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Published).unwrap(),
            "\"published\""
        );
        assert_eq!(serde_json::to_string(&Category::Other).unwrap(), "\"other\"");
    }

    #[test]
    fn normalize_tags_lowercases_and_drops_blanks() {
        let tags = vec![
            " Morning ".to_string(),
            "FLOW".to_string(),
            "  ".to_string(),
            "calm".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["morning", "flow", "calm"]);
    }
}
