//! # 세션 데이터베이스 쿼리 모듈
//!
//! `sessions` 테이블에 대한 쿼리 함수들이 정의되어 있습니다.
//! 모든 함수는 `async`이며 `SqlitePool`을 받아 데이터베이스와 상호작용합니다.
//!
//! ## 소유권 강제
//! 쓰기 계열 함수(update/autosave/publish/delete)는 세션 id와 함께
//! 작성자 id를 받아 `WHERE id = ? AND author_id = ?`로 조회합니다.
//! 행이 매칭되지 않으면 "존재하지 않거나 권한 없음"으로 취급하여
//! `Ok(None)` 또는 `Ok(false)`를 반환합니다 — 라우트에서 404가 됩니다.
//!
//! ## JSON TEXT 컬럼
//! `tags`와 `content`는 TEXT 컬럼에 JSON으로 저장됩니다.
//! 행 매퍼(`SessionRow` → `Session`)가 serde_json으로 파싱합니다.

use crate::error::AppError;
use crate::models::{
    normalize_tags, AuthorRef, AutoSaveRequest, Category, CreateSessionRequest, Difficulty,
    ListQuery, MySessionsQuery, Session, SessionPage, SessionStatus, UpdateSessionRequest,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// 목록/단건 조회 공통 SELECT 절.
/// 작성자 이름을 함께 내려주기 위해 users를 LEFT JOIN합니다.
const SELECT_SESSION: &str = r#"
SELECT s.id, s.title, s.description, s.tags, s.json_url, s.content,
       s.status, s.duration, s.difficulty, s.category,
       s.author_id, u.username AS author_username,
       s.last_saved, s.created_at, s.updated_at
FROM sessions s
LEFT JOIN users u ON u.id = s.author_id
"#;

/// DB 행 그대로의 모양 — tags/content가 아직 JSON 문자열인 상태
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    title: String,
    description: String,
    tags: String,
    json_url: Option<String>,
    content: String,
    status: SessionStatus,
    duration: i64,
    difficulty: Difficulty,
    category: Category,
    author_id: String,
    author_username: Option<String>,
    last_saved: String,
    created_at: String,
    updated_at: String,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        // 저장 시점에 직렬화를 거친 값이므로 파싱 실패는 사실상 없지만,
        // 손상된 행 하나 때문에 목록 전체가 죽지 않도록 기본값으로 대체합니다.
        let tags = serde_json::from_str(&row.tags).unwrap_or_default();
        let content = serde_json::from_str(&row.content)
            .unwrap_or_else(|_| serde_json::json!({}));

        Session {
            id: row.id,
            title: row.title,
            description: row.description,
            tags,
            json_url: row.json_url,
            content,
            status: row.status,
            duration: row.duration,
            difficulty: row.difficulty,
            category: row.category,
            author: AuthorRef {
                id: row.author_id,
                username: row.author_username,
            },
            last_saved: row.last_saved,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 새 세션을 생성합니다.
///
/// 문서화된 기본값을 적용합니다:
/// status=draft, category=other, difficulty=beginner, duration=0.
/// 태그는 저장 전에 정규화(trim + 소문자화)됩니다.
/// 작성자는 여기서 한 번 설정되며 이후 어떤 쿼리도 변경하지 않습니다.
pub async fn create_session(
    pool: &SqlitePool,
    author_id: &str,
    req: &CreateSessionRequest,
) -> Result<Session, AppError> {
    let id = uuid::Uuid::now_v7().to_string();

    let tags = normalize_tags(req.tags.as_deref().unwrap_or(&[]));
    let tags_json = serde_json::to_string(&tags)
        .map_err(|e| AppError::Internal(format!("Tag serialization failed: {}", e)))?;
    let content_json = serde_json::to_string(
        req.content.as_ref().unwrap_or(&serde_json::json!({})),
    )
    .map_err(|e| AppError::Internal(format!("Content serialization failed: {}", e)))?;

    // 빈 문자열 URL은 NULL로 저장합니다 (미설정과 동일하게 취급)
    let json_url = req
        .json_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());

    sqlx::query(
        r#"
        INSERT INTO sessions
            (id, title, description, tags, json_url, content,
             status, duration, difficulty, category, author_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(req.title.trim())
    .bind(req.description.as_deref().map(str::trim).unwrap_or(""))
    .bind(&tags_json)
    .bind(json_url)
    .bind(&content_json)
    .bind(req.status.unwrap_or_default())
    .bind(req.duration.unwrap_or(0))
    .bind(req.difficulty.unwrap_or_default())
    .bind(req.category.unwrap_or_default())
    .bind(author_id)
    .execute(pool)
    .await?;

    // 생성 직후 조회하여 DB가 채운 기본값(타임스탬프 등)이 포함된 완전한 객체를 반환
    get_session(pool, &id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created session".to_string()))
}

/// ID로 세션 하나를 조회합니다 (상태/소유권 무관 — 가시성은 라우트에서 판단).
pub async fn get_session(pool: &SqlitePool, id: &str) -> Result<Option<Session>, AppError> {
    let row = sqlx::query_as::<_, SessionRow>(&format!("{} WHERE s.id = ?", SELECT_SESSION))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Session::from))
}

/// ID와 작성자로 세션을 조회합니다. 작성자가 아니면 None.
pub async fn get_owned_session(
    pool: &SqlitePool,
    id: &str,
    author_id: &str,
) -> Result<Option<Session>, AppError> {
    let row = sqlx::query_as::<_, SessionRow>(&format!(
        "{} WHERE s.id = ? AND s.author_id = ?",
        SELECT_SESSION
    ))
    .bind(id)
    .bind(author_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Session::from))
}

/// 세션을 전체 수정합니다 (요청에 포함된 필드만 교체).
///
/// 명시적 저장이므로 `last_saved`와 `updated_at`을 함께 갱신합니다.
///
/// ## 반환값
/// - `Ok(Some(Session))`: 수정 성공
/// - `Ok(None)`: 세션이 없거나 작성자가 아님
/// - `Err(Validation)`: published → draft 전환 시도 (un-publish 없음)
pub async fn update_session(
    pool: &SqlitePool,
    id: &str,
    author_id: &str,
    req: &UpdateSessionRequest,
) -> Result<Option<Session>, AppError> {
    let Some(current) = get_owned_session(pool, id, author_id).await? else {
        return Ok(None);
    };

    // 상태 전이 검사: draft → published 또는 동일 상태 유지만 허용
    if current.status == SessionStatus::Published && req.status == Some(SessionStatus::Draft) {
        return Err(AppError::Validation(
            "A published session cannot be moved back to draft".to_string(),
        ));
    }

    // Mongoose의 Object.assign과 같은 병합: 요청에 없는 필드는 현재 값 유지
    let title = req.title.as_deref().map(str::trim).unwrap_or(&current.title);
    let description = req
        .description
        .as_deref()
        .map(str::trim)
        .unwrap_or(&current.description);
    let tags = match &req.tags {
        Some(tags) => normalize_tags(tags),
        None => current.tags.clone(),
    };
    let tags_json = serde_json::to_string(&tags)
        .map_err(|e| AppError::Internal(format!("Tag serialization failed: {}", e)))?;
    let content = req.content.as_ref().unwrap_or(&current.content);
    let content_json = serde_json::to_string(content)
        .map_err(|e| AppError::Internal(format!("Content serialization failed: {}", e)))?;
    let json_url = match &req.json_url {
        // 빈 문자열은 "URL 제거"로 해석합니다
        Some(url) if url.trim().is_empty() => None,
        Some(url) => Some(url.trim().to_string()),
        None => current.json_url.clone(),
    };

    sqlx::query(
        r#"
        UPDATE sessions
        SET title = ?, description = ?, tags = ?, json_url = ?, content = ?,
            status = ?, duration = ?, difficulty = ?, category = ?,
            last_saved = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ? AND author_id = ?
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(&tags_json)
    .bind(json_url)
    .bind(&content_json)
    .bind(req.status.unwrap_or(current.status))
    .bind(req.duration.unwrap_or(current.duration))
    .bind(req.difficulty.unwrap_or(current.difficulty))
    .bind(req.category.unwrap_or(current.category))
    .bind(id)
    .bind(author_id)
    .execute(pool)
    .await?;

    get_session(pool, id).await
}

/// 자동 저장 패치를 적용합니다.
///
/// 자동 저장 채널이 허용된 필드(title/description/content/tags/json_url)만
/// 갱신합니다. `COALESCE(?, column)`: 바인딩이 NULL(= 요청에 없음)이면
/// 기존 값을 유지합니다. status/category 등 명시적 동작의 필드는
/// 이 쿼리에 아예 등장하지 않으므로 덮어쓸 수 없습니다.
///
/// ## 반환값
/// - `Ok(Some(last_saved))`: 서버가 기록한 저장 시각
/// - `Ok(None)`: 세션이 없거나 작성자가 아님
pub async fn autosave_session(
    pool: &SqlitePool,
    id: &str,
    author_id: &str,
    req: &AutoSaveRequest,
) -> Result<Option<String>, AppError> {
    let tags_json = match &req.tags {
        Some(tags) => Some(
            serde_json::to_string(&normalize_tags(tags))
                .map_err(|e| AppError::Internal(format!("Tag serialization failed: {}", e)))?,
        ),
        None => None,
    };
    let content_json = match &req.content {
        Some(content) => Some(
            serde_json::to_string(content)
                .map_err(|e| AppError::Internal(format!("Content serialization failed: {}", e)))?,
        ),
        None => None,
    };

    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET title       = COALESCE(?, title),
            description = COALESCE(?, description),
            content     = COALESCE(?, content),
            tags        = COALESCE(?, tags),
            json_url    = COALESCE(?, json_url),
            last_saved  = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
            updated_at  = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ? AND author_id = ?
        "#,
    )
    .bind(req.title.as_deref().map(str::trim))
    .bind(req.description.as_deref().map(str::trim))
    .bind(content_json)
    .bind(tags_json)
    .bind(req.json_url.as_deref().map(str::trim))
    .bind(id)
    .bind(author_id)
    .execute(pool)
    .await?;

    // rows_affected() == 0: 해당 id의 세션이 없거나 작성자가 아님
    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let (last_saved,): (String,) =
        sqlx::query_as("SELECT last_saved FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;

    Ok(Some(last_saved))
}

/// 세션을 발행 상태로 전환합니다.
///
/// 이미 발행된 세션에 다시 호출해도 무해합니다 (published → published).
pub async fn publish_session(
    pool: &SqlitePool,
    id: &str,
    author_id: &str,
) -> Result<Option<Session>, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET status = ?,
            last_saved = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ? AND author_id = ?
        "#,
    )
    .bind(SessionStatus::Published)
    .bind(id)
    .bind(author_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_session(pool, id).await
}

/// 세션을 삭제합니다. 작성자 본인만 가능합니다.
///
/// ## 반환값
/// - `Ok(true)`: 삭제됨
/// - `Ok(false)`: 세션이 없거나 작성자가 아님
pub async fn delete_session(
    pool: &SqlitePool,
    id: &str,
    author_id: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = ? AND author_id = ?")
        .bind(id)
        .bind(author_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 페이지 번호와 페이지 크기를 안전한 범위로 보정합니다.
fn clamp_pagination(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(10).clamp(1, 100);
    (page, limit)
}

/// LIKE 패턴에 들어갈 사용자 입력을 이스케이프합니다.
/// `%`와 `_`는 LIKE의 와일드카드이므로, 리터럴 부분 문자열 검색이
/// 되도록 `\`로 이스케이프하고 쿼리에 `ESCAPE '\'`를 붙입니다.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// 공개 목록 쿼리의 WHERE 절 필터를 빌더에 추가합니다.
///
/// 목록 쿼리와 COUNT 쿼리가 같은 필터를 공유해야 하므로 분리했습니다.
fn push_public_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, query: &'a ListQuery) {
    qb.push(" WHERE s.status = ").push_bind(SessionStatus::Published);

    if let Some(category) = query.category {
        qb.push(" AND s.category = ").push_bind(category);
    }

    // 태그 any-of 매칭: tags 컬럼은 JSON 배열 TEXT이므로
    // 정규화된 태그를 따옴표째로 부분 문자열 검색합니다.
    // 예: tags = '["morning","flow"]' 에 대해 LIKE '%"flow"%'
    if let Some(tags) = &query.tags {
        let wanted: Vec<String> = tags
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if !wanted.is_empty() {
            qb.push(" AND (");
            for (i, tag) in wanted.into_iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("s.tags LIKE ")
                    .push_bind(format!("%\"{}\"%", escape_like(&tag)))
                    .push(" ESCAPE '\\'");
            }
            qb.push(")");
        }
    }

    // 제목/설명에 대한 대소문자 무시 부분 문자열 검색
    if let Some(search) = &query.search {
        let pattern = format!("%{}%", escape_like(&search.trim().to_lowercase()));
        qb.push(" AND (lower(s.title) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR lower(s.description) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

/// 발행된 세션 목록을 필터/페이지네이션과 함께 조회합니다.
///
/// 최신 생성순(created_at DESC)으로 정렬하며,
/// 페이지 계산까지 마친 `SessionPage`를 반환합니다.
pub async fn list_published(
    pool: &SqlitePool,
    query: &ListQuery,
) -> Result<SessionPage, AppError> {
    let (page, limit) = clamp_pagination(query.page, query.limit);

    // COUNT 쿼리: 같은 필터로 전체 개수를 셉니다 (페이지 수 계산용)
    let mut count_qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) FROM sessions s");
    push_public_filters(&mut count_qb, query);
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(pool).await?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_SESSION);
    push_public_filters(&mut qb, query);
    qb.push(" ORDER BY s.created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind((page - 1) * limit);

    let rows: Vec<SessionRow> = qb.build_query_as().fetch_all(pool).await?;
    let sessions = rows.into_iter().map(Session::from).collect();

    Ok(SessionPage {
        sessions,
        total,
        page,
        // 올림 나눗셈: 전체 개수를 페이지 크기로 나눠 페이지 수를 구합니다
        total_pages: (total + limit - 1) / limit,
    })
}

/// 특정 작성자의 세션 목록을 조회합니다 (초안 포함).
///
/// 편집 중인 목록이므로 최근 수정순(updated_at DESC)으로 정렬합니다.
pub async fn list_by_author(
    pool: &SqlitePool,
    author_id: &str,
    query: &MySessionsQuery,
) -> Result<SessionPage, AppError> {
    let (page, limit) = clamp_pagination(query.page, query.limit);

    let mut count_qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) FROM sessions s WHERE s.author_id = ");
    count_qb.push_bind(author_id);
    if let Some(status) = query.status {
        count_qb.push(" AND s.status = ").push_bind(status);
    }
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(pool).await?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_SESSION);
    qb.push(" WHERE s.author_id = ").push_bind(author_id);
    if let Some(status) = query.status {
        qb.push(" AND s.status = ").push_bind(status);
    }
    qb.push(" ORDER BY s.updated_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind((page - 1) * limit);

    let rows: Vec<SessionRow> = qb.build_query_as().fetch_all(pool).await?;
    let sessions = rows.into_iter().map(Session::from).collect();

    Ok(SessionPage {
        sessions,
        total,
        page,
        total_pages: (total + limit - 1) / limit,
    })
}
