//! 세션 db 계층 통합 테스트 — 인메모리 SQLite에 실제 마이그레이션을
//! 적용하고 쿼리 함수를 직접 구동합니다.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use wellnessflow::db;
use wellnessflow::error::AppError;
use wellnessflow::models::*;

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

async fn seed_user(pool: &SqlitePool, id: &str, username: &str) {
    db::create_user(pool, id, username, None).await.unwrap();
}

fn create_request(title: &str) -> CreateSessionRequest {
    CreateSessionRequest {
        title: title.to_string(),
        description: None,
        tags: None,
        json_url: None,
        content: None,
        status: None,
        duration: None,
        difficulty: None,
        category: None,
    }
}

#[tokio::test]
async fn session_lifecycle() {
    let pool = test_pool().await;
    seed_user(&pool, "u1", "maya").await;

    // 1. 생성 — 문서화된 기본값 확인
    let session = db::create_session(&pool, "u1", &create_request("Morning Flow"))
        .await
        .unwrap();
    assert_eq!(session.title, "Morning Flow");
    assert_eq!(session.status, SessionStatus::Draft);
    assert_eq!(session.category, Category::Other);
    assert_eq!(session.difficulty, Difficulty::Beginner);
    assert_eq!(session.duration, 0);
    assert_eq!(session.author.id, "u1");
    assert_eq!(session.author.username.as_deref(), Some("maya"));
    assert!(!session.last_saved.is_empty());
    assert!(session.updated_at >= session.created_at);

    // 2. 조회
    let fetched = db::get_session(&pool, &session.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, session.id);

    // 3. 전체 수정 — 포함된 필드만 교체
    let update = UpdateSessionRequest {
        description: Some("A gentle start".to_string()),
        duration: Some(45),
        ..Default::default()
    };
    let updated = db::update_session(&pool, &session.id, "u1", &update)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.description, "A gentle start");
    assert_eq!(updated.duration, 45);
    assert_eq!(updated.title, "Morning Flow"); // 건드리지 않은 필드 유지

    // 4. 발행
    let published = db::publish_session(&pool, &session.id, "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(published.status, SessionStatus::Published);

    // 5. 삭제
    assert!(db::delete_session(&pool, &session.id, "u1").await.unwrap());
    assert!(db::get_session(&pool, &session.id).await.unwrap().is_none());
}

#[tokio::test]
async fn create_normalizes_tags_and_blank_url() {
    let pool = test_pool().await;
    seed_user(&pool, "u1", "maya").await;

    let mut req = create_request("Evening Calm");
    req.tags = Some(vec![
        " Relax ".to_string(),
        "SLEEP".to_string(),
        "  ".to_string(),
    ]);
    req.json_url = Some("   ".to_string());

    let session = db::create_session(&pool, "u1", &req).await.unwrap();
    assert_eq!(session.tags, vec!["relax", "sleep"]);
    assert_eq!(session.json_url, None); // 빈 URL은 NULL로
}

#[tokio::test]
async fn autosave_touches_only_allowed_fields() {
    let pool = test_pool().await;
    seed_user(&pool, "u1", "maya").await;

    let mut req = create_request("Morning Flow");
    req.category = Some(Category::Yoga);
    let session = db::create_session(&pool, "u1", &req).await.unwrap();

    let patch = AutoSaveRequest {
        description: Some("A gentle start".to_string()),
        content: Some(serde_json::json!({"steps": ["breathe"]})),
        ..Default::default()
    };
    let last_saved = db::autosave_session(&pool, &session.id, "u1", &patch)
        .await
        .unwrap()
        .unwrap();
    assert!(!last_saved.is_empty());

    let after = db::get_session(&pool, &session.id).await.unwrap().unwrap();
    assert_eq!(after.description, "A gentle start");
    assert_eq!(after.content, serde_json::json!({"steps": ["breathe"]}));
    // 자동 저장이 건드릴 수 없는 필드는 그대로
    assert_eq!(after.category, Category::Yoga);
    assert_eq!(after.status, SessionStatus::Draft);
    assert_eq!(after.title, "Morning Flow"); // 패치에 없던 필드 유지
}

#[tokio::test]
async fn writes_require_ownership() {
    let pool = test_pool().await;
    seed_user(&pool, "u1", "maya").await;
    seed_user(&pool, "u2", "intruder").await;

    let session = db::create_session(&pool, "u1", &create_request("Private Draft"))
        .await
        .unwrap();

    // 다른 사용자의 쓰기 시도는 모두 "없는 행" 취급
    let patch = AutoSaveRequest {
        title: Some("Hijacked".to_string()),
        ..Default::default()
    };
    assert!(db::autosave_session(&pool, &session.id, "u2", &patch)
        .await
        .unwrap()
        .is_none());
    assert!(db::update_session(&pool, &session.id, "u2", &UpdateSessionRequest::default())
        .await
        .unwrap()
        .is_none());
    assert!(db::publish_session(&pool, &session.id, "u2")
        .await
        .unwrap()
        .is_none());
    assert!(!db::delete_session(&pool, &session.id, "u2").await.unwrap());

    // 원본은 무사
    let intact = db::get_session(&pool, &session.id).await.unwrap().unwrap();
    assert_eq!(intact.title, "Private Draft");
}

#[tokio::test]
async fn published_sessions_cannot_return_to_draft() {
    let pool = test_pool().await;
    seed_user(&pool, "u1", "maya").await;

    let session = db::create_session(&pool, "u1", &create_request("Morning Flow"))
        .await
        .unwrap();
    db::publish_session(&pool, &session.id, "u1")
        .await
        .unwrap()
        .unwrap();

    let unpublish = UpdateSessionRequest {
        status: Some(SessionStatus::Draft),
        ..Default::default()
    };
    let result = db::update_session(&pool, &session.id, "u1", &unpublish).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    // published → published는 허용 (멱등)
    let keep = UpdateSessionRequest {
        status: Some(SessionStatus::Published),
        ..Default::default()
    };
    let kept = db::update_session(&pool, &session.id, "u1", &keep)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.status, SessionStatus::Published);
}

#[tokio::test]
async fn public_listing_filters_and_paginates() {
    let pool = test_pool().await;
    seed_user(&pool, "u1", "maya").await;

    // 발행 3건 (yoga/meditation/breathing) + 초안 1건
    for (title, category, tags) in [
        ("Sunrise Yoga", Category::Yoga, vec!["morning", "energy"]),
        ("Deep Rest", Category::Meditation, vec!["sleep"]),
        ("Box Breathing", Category::Breathing, vec!["calm", "focus"]),
    ] {
        let mut req = create_request(title);
        req.category = Some(category);
        req.tags = Some(tags.into_iter().map(String::from).collect());
        req.status = Some(SessionStatus::Published);
        db::create_session(&pool, "u1", &req).await.unwrap();
    }
    db::create_session(&pool, "u1", &create_request("Unfinished Draft"))
        .await
        .unwrap();

    // 초안은 공개 목록에 절대 나오지 않음
    let page = db::list_published(&pool, &ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 3);
    assert!(page.sessions.iter().all(|s| s.status == SessionStatus::Published));

    // 카테고리 필터
    let yoga = db::list_published(
        &pool,
        &ListQuery {
            category: Some(Category::Yoga),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(yoga.total, 1);
    assert_eq!(yoga.sessions[0].title, "Sunrise Yoga");

    // 태그 any-of: "sleep,focus" → 두 건 매칭
    let tagged = db::list_published(
        &pool,
        &ListQuery {
            tags: Some("sleep,focus".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(tagged.total, 2);

    // 대소문자 무시 부분 문자열 검색
    let found = db::list_published(
        &pool,
        &ListQuery {
            search: Some("BREATH".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.sessions[0].title, "Box Breathing");

    // 페이지네이션: limit 2 → 2페이지
    let first = db::list_published(
        &pool,
        &ListQuery {
            limit: Some(2),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(first.sessions.len(), 2);
    assert_eq!(first.total, 3);
    assert_eq!(first.total_pages, 2);

    let second = db::list_published(
        &pool,
        &ListQuery {
            page: Some(2),
            limit: Some(2),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(second.sessions.len(), 1);
    assert_eq!(second.page, 2);
}

#[tokio::test]
async fn listing_treats_like_wildcards_as_literals() {
    let pool = test_pool().await;
    seed_user(&pool, "u1", "maya").await;

    for (title, tags) in [
        ("100% Present", vec!["mind_body"]),
        ("Fully Present", vec!["mindxbody"]),
    ] {
        let mut req = create_request(title);
        req.tags = Some(tags.into_iter().map(String::from).collect());
        req.status = Some(SessionStatus::Published);
        db::create_session(&pool, "u1", &req).await.unwrap();
    }

    // '%'는 와일드카드가 아니라 문자 그대로 검색됩니다
    let percent = db::list_published(
        &pool,
        &ListQuery {
            search: Some("100%".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(percent.total, 1);
    assert_eq!(percent.sessions[0].title, "100% Present");

    // '_'도 마찬가지 — "f_lly"가 "Fully"에 매칭되면 안 됩니다
    let underscore = db::list_published(
        &pool,
        &ListQuery {
            search: Some("f_lly".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(underscore.total, 0);

    // 태그 필터도 동일: "mind_body"는 "mindxbody"에 매칭되지 않습니다
    let tagged = db::list_published(
        &pool,
        &ListQuery {
            tags: Some("mind_body".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(tagged.total, 1);
    assert_eq!(tagged.sessions[0].tags, vec!["mind_body"]);
}

#[tokio::test]
async fn author_listing_includes_drafts() {
    let pool = test_pool().await;
    seed_user(&pool, "u1", "maya").await;
    seed_user(&pool, "u2", "noah").await;

    let mut published = create_request("Morning Flow");
    published.status = Some(SessionStatus::Published);
    db::create_session(&pool, "u1", &published).await.unwrap();
    db::create_session(&pool, "u1", &create_request("Work in Progress"))
        .await
        .unwrap();
    db::create_session(&pool, "u2", &create_request("Someone Else's"))
        .await
        .unwrap();

    let mine = db::list_by_author(&pool, "u1", &MySessionsQuery::default())
        .await
        .unwrap();
    assert_eq!(mine.total, 2);

    // status 필터
    let drafts = db::list_by_author(
        &pool,
        "u1",
        &MySessionsQuery {
            status: Some(SessionStatus::Draft),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(drafts.total, 1);
    assert_eq!(drafts.sessions[0].title, "Work in Progress");
}
