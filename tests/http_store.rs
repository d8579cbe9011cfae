//! HTTP Document Store 통합 테스트.
//!
//! 스텁 axum 서버를 임의 포트에 띄우고 `HttpDocumentStore`로 실제
//! 요청을 보냅니다. 성공 경로의 응답 해석과, 실패 상태 코드가
//! 코디네이터의 에러 분류로 번역되는지를 확인합니다.

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    routing::{patch, post},
    Json, Router,
};
use serde_json::json;

use wellnessflow::autosave::{DocumentStore, HttpDocumentStore, StoreError};
use wellnessflow::models::{AutoSaveRequest, CreateSessionRequest};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn create_and_autosave_round_trip() {
    let app = Router::new()
        .route(
            "/sessions",
            post(
                |headers: HeaderMap, Json(req): Json<CreateSessionRequest>| async move {
                    // Bearer 토큰이 같이 실려 와야 합니다
                    assert_eq!(
                        headers.get("authorization").unwrap().to_str().unwrap(),
                        "Bearer token-1"
                    );
                    (
                        StatusCode::CREATED,
                        Json(json!({
                            "message": "Session created successfully",
                            "session": {
                                "id": "s1",
                                "title": req.title,
                                "status": "draft",
                                "last_saved": "2026-02-01T09:00:00.000Z"
                            }
                        })),
                    )
                },
            ),
        )
        .route(
            "/sessions/{id}/autosave",
            patch(
                |Path(id): Path<String>, Json(body): Json<AutoSaveRequest>| async move {
                    assert_eq!(id, "s1");
                    assert_eq!(body.description.as_deref(), Some("A gentle start"));
                    Json(json!({
                        "message": "Session auto-saved",
                        "last_saved": "2026-02-01T09:00:05.000Z"
                    }))
                },
            ),
        );
    let base = serve(app).await;
    let store = HttpDocumentStore::new(base, "token-1");

    let payload = CreateSessionRequest {
        title: "Morning Flow".to_string(),
        description: None,
        tags: None,
        json_url: None,
        content: None,
        status: None,
        duration: None,
        difficulty: None,
        category: None,
    };
    let ack = store.create(&payload).await.unwrap();
    assert_eq!(ack.id, "s1");
    assert_eq!(ack.last_saved, "2026-02-01T09:00:00.000Z");

    let body = AutoSaveRequest {
        description: Some("A gentle start".to_string()),
        ..Default::default()
    };
    let ack = store.autosave("s1", &body).await.unwrap();
    assert_eq!(ack.last_saved, "2026-02-01T09:00:05.000Z");
}

#[tokio::test]
async fn failure_statuses_map_to_the_error_taxonomy() {
    // 400 → Validation(서버 메시지), 401/404 → Authorization, 500 → Transport
    let app = Router::new().route(
        "/sessions/{id}/autosave",
        patch(|Path(id): Path<String>| async move {
            match id.as_str() {
                "bad" => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": {
                        "code": "validation_failed",
                        "message": "Title must be between 1 and 100 characters"
                    }})),
                ),
                "gone" => (
                    StatusCode::NOT_FOUND,
                    Json(json!({"error": {
                        "code": "not_found",
                        "message": "Session not found or not authorized"
                    }})),
                ),
                "locked" => (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": {
                        "code": "invalid_token",
                        "message": "Invalid authorization token"
                    }})),
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": {
                        "code": "internal_error",
                        "message": "An internal error occurred"
                    }})),
                ),
            }
        }),
    );
    let base = serve(app).await;
    let store = HttpDocumentStore::new(base, "token-1");
    let body = AutoSaveRequest::default();

    match store.autosave("bad", &body).await {
        Err(StoreError::Validation(message)) => {
            // 서버의 에러 봉투에서 메시지를 꺼내 전달합니다
            assert!(message.contains("between 1 and 100"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(matches!(
        store.autosave("gone", &body).await,
        Err(StoreError::Authorization)
    ));
    assert!(matches!(
        store.autosave("locked", &body).await,
        Err(StoreError::Authorization)
    ));
    assert!(matches!(
        store.autosave("boom", &body).await,
        Err(StoreError::Transport(_))
    ));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // 포트만 알아내고 리스너는 닫습니다 — 연결 거부 시나리오
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = HttpDocumentStore::new(format!("http://{}", addr), "token-1");
    assert!(matches!(
        store.autosave("s1", &AutoSaveRequest::default()).await,
        Err(StoreError::Transport(_))
    ));
}
