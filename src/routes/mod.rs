//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//! Axum에서 핸들러는 HTTP 요청을 받아 응답을 반환하는 async 함수입니다.
//!
//! 각 하위 모듈:
//! - `sessions`: 세션 CRUD, 자동 저장, 발행 핸들러 (+ 공유 AppState)
//! - `health`: 서버 상태 확인 (헬스체크)

pub mod health;
pub mod sessions;

// 각 모듈의 핸들러 함수들을 재공개하여
// main.rs에서 `routes::list_sessions`처럼 바로 접근 가능하게 합니다.
pub use health::*;
pub use sessions::*;
