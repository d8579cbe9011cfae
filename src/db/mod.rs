//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 라우트 핸들러(routes/)에서 이 모듈의 함수를 호출하여 DB 작업을 수행합니다.
//!
//! 각 하위 모듈:
//! - `sessions`: 세션의 CRUD, 자동 저장 패치, 발행, 필터링 목록 쿼리
//! - `users`: 사용자(작성자) 관련 쿼리
//!
//! 소유권 규칙은 이 계층이 강제합니다: 쓰기 쿼리는 모두
//! `WHERE id = ? AND author_id = ?` 형태로, 작성자가 아니면
//! "없는 행"으로 취급됩니다 (404로 수렴).

pub mod sessions;
pub mod users;

// 하위 모듈의 모든 공개 함수를 재공개(re-export)하여
// `crate::db::create_session`처럼 바로 접근할 수 있게 합니다.
pub use sessions::*;
pub use users::*;
