//! # WellnessFlow
//!
//! 웰니스 콘텐츠("세션") 퍼블리싱 백엔드와 자동 저장 코디네이터.
//!
//! - 서버 쪽: `routes`/`db`/`models` — 세션 CRUD, 발행, 자동 저장 API
//! - 클라이언트 코어: `autosave` — 편집 스냅샷을 Document Store로
//!   수렴시키는 타이밍 정책과 상태 기계
//!
//! 바이너리(main.rs)는 이 라이브러리를 조립해 HTTP 서버를 띄웁니다.
//! 라이브러리 타깃을 따로 두는 이유: tests/의 통합 테스트가
//! `wellnessflow::...`로 내부 모듈에 접근하기 위해서입니다.

pub mod autosave;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
