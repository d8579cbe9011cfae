//! # 자동 저장 코디네이터 (Auto-Save Coordinator)
//!
//! 이 크레이트의 핵심 모듈입니다. 편집 중인 세션의 메모리 내 스냅샷이
//! 계속 바뀌는 상황에서, Document Store가 **제한된 시간 안에** 최신 편집
//! 내용으로 수렴하도록 보장합니다. 동시에 불필요한 네트워크 호출을
//! 최소화하고, 편집 화면을 절대 블로킹하지 않습니다.
//!
//! ## 구성
//! - `store`: Document Store 계약 (`DocumentStore` 트레이트)과 에러 분류
//! - `draft`: 편집 스냅샷(`SessionDraft`), 필드 델타 병합, 핑거프린트
//! - `coordinator`: 타이밍 정책과 상태 기계 — 디바운스, 주기 저장,
//!   강제 저장, 이탈 시 best-effort 저장
//! - `http`: REST API를 향한 reqwest 기반 `DocumentStore` 구현
//!
//! ## 타이밍 정책
//! ```text
//! 편집 이벤트 ──→ 디바운스(5초 조용하면 저장, 마지막 편집만 반영)
//! 주기 타이머 ──→ 핑거프린트가 바뀌었을 때만 저장 (안전망)
//! 이탈 신호  ──→ 미저장 변경이 있으면 발사 후 잊기(fire-and-forget)
//! 명시적 저장 ──→ 디바운스 취소 후 즉시 저장
//! ```
//!
//! ## 상태 기계
//! `idle → saving → { saved → idle(2초 후), error → idle(10초 후) }`
//!
//! 저장 발송은 직렬화됩니다: 코디네이터 태스크 하나가 저장을 인라인으로
//! await하므로, 한 저장이 진행 중일 때 다른 저장이 겹칠 수 없습니다.
//! 저장 중 도착한 편집은 병합되어 다음 트리거가 실어 보냅니다.

pub mod coordinator;
pub mod draft;
pub mod http;
pub mod store;

pub use coordinator::*;
pub use draft::*;
pub use http::*;
pub use store::*;
