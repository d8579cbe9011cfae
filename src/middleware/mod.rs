//! # 미들웨어 모듈
//!
//! 요청 처리 전후에 끼어드는 공통 로직을 담습니다.
//! - `auth`: Bearer JWT 검증과 `AuthUser` 추출기(Extractor)
//!
//! 토큰 발급(로그인/회원가입)은 외부 인증 서비스의 몫이며,
//! 이 서버는 검증만 수행합니다.

pub mod auth;
