//! # Scalper Core
//!
//! 스캘핑 봇 전반에서 사용되는 기본 타입을 제공합니다:
//! - 주문, 포지션, 호가창 도메인 모델
//! - 체결 기록 타입
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use logging::*;
