//! 체결 기록 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - PostgreSQL 연결 풀 관리와 마이그레이션
//! - 체결 기록 repository
//! - 체결 스트림을 데이터베이스로 흘려보내는 레코더
//!
//! `trade_data` 테이블에 삽입이 일어나면 트리거가 `new_trade_channel`로
//! 알림을 보내고, 알림 모듈이 이를 구독합니다.

pub mod db;
pub mod error;
pub mod recorder;
pub mod trades;

pub use error::{DataError, Result};

// 주요 타입 재내보내기
pub use db::Database;
pub use recorder::TradeRecorder;
pub use trades::{TradeRepository, TradeRow};
